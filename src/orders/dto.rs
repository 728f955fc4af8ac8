use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    response::present,
    store::parse_id,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub user_id: Option<String>,
    pub status: Option<i16>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLineRequest {
    pub product_id: Option<String>,
    pub count: Option<i32>,
}

impl AddLineRequest {
    /// Absent or zero count means a single unit.
    pub fn count(&self) -> i32 {
        match self.count {
            None | Some(0) => 1,
            Some(n) => n,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLineRequest {
    pub product_id: Option<String>,
    pub count: Option<i32>,
}

/// Optional id from a request body: absent stays `None`, present must be a UUID.
pub fn optional_id(raw: Option<String>, msg: &str) -> ApiResult<Option<uuid::Uuid>> {
    present(raw)
        .map(|raw| parse_id(&raw).ok_or_else(|| ApiError::BadRequest(msg.into())))
        .transpose()
}
