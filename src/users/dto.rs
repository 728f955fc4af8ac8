use serde::Deserialize;

use super::repo::ProfileChanges;
use crate::response::present;

#[derive(Debug, Deserialize)]
pub struct AdminFlagRequest {
    pub id: Option<String>,
}

/// Profile fields to change; absent or empty fields keep their current value.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

impl From<ProfileRequest> for ProfileChanges {
    fn from(req: ProfileRequest) -> Self {
        ProfileChanges {
            first_name: present(req.first_name),
            last_name: present(req.last_name),
            email: present(req.email),
        }
    }
}
