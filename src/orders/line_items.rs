//! Products attached to an order (`/orders/:id/products`).

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{optional_id, AddLineRequest, UpdateLineRequest},
    handlers::load_order,
    repo::{OrderProduct, OrderProductDetails, OrderProductList},
};
use crate::{
    auth::{
        extractors::{AuthUser, RequireAdmin},
        policy,
    },
    error::{ApiError, ApiResult},
    response::{done, success, Envelope, MISSING_INPUTS},
    state::AppState,
    store::parse_id,
};

const DUPLICATE_LINE: &str = "Duplicate keys found";

pub fn line_item_routes() -> Router<AppState> {
    Router::new()
        .route("/orders/:id/products", get(list_lines).post(add_line))
        .route(
            "/orders/:id/products/:pid",
            get(get_line).put(update_line).delete(delete_line),
        )
}

#[instrument(skip(state, who), fields(user_id = %who.id))]
pub async fn list_lines(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<Option<OrderProductList>>>> {
    let order = load_order(&state, &id).await?;
    policy::require_self_or_admin(&who, order.as_ref().map(|o| o.user_id))?;

    let lines = match order {
        Some(order) => state.order_products.list_by_order(order.id).await?,
        None => None,
    };
    Ok(success(lines, "Order products retrieved successfully"))
}

#[instrument(skip(state, who), fields(user_id = %who.id))]
pub async fn get_line(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path((id, pid)): Path<(String, String)>,
) -> ApiResult<Json<Envelope<Option<OrderProductDetails>>>> {
    let order = load_order(&state, &id).await?;
    policy::require_self_or_admin(&who, order.as_ref().map(|o| o.user_id))?;

    let line = match (order, parse_id(&pid)) {
        (Some(order), Some(product_id)) => state.order_products.find(order.id, product_id).await?,
        _ => None,
    };
    Ok(success(line, "Order product retrieved successfully"))
}

/// Ownership is checked before the duplicate lookup.
#[instrument(skip(state, who, payload), fields(user_id = %who.id))]
pub async fn add_line(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<AddLineRequest>,
) -> ApiResult<Json<Envelope<OrderProduct>>> {
    let count = payload.count();
    let product_id = optional_id(payload.product_id, MISSING_INPUTS)?
        .ok_or_else(|| ApiError::BadRequest(MISSING_INPUTS.into()))?;

    let order = load_order(&state, &id).await?;
    policy::require_self_or_admin(&who, order.as_ref().map(|o| o.user_id))?;
    let order = order.ok_or_else(|| ApiError::NotFound("Order not found".into()))?;

    if state.order_products.find(order.id, product_id).await?.is_some() {
        return Err(ApiError::Conflict(DUPLICATE_LINE.into()));
    }
    if state.products.find_by_id(product_id).await?.is_none() {
        return Err(ApiError::NotFound("Product not found".into()));
    }

    let line = state
        .order_products
        .create(order.id, product_id, count)
        .await?;
    info!(order_id = %order.id, %product_id, count, "order product added");
    Ok(success(line, "Order product created successfully"))
}

#[instrument(skip(state, _admin, payload))]
pub async fn update_line(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path((id, pid)): Path<(String, String)>,
    Json(payload): Json<UpdateLineRequest>,
) -> ApiResult<Json<Envelope<Option<OrderProduct>>>> {
    let new_product_id = optional_id(payload.product_id, MISSING_INPUTS)?;
    let (Some(order_id), Some(product_id)) = (parse_id(&id), parse_id(&pid)) else {
        return Ok(success(None, "Order product updated successfully"));
    };

    if let Some(target) = new_product_id.filter(|target| *target != product_id) {
        if state.order_products.find(order_id, target).await?.is_some() {
            return Err(ApiError::Conflict(DUPLICATE_LINE.into()));
        }
    }

    let line = state
        .order_products
        .update(order_id, product_id, new_product_id, payload.count)
        .await?;
    Ok(success(line, "Order product updated successfully"))
}

#[instrument(skip(state, _admin))]
pub async fn delete_line(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path((id, pid)): Path<(String, String)>,
) -> ApiResult<Json<Envelope<()>>> {
    if let (Some(order_id), Some(product_id)) = (parse_id(&id), parse_id(&pid)) {
        state.order_products.delete(order_id, product_id).await?;
    }
    Ok(done("Order product deleted successfully"))
}
