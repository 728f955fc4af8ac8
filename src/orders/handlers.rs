use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{optional_id, CreateOrderRequest, UpdateOrderRequest},
    repo::{Order, OrderChanges, OrderDetails},
};
use crate::{
    auth::{
        extractors::{AuthUser, RequireAdmin},
        policy,
    },
    error::{ApiError, ApiResult},
    response::{done, success, Envelope},
    state::AppState,
    store::parse_id,
};

const INVALID_USER_ID: &str = "Please provide a valid user id";

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route(
            "/orders/:id",
            get(get_order).put(update_order).delete(delete_order),
        )
}

/// Loads an order by raw path id; malformed ids behave like missing orders.
pub(super) async fn load_order(state: &AppState, raw: &str) -> ApiResult<Option<OrderDetails>> {
    match parse_id(raw) {
        Some(id) => Ok(state.orders.find_by_id(id).await?),
        None => Ok(None),
    }
}

/// Admins see every order, everyone else only their own.
#[instrument(skip(state, who), fields(user_id = %who.id))]
pub async fn list_orders(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
) -> ApiResult<Json<Envelope<Vec<OrderDetails>>>> {
    let orders = if who.is_admin {
        state.orders.list_all().await?
    } else {
        state.orders.list_by_user(who.id).await?
    };
    Ok(success(orders, "Orders retrieved successfully"))
}

#[instrument(skip(state, who), fields(user_id = %who.id))]
pub async fn get_order(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<Option<OrderDetails>>>> {
    let order = load_order(&state, &id).await?;
    policy::require_self_or_admin(&who, order.as_ref().map(|o| o.user_id))?;
    Ok(success(order, "Order retrieved successfully"))
}

/// The body is optional; an admin may name the user the order is placed for.
/// A request without a JSON content type counts as having no body, but a JSON
/// body that does not deserialize is rejected rather than ignored.
#[instrument(skip(state, who, payload), fields(user_id = %who.id))]
pub async fn create_order(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<Order>>> {
    let payload = match payload {
        Ok(Json(p)) => p,
        Err(JsonRejection::MissingJsonContentType(_)) => CreateOrderRequest::default(),
        Err(JsonRejection::JsonDataError(_)) => {
            return Err(ApiError::BadRequest(INVALID_USER_ID.into()))
        }
        Err(e) => return Err(ApiError::BadRequest(e.body_text())),
    };
    let requested: Option<Uuid> = if who.is_admin {
        optional_id(payload.user_id, INVALID_USER_ID)?
    } else {
        None
    };

    let owner = policy::order_owner(&who, requested);
    let order = state.orders.create(owner).await?;
    info!(order_id = %order.id, owner = %owner, "order created");
    Ok(success(order, "Order created successfully"))
}

#[instrument(skip(state, _admin, payload))]
pub async fn update_order(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
    Json(payload): Json<UpdateOrderRequest>,
) -> ApiResult<Json<Envelope<Option<Order>>>> {
    let changes = OrderChanges {
        user_id: optional_id(payload.user_id, INVALID_USER_ID)?,
        status: payload.status,
    };
    let order = match parse_id(&id) {
        Some(id) => state.orders.update(id, changes).await?,
        None => None,
    };
    Ok(success(order, "Order updated successfully"))
}

#[instrument(skip(state, who), fields(user_id = %who.id))]
pub async fn delete_order(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<()>>> {
    let order = load_order(&state, &id).await?;
    policy::require_self_or_admin(&who, order.as_ref().map(|o| o.user_id))?;

    if let Some(order) = order {
        state.orders.delete(order.id).await?;
        info!(order_id = %order.id, "order deleted");
    }
    Ok(done("Order deleted successfully"))
}
