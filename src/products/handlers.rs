use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::ProductRequest,
    repo::{PopularProduct, Product, ProductChanges, POPULAR_LIMIT},
};
use crate::{
    auth::extractors::RequireAdmin,
    error::{ApiError, ApiResult},
    response::{done, success, Envelope, MISSING_INPUTS},
    state::AppState,
    store::parse_id,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/popular", get(popular_products))
        .route("/products/:id", get(get_product))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(create_product))
        .route(
            "/products/:id",
            put(update_product).delete(delete_product),
        )
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
) -> ApiResult<Json<Envelope<Vec<Product>>>> {
    let products = state.products.list().await?;
    Ok(success(products, "Products retrieved successfully"))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<Option<Product>>>> {
    let product = match parse_id(&id) {
        Some(id) => state.products.find_by_id(id).await?,
        None => None,
    };
    Ok(success(product, "Product retrieved successfully"))
}

/// Products ranked by how many orders carry them.
#[instrument(skip(state))]
pub async fn popular_products(
    State(state): State<AppState>,
) -> ApiResult<Json<Envelope<Vec<PopularProduct>>>> {
    let products = state.products.popular(POPULAR_LIMIT).await?;
    Ok(success(products, "Products retrieved successfully"))
}

#[instrument(skip(state, _admin, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(payload): Json<ProductRequest>,
) -> ApiResult<Json<Envelope<Product>>> {
    let new = payload
        .into_new()
        .ok_or_else(|| ApiError::BadRequest(MISSING_INPUTS.into()))?;

    let product = state.products.create(new).await?;
    info!(product_id = %product.id, "product created");
    Ok(success(product, "Product created successfully"))
}

#[instrument(skip(state, _admin, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
    Json(payload): Json<ProductRequest>,
) -> ApiResult<Json<Envelope<Option<Product>>>> {
    let product = match parse_id(&id) {
        Some(id) => {
            state
                .products
                .update(id, ProductChanges::from(payload))
                .await?
        }
        None => None,
    };
    Ok(success(product, "Product updated successfully"))
}

#[instrument(skip(state, _admin))]
pub async fn delete_product(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<()>>> {
    if let Some(id) = parse_id(&id) {
        state.products.delete(id).await?;
    }
    Ok(done("Product deleted successfully"))
}
