mod dto;
pub mod handlers;
pub mod line_items;
pub mod repo;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::order_routes())
        .merge(line_items::line_item_routes())
}
