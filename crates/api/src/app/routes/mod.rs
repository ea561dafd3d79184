use axum::{Router, routing::get};

pub mod common;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod system;

/// Router for all endpoints that need an acting user.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/products", products::router())
        .nest("/inventory", inventory::router())
        .nest("/orders", orders::router())
}
