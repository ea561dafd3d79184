use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use storefront_core::ProductId;
use storefront_inventory::NewProduct;

use crate::app::routes::common::parse_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route("/low-stock", get(low_stock))
        .route("/:id/stock", get(stock_level))
        .route("/:id/movements", get(movements))
        .route("/:id/adjustments", post(adjust_stock))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<NewProduct>,
) -> axum::response::Response {
    match services.engine.create_product(actor.actor(), body).await {
        Ok(product) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "success": true, "product": product })),
        )
            .into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn list_products(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.engine.list_products().await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "success": true, "items": items }))).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn low_stock(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.engine.low_stock_products().await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "success": true, "items": items }))).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn stock_level(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.engine.stock_level(product_id).await {
        Ok(level) => (StatusCode::OK, Json(serde_json::json!({ "success": true, "stock": level }))).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn movements(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = actor.actor().ensure_elevated() {
        return errors::domain_error_to_response(e);
    }
    let product_id: ProductId = match parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.engine.movement_history(product_id).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "success": true, "items": items }))).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AdjustStockRequest>,
) -> axum::response::Response {
    let product_id: ProductId = match parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let adjustment = body.adjustment();
    let result = services
        .retrying(|| services.engine.adjust_stock(actor.actor(), product_id, adjustment, body.reason()))
        .await;

    match result {
        Ok(movement) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "movement": movement })),
        )
            .into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}
