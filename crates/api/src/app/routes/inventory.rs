use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/availability", post(check_availability))
}

/// Advisory check. Shortages are reported in the body, never as an error.
pub async fn check_availability(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::AvailabilityRequest>,
) -> axum::response::Response {
    match services.engine.check_availability(&body.items).await {
        Ok(report) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "available": report.available,
                "errors": report.errors,
            })),
        )
            .into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}
