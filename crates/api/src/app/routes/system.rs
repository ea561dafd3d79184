use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::context::ActorContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(actor): Extension<ActorContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "success": true,
        "user_id": actor.user_id().to_string(),
        "role": actor.role().as_str(),
        "elevated": actor.role().is_elevated(),
    }))
}
