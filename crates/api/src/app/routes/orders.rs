use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use storefront_core::OrderId;
use storefront_infra::WorkflowResult;
use storefront_sales::{NewOrder, OrderSnapshot, TransitionKind};

use crate::app::routes::common::parse_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/:id", get(get_order).delete(delete_order))
        .route("/:id/in-progress", post(mark_in_progress))
        .route("/:id/complete", post(complete_order))
        .route("/:id/cancel", post(cancel_order))
        .route("/:id/archive", post(archive_order))
        .route("/:id/unarchive", post(unarchive_order))
        .route("/:id/restore", post(restore_order))
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<NewOrder>,
) -> axum::response::Response {
    let result = services
        .retrying(|| services.workflow.create(actor.actor(), body.clone()))
        .await;

    match result {
        Ok(order) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "success": true, "order": order })),
        )
            .into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<dto::ListOrdersQuery>,
) -> axum::response::Response {
    let filter = match query.into_filter() {
        Ok(f) => f,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.workflow.list(actor.actor(), filter).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "success": true, "items": items }))).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Query(query): Query<dto::GetOrderQuery>,
) -> axum::response::Response {
    let order_id: OrderId = match parse_id(&id, "order") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let include_deleted = query.include_deleted.unwrap_or(false);
    match services.workflow.get(actor.actor(), order_id, include_deleted).await {
        Ok(order) => (StatusCode::OK, Json(serde_json::json!({ "success": true, "order": order }))).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn mark_in_progress(
    services: Extension<Arc<AppServices>>,
    actor: Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition(services, actor, &id, TransitionKind::MarkInProgress).await
}

pub async fn complete_order(
    services: Extension<Arc<AppServices>>,
    actor: Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition(services, actor, &id, TransitionKind::Complete).await
}

pub async fn cancel_order(
    services: Extension<Arc<AppServices>>,
    actor: Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition(services, actor, &id, TransitionKind::Cancel).await
}

pub async fn archive_order(
    services: Extension<Arc<AppServices>>,
    actor: Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition(services, actor, &id, TransitionKind::Archive).await
}

pub async fn unarchive_order(
    services: Extension<Arc<AppServices>>,
    actor: Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition(services, actor, &id, TransitionKind::Unarchive).await
}

pub async fn delete_order(
    services: Extension<Arc<AppServices>>,
    actor: Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition(services, actor, &id, TransitionKind::Delete).await
}

pub async fn restore_order(
    services: Extension<Arc<AppServices>>,
    actor: Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition(services, actor, &id, TransitionKind::Restore).await
}

async fn transition(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    id: &str,
    kind: TransitionKind,
) -> axum::response::Response {
    let order_id: OrderId = match parse_id(id, "order") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let result = services
        .retrying(|| dispatch(&services, &actor, order_id, kind))
        .await;

    match result {
        Ok(order) => (StatusCode::OK, Json(serde_json::json!({ "success": true, "order": order }))).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

async fn dispatch(
    services: &AppServices,
    actor: &ActorContext,
    order_id: OrderId,
    kind: TransitionKind,
) -> WorkflowResult<OrderSnapshot> {
    let workflow = &services.workflow;
    let actor = actor.actor();
    match kind {
        TransitionKind::MarkInProgress => workflow.mark_in_progress(actor, order_id).await,
        TransitionKind::Complete => workflow.complete(actor, order_id).await,
        TransitionKind::Cancel => workflow.cancel(actor, order_id).await,
        TransitionKind::Archive => workflow.archive(actor, order_id).await,
        TransitionKind::Unarchive => workflow.unarchive(actor, order_id).await,
        TransitionKind::Delete => workflow.delete(actor, order_id).await,
        TransitionKind::Restore => workflow.restore(actor, order_id).await,
    }
}
