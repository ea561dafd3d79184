use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use storefront_core::DomainError;
use storefront_infra::WorkflowError;

/// Map a workflow failure to an HTTP response.
///
/// Business rule failures are expected traffic and log at info. Store faults
/// are already logged with their order/product ids where they happen, and
/// their details never reach the client; lock timeouts are reported as 503 so
/// callers may retry.
pub fn workflow_error_to_response(err: WorkflowError) -> axum::response::Response {
    match err {
        WorkflowError::Domain(e) => domain_error_to_response(e),
        WorkflowError::Store(e) if e.is_retryable() => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_busy", "storage is busy, retry later")
        }
        WorkflowError::Store(_) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "internal storage error")
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let status = match &err {
        DomainError::Validation(_) | DomainError::InvalidId(_) => StatusCode::BAD_REQUEST,
        DomainError::InvariantViolation(_)
        | DomainError::InsufficientStock(_)
        | DomainError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Unauthorized => StatusCode::FORBIDDEN,
    };
    tracing::info!(code = err.code(), error = %err, "request rejected");

    match err {
        DomainError::InsufficientStock(ref shortages) => (
            status,
            axum::Json(json!({
                "success": false,
                "error": err.code(),
                "message": err.to_string(),
                "errors": shortages,
            })),
        )
            .into_response(),
        other => json_error(status, other.code(), other.to_string()),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use storefront_core::{ProductId, StockShortage};
    use storefront_infra::StoreError;

    use super::*;

    #[test]
    fn business_failures_map_to_client_errors() {
        let cases = [
            (DomainError::validation("bad"), StatusCode::BAD_REQUEST),
            (DomainError::not_found("order"), StatusCode::NOT_FOUND),
            (DomainError::Unauthorized, StatusCode::FORBIDDEN),
            (DomainError::conflict("sku"), StatusCode::CONFLICT),
            (
                DomainError::invalid_transition("ORD-20260101-0001", "completed", "cancel"),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                DomainError::insufficient_stock(vec![StockShortage::new(ProductId::new(), "Mug", 6, 5)]),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(domain_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn lock_timeouts_are_retryable_503s() {
        let busy = workflow_error_to_response(StoreError::LockTimeout("product".into()).into());
        assert_eq!(busy.status(), StatusCode::SERVICE_UNAVAILABLE);

        let broken = workflow_error_to_response(StoreError::Database("down".into()).into());
        assert_eq!(broken.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn store_fault_details_stay_out_of_the_body() {
        let busy = workflow_error_to_response(
            StoreError::LockTimeout("canceling statement due to lock timeout on products_pkey".into()).into(),
        );
        assert_eq!(busy.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bytes = axum::body::to_bytes(busy.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "store_busy");
        assert!(!body["message"].as_str().unwrap().contains("products_pkey"));
        assert!(!String::from_utf8_lossy(&bytes).contains("lock timeout"));
    }
}
