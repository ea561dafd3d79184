//! Infrastructure error model.

use thiserror::Error;

use storefront_core::DomainError;

/// Storage fault.
///
/// Everything here is an infrastructure failure: the request itself may be
/// perfectly valid and can be retried once the fault clears.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Waiting for a row/product lock exceeded the configured timeout.
    #[error("lock timeout: {0}")]
    LockTimeout(String),

    /// Backend failure (connection, query, commit).
    #[error("database error: {0}")]
    Database(String),

    /// Stored data could not be decoded into domain types.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// A row the transaction relied on disappeared.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl StoreError {
    /// Whether retrying the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::LockTimeout(_))
    }
}

/// Error returned by the reservation engine and order workflow.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => WorkflowError::Domain(DomainError::Conflict(msg)),
            other => {
                // Runs inside the caller's span, so the order/product ids travel with it.
                tracing::error!(error = %other, retryable = other.is_retryable(), "store fault");
                WorkflowError::Store(other)
            }
        }
    }
}

impl WorkflowError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkflowError::Store(e) if e.is_retryable())
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_lock_timeouts_are_retryable() {
        assert!(StoreError::LockTimeout("product".into()).is_retryable());
        assert!(!StoreError::Database("boom".into()).is_retryable());
        assert!(WorkflowError::from(StoreError::LockTimeout("x".into())).is_retryable());
        assert!(!WorkflowError::from(DomainError::Unauthorized).is_retryable());
    }

    #[test]
    fn unique_violations_surface_as_domain_conflicts() {
        let err = WorkflowError::from(StoreError::Conflict("sku TEE exists".into()));
        assert_eq!(err, WorkflowError::Domain(DomainError::Conflict("sku TEE exists".into())));
    }
}
