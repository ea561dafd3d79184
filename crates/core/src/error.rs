//! Domain error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::ProductId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// One line item that cannot be satisfied from available stock.
///
/// Carries everything needed to show the failure directly to an end user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockShortage {
    pub product_id: ProductId,
    pub product_name: String,
    pub requested: i64,
    pub available: i64,
    pub message: String,
}

impl StockShortage {
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        requested: i64,
        available: i64,
    ) -> Self {
        let product_name = product_name.into();
        let message = format!(
            "Insufficient stock for {product_name}. Requested: {requested}, available: {available}"
        );
        Self {
            product_id,
            product_name,
            requested,
            available,
            message,
        }
    }
}

/// Domain-level error.
///
/// Deterministic, business/domain failures only (validation, invariants, stock
/// shortages, illegal state transitions). Infrastructure faults live in the
/// infra crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found: {0}")]
    NotFound(String),

    /// A conflict occurred (e.g. duplicate sku).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The actor may not perform this operation.
    #[error("unauthorized")]
    Unauthorized,

    /// One or more line items exceed available stock.
    #[error("{}", summarize_shortages(.0))]
    InsufficientStock(Vec<StockShortage>),

    /// The order is not in a status the requested transition can start from.
    #[error("cannot {action} order {order_number}: current status is {from}")]
    InvalidTransition {
        order_number: String,
        from: String,
        action: &'static str,
    },
}

fn summarize_shortages(shortages: &[StockShortage]) -> String {
    shortages
        .iter()
        .map(|s| s.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn insufficient_stock(shortages: Vec<StockShortage>) -> Self {
        Self::InsufficientStock(shortages)
    }

    pub fn invalid_transition(
        order_number: impl Into<String>,
        from: impl core::fmt::Display,
        action: &'static str,
    ) -> Self {
        Self::InvalidTransition {
            order_number: order_number.into(),
            from: from.to_string(),
            action,
        }
    }

    /// Short machine-readable code, used as the `error` field of API responses.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation_error",
            DomainError::InvariantViolation(_) => "invariant_violation",
            DomainError::InvalidId(_) => "invalid_id",
            DomainError::NotFound(_) => "not_found",
            DomainError::Conflict(_) => "conflict",
            DomainError::Unauthorized => "forbidden",
            DomainError::InsufficientStock(_) => "insufficient_stock",
            DomainError::InvalidTransition { .. } => "invalid_transition",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_message_lists_every_item() {
        let err = DomainError::insufficient_stock(vec![
            StockShortage::new(ProductId::new(), "Mug", 6, 5),
            StockShortage::new(ProductId::new(), "Tee", 2, 0),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("Insufficient stock for Mug. Requested: 6, available: 5"));
        assert!(msg.contains("Insufficient stock for Tee. Requested: 2, available: 0"));
    }

    #[test]
    fn invalid_transition_names_current_status() {
        let err = DomainError::invalid_transition("ORD-20260101-0001", "completed", "cancel");
        assert_eq!(
            err.to_string(),
            "cannot cancel order ORD-20260101-0001: current status is completed"
        );
        assert_eq!(err.code(), "invalid_transition");
    }
}
