//! Availability views: what can still be promised to new orders.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, ProductId, StockShortage};

use crate::product::Product;

/// Requested quantity of one product.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Real stock minus active reservations, floored at zero.
pub fn available_stock(stock: i64, reserved: i64) -> i64 {
    (stock - reserved).max(0)
}

/// Validate and normalize requested lines.
///
/// Quantities must be positive. Lines for the same product are merged, and the
/// result is sorted by product id so callers lock products in a stable order.
pub fn merge_lines(items: &[LineRequest]) -> DomainResult<Vec<LineRequest>> {
    if items.is_empty() {
        return Err(DomainError::validation("at least one item is required"));
    }

    let mut merged: BTreeMap<ProductId, i64> = BTreeMap::new();
    for (idx, item) in items.iter().enumerate() {
        if item.quantity <= 0 {
            return Err(DomainError::validation(format!(
                "quantity must be positive (item {idx})"
            )));
        }
        let total = merged.entry(item.product_id).or_insert(0);
        *total = total
            .checked_add(item.quantity)
            .ok_or_else(|| DomainError::validation(format!("quantity overflows for product {}", item.product_id)))?;
    }

    Ok(merged
        .into_iter()
        .map(|(product_id, quantity)| LineRequest {
            product_id,
            quantity,
        })
        .collect())
}

/// Result of an advisory availability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityReport {
    pub available: bool,
    pub errors: Vec<StockShortage>,
}

impl AvailabilityReport {
    pub fn from_shortages(errors: Vec<StockShortage>) -> Self {
        Self {
            available: errors.is_empty(),
            errors,
        }
    }

    /// Turn a failed report into the business error raised by order creation.
    pub fn into_result(self) -> DomainResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(DomainError::insufficient_stock(self.errors))
        }
    }
}

/// Snapshot of one product's stock position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub name: String,
    pub stock: i64,
    pub reserved: i64,
    pub available: i64,
    pub stock_min: i64,
    pub low_stock: bool,
}

impl StockLevel {
    pub fn of(product: &Product, reserved: i64) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            stock: product.stock,
            reserved,
            available: available_stock(product.stock, reserved),
            stock_min: product.stock_min,
            low_stock: product.is_low_stock(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_is_floored_at_zero() {
        assert_eq!(available_stock(10, 4), 6);
        assert_eq!(available_stock(3, 5), 0);
    }

    #[test]
    fn merge_lines_sums_duplicates_and_sorts() {
        let (a, b) = (ProductId::new(), ProductId::new());
        let merged = merge_lines(&[
            LineRequest { product_id: b, quantity: 1 },
            LineRequest { product_id: a, quantity: 2 },
            LineRequest { product_id: b, quantity: 3 },
        ])
        .unwrap();

        assert_eq!(merged.len(), 2);
        assert!(merged[0].product_id < merged[1].product_id);
        let qty_b = merged.iter().find(|l| l.product_id == b).unwrap().quantity;
        assert_eq!(qty_b, 4);
    }

    #[test]
    fn merge_lines_rejects_overflowing_duplicates() {
        let p = ProductId::new();
        let err = merge_lines(&[
            LineRequest { product_id: p, quantity: i64::MAX },
            LineRequest { product_id: p, quantity: 1 },
        ])
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn merge_lines_rejects_empty_and_non_positive() {
        assert!(merge_lines(&[]).is_err());
        let err = merge_lines(&[LineRequest {
            product_id: ProductId::new(),
            quantity: 0,
        }])
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn report_is_available_only_without_errors() {
        assert!(AvailabilityReport::from_shortages(vec![]).into_result().is_ok());
        let report = AvailabilityReport::from_shortages(vec![StockShortage::new(
            ProductId::new(),
            "Mug",
            6,
            5,
        )]);
        assert!(!report.available);
        assert!(matches!(
            report.into_result(),
            Err(DomainError::InsufficientStock(items)) if items.len() == 1
        ));
    }
}
