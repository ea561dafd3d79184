use serde::Deserialize;

use storefront_core::{DomainError, UserId};
use storefront_infra::OrderFilter;
use storefront_inventory::{LineRequest, StockAdjustment};
use storefront_sales::OrderStatus;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub items: Vec<LineRequest>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    Entrada,
    Salida,
    Ajuste,
}

/// `{"type": "entrada" | "salida" | "ajuste", "quantity": n, "reason": "..."}`.
///
/// For `ajuste`, `quantity` is the counted on-hand stock.
#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    #[serde(rename = "type")]
    pub kind: AdjustmentKind,
    pub quantity: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

impl AdjustStockRequest {
    pub fn adjustment(&self) -> StockAdjustment {
        match self.kind {
            AdjustmentKind::Entrada => StockAdjustment::Entrada(self.quantity),
            AdjustmentKind::Salida => StockAdjustment::Salida(self.quantity),
            AdjustmentKind::Ajuste => StockAdjustment::Ajuste(self.quantity),
        }
    }

    pub fn reason(&self) -> &str {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or("Manual adjustment")
    }
}

// -------------------------
// Query DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
    pub include_deleted: Option<bool>,
    pub user_id: Option<String>,
}

impl ListOrdersQuery {
    pub fn into_filter(self) -> Result<OrderFilter, DomainError> {
        let status = self.status.as_deref().map(str::parse::<OrderStatus>).transpose()?;
        let user_id = self.user_id.as_deref().map(str::parse::<UserId>).transpose()?;
        Ok(OrderFilter {
            status,
            include_deleted: self.include_deleted.unwrap_or(false),
            user_id,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GetOrderQuery {
    pub include_deleted: Option<bool>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn adjustment_request_maps_to_domain_adjustment() {
        let req: AdjustStockRequest =
            serde_json::from_value(json!({"type": "salida", "quantity": 3})).unwrap();
        assert_eq!(req.adjustment(), StockAdjustment::Salida(3));
        assert_eq!(req.reason(), "Manual adjustment");
    }

    #[test]
    fn list_query_parses_status_and_rejects_garbage() {
        let filter = ListOrdersQuery {
            status: Some("in_progress".to_string()),
            ..Default::default()
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.status, Some(OrderStatus::InProgress));
        assert!(!filter.include_deleted);

        let bad = ListOrdersQuery {
            status: Some("shipped".to_string()),
            ..Default::default()
        };
        assert!(bad.into_filter().is_err());
    }
}
