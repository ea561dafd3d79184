use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, Entity, MovementId, OrderId, ProductId, UserId};

/// Kind of ledger entry.
///
/// The serialized names are the ledger's vocabulary and are stored as-is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Goods received.
    Entrada,
    /// Goods removed outside of a sale (damage, loss, return to supplier).
    Salida,
    /// Stock count correction.
    Ajuste,
    /// Stock earmarked for an order; real stock untouched.
    Reserva,
    /// Reservation converted into a sale; real stock decremented.
    Venta,
    /// Reservation given back; real stock untouched.
    CancelacionReserva,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Entrada => "entrada",
            MovementType::Salida => "salida",
            MovementType::Ajuste => "ajuste",
            MovementType::Reserva => "reserva",
            MovementType::Venta => "venta",
            MovementType::CancelacionReserva => "cancelacion_reserva",
        }
    }

    /// Whether this entry closes an earlier reservation of the same order.
    pub fn resolves_reservation(&self) -> bool {
        matches!(self, MovementType::Venta | MovementType::CancelacionReserva)
    }

    /// Whether this entry changes real stock.
    pub fn affects_real_stock(&self) -> bool {
        !matches!(self, MovementType::Reserva | MovementType::CancelacionReserva)
    }
}

impl core::fmt::Display for MovementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for MovementType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entrada" => Ok(MovementType::Entrada),
            "salida" => Ok(MovementType::Salida),
            "ajuste" => Ok(MovementType::Ajuste),
            "reserva" => Ok(MovementType::Reserva),
            "venta" => Ok(MovementType::Venta),
            "cancelacion_reserva" => Ok(MovementType::CancelacionReserva),
            other => Err(DomainError::validation(format!("unknown movement type '{other}'"))),
        }
    }
}

/// A movement ready to be appended to the ledger (not yet assigned a sequence).
///
/// The store assigns the sequence number during append, within the transaction
/// that holds the product lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMovement {
    pub movement_id: MovementId,
    pub product_id: ProductId,
    pub order_id: Option<OrderId>,
    pub movement_type: MovementType,
    /// Signed: negative leaves (or is earmarked), positive returns.
    pub quantity: i64,
    pub stock_before: i64,
    pub stock_after: i64,
    pub reason: String,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// An appended, immutable ledger entry.
///
/// `sequence` is monotonically increasing across the whole ledger and fixes the
/// replay order used to derive reserved stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub movement_id: MovementId,
    pub sequence: u64,
    pub product_id: ProductId,
    pub order_id: Option<OrderId>,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub stock_before: i64,
    pub stock_after: i64,
    pub reason: String,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl PendingMovement {
    pub fn commit(self, sequence: u64) -> StockMovement {
        StockMovement {
            movement_id: self.movement_id,
            sequence,
            product_id: self.product_id,
            order_id: self.order_id,
            movement_type: self.movement_type,
            quantity: self.quantity,
            stock_before: self.stock_before,
            stock_after: self.stock_after,
            reason: self.reason,
            user_id: self.user_id,
            occurred_at: self.occurred_at,
        }
    }
}

impl Entity for StockMovement {
    type Id = MovementId;

    fn id(&self) -> &Self::Id {
        &self.movement_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_types_use_ledger_names() {
        assert_eq!(MovementType::CancelacionReserva.to_string(), "cancelacion_reserva");
        for t in [
            MovementType::Entrada,
            MovementType::Salida,
            MovementType::Ajuste,
            MovementType::Reserva,
            MovementType::Venta,
            MovementType::CancelacionReserva,
        ] {
            assert_eq!(t.as_str().parse::<MovementType>().unwrap(), t);
        }
    }

    #[test]
    fn only_sales_and_cancellations_resolve() {
        assert!(MovementType::Venta.resolves_reservation());
        assert!(MovementType::CancelacionReserva.resolves_reservation());
        assert!(!MovementType::Reserva.resolves_reservation());
        assert!(!MovementType::Ajuste.resolves_reservation());
        assert!(!MovementType::Reserva.affects_real_stock());
        assert!(MovementType::Venta.affects_real_stock());
    }
}
