//! Pure stock decisions.
//!
//! Each function takes state that the caller has read *under the product lock*
//! and returns the ledger entry (and, where real stock changes, the updated
//! product) to persist in the same transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, MovementId, OrderId, StockShortage, UserId};

use crate::availability::available_stock;
use crate::movement::{MovementType, PendingMovement, StockMovement};
use crate::product::Product;

/// Decide whether `requested` units can be reserved for `order_id`.
///
/// `reserved` must be the product's current reserved stock. The resulting
/// `reserva` leaves real stock untouched.
pub fn decide_reservation(
    product: &Product,
    reserved: i64,
    requested: i64,
    order_id: OrderId,
    user_id: UserId,
    occurred_at: DateTime<Utc>,
) -> Result<PendingMovement, StockShortage> {
    let available = available_stock(product.stock, reserved);
    if requested <= 0 || requested > available {
        return Err(StockShortage::new(product.id, &product.name, requested, available));
    }

    Ok(PendingMovement {
        movement_id: MovementId::new(),
        product_id: product.id,
        order_id: Some(order_id),
        movement_type: MovementType::Reserva,
        quantity: -requested,
        stock_before: product.stock,
        stock_after: product.stock,
        reason: format!("Stock reserved for order {order_id}"),
        user_id,
        occurred_at,
    })
}

fn ensure_reservation_of(product: &Product, reservation: &StockMovement) -> DomainResult<OrderId> {
    if reservation.movement_type != MovementType::Reserva {
        return Err(DomainError::invariant(format!(
            "movement {} is a {}, not a reservation",
            reservation.movement_id, reservation.movement_type
        )));
    }
    if reservation.product_id != product.id {
        return Err(DomainError::invariant("reservation belongs to another product"));
    }
    reservation
        .order_id
        .ok_or_else(|| DomainError::invariant("reservation is not tied to an order"))
}

/// Convert a reservation into a sale: real stock drops by the reserved quantity.
pub fn decide_sale(
    product: &Product,
    reservation: &StockMovement,
    user_id: UserId,
    occurred_at: DateTime<Utc>,
) -> DomainResult<(Product, PendingMovement)> {
    let order_id = ensure_reservation_of(product, reservation)?;
    let quantity = reservation.quantity.abs();
    let updated = product.with_stock(product.stock - quantity)?;

    let movement = PendingMovement {
        movement_id: MovementId::new(),
        product_id: product.id,
        order_id: Some(order_id),
        movement_type: MovementType::Venta,
        quantity: -quantity,
        stock_before: product.stock,
        stock_after: updated.stock,
        reason: format!("Sale confirmed for order {order_id}"),
        user_id,
        occurred_at,
    };

    Ok((updated, movement))
}

/// Give a reservation back. Real stock is unchanged.
pub fn decide_release(
    product: &Product,
    reservation: &StockMovement,
    user_id: UserId,
    occurred_at: DateTime<Utc>,
) -> DomainResult<PendingMovement> {
    let order_id = ensure_reservation_of(product, reservation)?;

    Ok(PendingMovement {
        movement_id: MovementId::new(),
        product_id: product.id,
        order_id: Some(order_id),
        movement_type: MovementType::CancelacionReserva,
        quantity: reservation.quantity.abs(),
        stock_before: product.stock,
        stock_after: product.stock,
        reason: format!("Reservation released for order {order_id}"),
        user_id,
        occurred_at,
    })
}

/// Explicit stock change requested by staff.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "quantity", rename_all = "snake_case")]
pub enum StockAdjustment {
    /// Add units (goods received).
    Entrada(i64),
    /// Remove units.
    Salida(i64),
    /// Set the absolute on-hand quantity (stock count).
    Ajuste(i64),
}

impl StockAdjustment {
    fn movement_type(&self) -> MovementType {
        match self {
            StockAdjustment::Entrada(_) => MovementType::Entrada,
            StockAdjustment::Salida(_) => MovementType::Salida,
            StockAdjustment::Ajuste(_) => MovementType::Ajuste,
        }
    }

    fn target_stock(&self, current: i64) -> DomainResult<i64> {
        match *self {
            StockAdjustment::Entrada(q) | StockAdjustment::Salida(q) if q <= 0 => Err(
                DomainError::validation("adjustment quantity must be positive"),
            ),
            StockAdjustment::Entrada(q) => current
                .checked_add(q)
                .ok_or_else(|| DomainError::validation("adjusted stock overflows")),
            StockAdjustment::Salida(q) => current
                .checked_sub(q)
                .ok_or_else(|| DomainError::validation("adjusted stock overflows")),
            StockAdjustment::Ajuste(n) if n < 0 => {
                Err(DomainError::validation("counted stock cannot be negative"))
            }
            StockAdjustment::Ajuste(n) => Ok(n),
        }
    }
}

/// Apply an explicit adjustment.
///
/// Stock may never fall below what is already promised to open orders.
pub fn decide_adjustment(
    product: &Product,
    reserved: i64,
    adjustment: StockAdjustment,
    reason: &str,
    user_id: UserId,
    occurred_at: DateTime<Utc>,
) -> DomainResult<(Product, PendingMovement)> {
    let target = adjustment.target_stock(product.stock)?;
    let delta = target - product.stock;
    if delta == 0 {
        return Err(DomainError::validation("adjustment does not change stock"));
    }

    if target < reserved.max(0) {
        return Err(DomainError::insufficient_stock(vec![StockShortage::new(
            product.id,
            &product.name,
            -delta,
            available_stock(product.stock, reserved),
        )]));
    }

    let updated = product.with_stock(target)?;
    let reason = if reason.trim().is_empty() {
        format!("Manual {} of {} units", adjustment.movement_type(), delta.abs())
    } else {
        reason.trim().to_string()
    };

    let movement = PendingMovement {
        movement_id: MovementId::new(),
        product_id: product.id,
        order_id: None,
        movement_type: adjustment.movement_type(),
        quantity: delta,
        stock_before: product.stock,
        stock_after: updated.stock,
        reason,
        user_id,
        occurred_at,
    };

    Ok((updated, movement))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use storefront_core::ProductId;

    use super::*;
    use crate::ledger::{ReservationLedger, active_reservations_for_order};

    fn product(stock: i64) -> Product {
        Product {
            id: ProductId::new(),
            sku: "MUG-01".to_string(),
            name: "Mug".to_string(),
            price: 1200,
            stock,
            stock_min: 2,
        }
    }

    #[test]
    fn reservation_keeps_real_stock() {
        let p = product(10);
        let m = decide_reservation(&p, 0, 5, OrderId::new(), UserId::new(), Utc::now()).unwrap();
        assert_eq!(m.movement_type, MovementType::Reserva);
        assert_eq!(m.quantity, -5);
        assert_eq!(m.stock_before, 10);
        assert_eq!(m.stock_after, 10);
    }

    #[test]
    fn reservation_beyond_available_reports_shortage() {
        let p = product(10);
        let shortage =
            decide_reservation(&p, 5, 6, OrderId::new(), UserId::new(), Utc::now()).unwrap_err();
        assert_eq!(shortage.requested, 6);
        assert_eq!(shortage.available, 5);
        assert_eq!(shortage.product_name, "Mug");
    }

    #[test]
    fn sale_decrements_by_reserved_quantity() {
        let p = product(10);
        let r = decide_reservation(&p, 0, 4, OrderId::new(), UserId::new(), Utc::now())
            .unwrap()
            .commit(1);
        let (updated, sale) = decide_sale(&p, &r, UserId::new(), Utc::now()).unwrap();
        assert_eq!(updated.stock, 6);
        assert_eq!(sale.movement_type, MovementType::Venta);
        assert_eq!(sale.quantity, -4);
        assert_eq!((sale.stock_before, sale.stock_after), (10, 6));
        assert_eq!(sale.order_id, r.order_id);
    }

    #[test]
    fn release_returns_positive_quantity() {
        let p = product(10);
        let r = decide_reservation(&p, 0, 3, OrderId::new(), UserId::new(), Utc::now())
            .unwrap()
            .commit(1);
        let rel = decide_release(&p, &r, UserId::new(), Utc::now()).unwrap();
        assert_eq!(rel.movement_type, MovementType::CancelacionReserva);
        assert_eq!(rel.quantity, 3);
        assert_eq!(rel.stock_before, rel.stock_after);
    }

    #[test]
    fn sale_rejects_non_reservation_entries() {
        let p = product(10);
        let mut r = decide_reservation(&p, 0, 3, OrderId::new(), UserId::new(), Utc::now())
            .unwrap()
            .commit(1);
        r.movement_type = MovementType::Entrada;
        assert!(matches!(
            decide_sale(&p, &r, UserId::new(), Utc::now()),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn adjustments_move_stock_and_record_delta() {
        let p = product(10);
        let (after_in, m) =
            decide_adjustment(&p, 0, StockAdjustment::Entrada(5), "delivery", UserId::new(), Utc::now())
                .unwrap();
        assert_eq!(after_in.stock, 15);
        assert_eq!(m.quantity, 5);
        assert_eq!(m.reason, "delivery");

        let (counted, m) =
            decide_adjustment(&p, 0, StockAdjustment::Ajuste(7), "", UserId::new(), Utc::now()).unwrap();
        assert_eq!(counted.stock, 7);
        assert_eq!(m.quantity, -3);
        assert_eq!(m.movement_type, MovementType::Ajuste);
    }

    #[test]
    fn huge_entrada_is_rejected_instead_of_wrapping() {
        let p = product(10);
        let err = decide_adjustment(&p, 0, StockAdjustment::Entrada(i64::MAX), "", UserId::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn adjustment_cannot_undercut_reservations() {
        let p = product(10);
        let err =
            decide_adjustment(&p, 8, StockAdjustment::Salida(3), "damaged", UserId::new(), Utc::now())
                .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock(_)));

        let err = decide_adjustment(&p, 0, StockAdjustment::Ajuste(10), "", UserId::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Reserve { order: usize, qty: i64 },
        Confirm { order: usize },
        Release { order: usize },
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..4, 1i64..8).prop_map(|(order, qty)| Op::Reserve { order, qty }),
            (0usize..4).prop_map(|order| Op::Confirm { order }),
            (0usize..4).prop_map(|order| Op::Release { order }),
        ]
    }

    proptest! {
        #[test]
        fn ledger_never_oversells(initial in 0i64..30, ops in prop::collection::vec(op_strategy(), 0..40)) {
            let orders: Vec<OrderId> = (0..4).map(|_| OrderId::new()).collect();
            let user = UserId::new();
            let mut p = product(initial);
            let mut ledger: Vec<StockMovement> = Vec::new();
            let mut sold = 0i64;

            for op in ops {
                match op {
                    Op::Reserve { order, qty } => {
                        let replayed = ReservationLedger::replay(&ledger);
                        if replayed.reserved_for(orders[order]) > 0 {
                            continue;
                        }
                        if let Ok(m) = decide_reservation(&p, replayed.reserved(), qty, orders[order], user, Utc::now()) {
                            let seq = ledger.len() as u64 + 1;
                            ledger.push(m.commit(seq));
                        }
                    }
                    Op::Confirm { order } => {
                        for r in active_reservations_for_order(&ledger, orders[order]) {
                            let (updated, m) = decide_sale(&p, &r, user, Utc::now()).unwrap();
                            sold += -m.quantity;
                            p = updated;
                            let seq = ledger.len() as u64 + 1;
                            ledger.push(m.commit(seq));
                        }
                    }
                    Op::Release { order } => {
                        for r in active_reservations_for_order(&ledger, orders[order]) {
                            let m = decide_release(&p, &r, user, Utc::now()).unwrap();
                            let seq = ledger.len() as u64 + 1;
                            ledger.push(m.commit(seq));
                        }
                    }
                }

                let reserved = ReservationLedger::replay(&ledger).reserved();
                prop_assert!(p.stock >= 0);
                prop_assert!(reserved <= p.stock);
                prop_assert!(reserved + sold <= initial);
                prop_assert_eq!(p.stock, initial - sold);
            }
        }
    }
}
