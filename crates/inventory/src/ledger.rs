//! Ledger replay: deriving reservation state from the append-only movement log.
//!
//! Reserved stock is never stored. It is recomputed from the ledger on every
//! call, so a crash between two workflow steps leaves nothing to repair.
//!
//! A `reserva` entry is active until a later `venta` or `cancelacion_reserva`
//! entry for the same (order, product) pair appears. Resolution is positional:
//! an order that reserves again after releasing holds the new reservation.

use std::collections::{BTreeMap, HashMap};

use storefront_core::{OrderId, ProductId};

use crate::movement::{MovementType, StockMovement};

/// Reservation state of a single product, rebuilt from its ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationLedger {
    active: HashMap<Option<OrderId>, i64>,
}

impl ReservationLedger {
    /// Replay one product's movements. Input order does not matter; entries are
    /// replayed by `sequence`.
    pub fn replay<'a, I>(movements: I) -> Self
    where
        I: IntoIterator<Item = &'a StockMovement>,
    {
        let mut ordered: Vec<&StockMovement> = movements.into_iter().collect();
        ordered.sort_by_key(|m| m.sequence);

        let mut active: HashMap<Option<OrderId>, i64> = HashMap::new();
        for m in ordered {
            match m.movement_type {
                MovementType::Reserva => {
                    *active.entry(m.order_id).or_insert(0) += m.quantity.abs();
                }
                t if t.resolves_reservation() && m.order_id.is_some() => {
                    active.remove(&m.order_id);
                }
                _ => {}
            }
        }

        Self { active }
    }

    /// Total quantity currently earmarked by unresolved reservations.
    pub fn reserved(&self) -> i64 {
        self.active.values().sum()
    }

    /// Quantity currently earmarked for one order.
    pub fn reserved_for(&self, order_id: OrderId) -> i64 {
        self.active.get(&Some(order_id)).copied().unwrap_or(0)
    }
}

/// Active `reserva` entries of one order, given that order's movements.
///
/// Returned in ascending product id order (then ledger order), which is the
/// lock acquisition order used when confirming or releasing them.
pub fn active_reservations_for_order(
    order_movements: &[StockMovement],
    order_id: OrderId,
) -> Vec<StockMovement> {
    let mut ordered: Vec<&StockMovement> = order_movements
        .iter()
        .filter(|m| m.order_id == Some(order_id))
        .collect();
    ordered.sort_by_key(|m| m.sequence);

    let mut per_product: BTreeMap<ProductId, Vec<StockMovement>> = BTreeMap::new();
    for m in ordered {
        match m.movement_type {
            MovementType::Reserva => per_product.entry(m.product_id).or_default().push(m.clone()),
            t if t.resolves_reservation() => {
                per_product.remove(&m.product_id);
            }
            _ => {}
        }
    }

    per_product.into_values().flatten().collect()
}
