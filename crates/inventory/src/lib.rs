//! Inventory domain module: products and the stock movement ledger.
//!
//! This crate contains the business rules of the stock reservation engine as
//! deterministic domain logic (no IO, no locking, no storage). The infra crate
//! loads state under the appropriate locks and asks these functions what to
//! append to the ledger.

pub mod availability;
pub mod decision;
pub mod ledger;
pub mod movement;
pub mod product;

pub use availability::{AvailabilityReport, LineRequest, StockLevel, available_stock, merge_lines};
pub use decision::{StockAdjustment, decide_adjustment, decide_release, decide_reservation, decide_sale};
pub use ledger::{ReservationLedger, active_reservations_for_order};
pub use movement::{MovementType, PendingMovement, StockMovement};
pub use product::{NewProduct, Product};
