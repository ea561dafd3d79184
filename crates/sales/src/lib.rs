//! Customer orders domain module.
//!
//! This crate contains the order lifecycle state machine as deterministic domain
//! logic (no IO, no HTTP, no storage). Which stock operation accompanies each
//! transition is declared here (`StockEffect`) and carried out by the infra
//! workflow inside the same transaction.

pub mod number;
pub mod order;
pub mod placement;

pub use number::OrderNumber;
pub use order::{
    Order, OrderCommand, OrderEvent, OrderPlaced, OrderSnapshot, OrderStatus, OrderTransition,
    PlaceOrder, StockEffect, TransitionKind,
};
pub use placement::{
    CustomerInfo, DeliveryOption, NewOrder, OrderItem, OrderTotals, OrderType, ShippingAddress,
};
