//! `storefront-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the acting user, the domain error model and the aggregate traits
//! implemented by the inventory and sales crates.

pub mod actor;
pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use actor::{Actor, Role};
pub use aggregate::{Aggregate, AggregateRoot};
pub use entity::Entity;
pub use error::{DomainError, DomainResult, StockShortage};
pub use id::{MovementId, OrderId, ProductId, UserId};
pub use value_object::ValueObject;
