//! Transactional storage boundary.
//!
//! Every engine and workflow operation runs inside one [`StoreTx`]. Writes
//! become visible only on [`StoreTx::commit`]; dropping a transaction without
//! committing discards them and releases its locks.
//!
//! ## Locking
//!
//! `lock_product` / `lock_order` take an exclusive lock that is held until the
//! transaction ends. Callers lock products in ascending id order. Reads that feed
//! a decision (ledger replay, stock) must happen after the lock is held.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;

use storefront_core::{OrderId, ProductId};
use storefront_inventory::{PendingMovement, Product, StockMovement};
use storefront_sales::{OrderSnapshot, OrderStatus};

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

use crate::error::StoreError;

/// Filter for order listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub include_deleted: bool,
    /// Only orders created by this user.
    pub user_id: Option<storefront_core::UserId>,
}

impl OrderFilter {
    pub fn matches(&self, order: &OrderSnapshot) -> bool {
        if !self.include_deleted && order.deleted_at.is_some() {
            return false;
        }
        if let Some(status) = self.status {
            if order.status != status {
                return false;
            }
        }
        if let Some(user_id) = self.user_id {
            if order.user_id != user_id {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;
}

#[async_trait]
pub trait StoreTx: Send {
    // Products

    async fn insert_product(&mut self, product: &Product) -> Result<(), StoreError>;

    async fn get_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Exclusive lock on the product row, returning its current state.
    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Caller must hold the product lock.
    async fn update_product_stock(&mut self, id: ProductId, stock: i64) -> Result<(), StoreError>;

    async fn list_products(&mut self) -> Result<Vec<Product>, StoreError>;

    // Ledger

    /// Append one entry, assigning its sequence number.
    async fn append_movement(&mut self, movement: PendingMovement) -> Result<StockMovement, StoreError>;

    /// A product's ledger in sequence order.
    async fn movements_for_product(&mut self, id: ProductId) -> Result<Vec<StockMovement>, StoreError>;

    /// An order's ledger entries (all products) in sequence order.
    async fn movements_for_order(&mut self, id: OrderId) -> Result<Vec<StockMovement>, StoreError>;

    // Orders

    /// Atomically take the next order sequence number for `day` (starting at 1).
    async fn next_order_sequence(&mut self, day: NaiveDate) -> Result<u64, StoreError>;

    async fn insert_order(&mut self, order: &OrderSnapshot) -> Result<(), StoreError>;

    async fn get_order(&mut self, id: OrderId) -> Result<Option<OrderSnapshot>, StoreError>;

    /// Exclusive lock on the order row, returning its current state.
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<OrderSnapshot>, StoreError>;

    /// Persist status, soft-delete marker, timestamps and version.
    ///
    /// Caller must hold the order lock. Items and addresses never change.
    async fn update_order(&mut self, order: &OrderSnapshot) -> Result<(), StoreError>;

    /// Orders matching `filter`, newest first.
    async fn list_orders(&mut self, filter: &OrderFilter) -> Result<Vec<OrderSnapshot>, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
