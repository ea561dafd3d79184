//! Stock reservation engine.
//!
//! Wraps the pure decisions of `storefront-inventory` in store transactions.
//! Each public operation is one transaction; the `*_in` steps run inside a
//! caller's transaction so the order workflow can commit stock changes and the
//! order update together.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;

use storefront_core::{Actor, DomainError, OrderId, ProductId, StockShortage, UserId};
use storefront_inventory::{
    AvailabilityReport, LineRequest, NewProduct, Product, ReservationLedger, StockAdjustment, StockLevel,
    StockMovement, active_reservations_for_order, available_stock, decide_adjustment, decide_release,
    decide_reservation, decide_sale, merge_lines,
};

use crate::error::WorkflowResult;
use crate::store::{Store, StoreTx};

pub struct ReservationEngine {
    store: Arc<dyn Store>,
}

impl ReservationEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, actor, new_product), fields(sku = %new_product.sku))]
    pub async fn create_product(&self, actor: &Actor, new_product: NewProduct) -> WorkflowResult<Product> {
        actor.ensure_elevated()?;
        let product = new_product.into_product(ProductId::new())?;

        let mut tx = self.store.begin().await?;
        tx.insert_product(&product).await?;
        tx.commit().await?;

        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    pub async fn list_products(&self) -> WorkflowResult<Vec<Product>> {
        let mut tx = self.store.begin().await?;
        let products = tx.list_products().await?;
        tx.rollback().await?;
        Ok(products)
    }

    /// Sum of active reservations, derived from the ledger.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_reserved_stock(&self, product_id: ProductId) -> WorkflowResult<i64> {
        let mut tx = self.store.begin().await?;
        let reserved = reserved_in(tx.as_mut(), product_id).await?;
        tx.rollback().await?;
        Ok(reserved)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_available_stock(&self, product_id: ProductId) -> WorkflowResult<i64> {
        Ok(self.stock_level(product_id).await?.available)
    }

    /// Advisory check; takes no locks and reserves nothing.
    ///
    /// Unknown products are reported as shortages with nothing available.
    #[instrument(skip(self, items), fields(lines = items.len()))]
    pub async fn check_availability(&self, items: &[LineRequest]) -> WorkflowResult<AvailabilityReport> {
        let lines = merge_lines(items)?;
        let mut tx = self.store.begin().await?;

        let mut shortages = Vec::new();
        for line in &lines {
            match tx.get_product(line.product_id).await? {
                None => shortages.push(StockShortage::new(
                    line.product_id,
                    format!("unknown product {}", line.product_id),
                    line.quantity,
                    0,
                )),
                Some(product) => {
                    let reserved = reserved_in(tx.as_mut(), product.id).await?;
                    let available = available_stock(product.stock, reserved);
                    if line.quantity > available {
                        shortages.push(StockShortage::new(product.id, &product.name, line.quantity, available));
                    }
                }
            }
        }
        tx.rollback().await?;

        Ok(AvailabilityReport::from_shortages(shortages))
    }

    #[instrument(skip(self, items), fields(order_id = %order_id, lines = items.len()))]
    pub async fn reserve_stock(
        &self,
        items: &[LineRequest],
        order_id: OrderId,
        user_id: UserId,
    ) -> WorkflowResult<Vec<StockMovement>> {
        let mut tx = self.store.begin().await?;
        let movements = reserve_in(tx.as_mut(), items, order_id, user_id, Utc::now()).await?;
        tx.commit().await?;
        Ok(movements)
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn confirm_sale(&self, order_id: OrderId, user_id: UserId) -> WorkflowResult<Vec<StockMovement>> {
        let mut tx = self.store.begin().await?;
        let movements = confirm_in(tx.as_mut(), order_id, user_id, Utc::now()).await?;
        tx.commit().await?;
        Ok(movements)
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn release_reserved_stock(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> WorkflowResult<Vec<StockMovement>> {
        let mut tx = self.store.begin().await?;
        let movements = release_in(tx.as_mut(), order_id, user_id, Utc::now()).await?;
        tx.commit().await?;
        Ok(movements)
    }

    #[instrument(skip(self, actor, reason), fields(product_id = %product_id, adjustment = ?adjustment))]
    pub async fn adjust_stock(
        &self,
        actor: &Actor,
        product_id: ProductId,
        adjustment: StockAdjustment,
        reason: &str,
    ) -> WorkflowResult<StockMovement> {
        actor.ensure_elevated()?;

        let mut tx = self.store.begin().await?;
        let product = lock_existing(tx.as_mut(), product_id).await?;
        let reserved = reserved_in(tx.as_mut(), product_id).await?;

        let (updated, pending) =
            decide_adjustment(&product, reserved, adjustment, reason, actor.user_id, Utc::now())?;
        tx.update_product_stock(product_id, updated.stock).await?;
        let movement = tx.append_movement(pending).await?;
        tx.commit().await?;

        tracing::info!(stock_before = movement.stock_before, stock_after = movement.stock_after, "stock adjusted");
        Ok(movement)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn stock_level(&self, product_id: ProductId) -> WorkflowResult<StockLevel> {
        let mut tx = self.store.begin().await?;
        let product = tx
            .get_product(product_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("product {product_id}")))?;
        let reserved = reserved_in(tx.as_mut(), product_id).await?;
        tx.rollback().await?;
        Ok(StockLevel::of(&product, reserved))
    }

    /// The product's ledger in sequence order.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn movement_history(&self, product_id: ProductId) -> WorkflowResult<Vec<StockMovement>> {
        let mut tx = self.store.begin().await?;
        if tx.get_product(product_id).await?.is_none() {
            return Err(DomainError::not_found(format!("product {product_id}")).into());
        }
        let movements = tx.movements_for_product(product_id).await?;
        tx.rollback().await?;
        Ok(movements)
    }

    pub async fn low_stock_products(&self) -> WorkflowResult<Vec<Product>> {
        Ok(self
            .list_products()
            .await?
            .into_iter()
            .filter(Product::is_low_stock)
            .collect())
    }
}

#[instrument(skip_all, fields(product_id = %product_id))]
async fn lock_existing(tx: &mut dyn StoreTx, product_id: ProductId) -> WorkflowResult<Product> {
    Ok(tx
        .lock_product(product_id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("product {product_id}")))?)
}

#[instrument(skip_all, fields(product_id = %product_id))]
async fn reserved_in(tx: &mut dyn StoreTx, product_id: ProductId) -> WorkflowResult<i64> {
    let movements = tx.movements_for_product(product_id).await?;
    Ok(ReservationLedger::replay(&movements).reserved())
}

/// Reserve every line for `order_id`, or nothing.
///
/// Lines are merged and locked in ascending product id order. Every shortage is
/// collected before failing so the caller can report all of them.
pub(crate) async fn reserve_in(
    tx: &mut dyn StoreTx,
    items: &[LineRequest],
    order_id: OrderId,
    user_id: UserId,
    at: DateTime<Utc>,
) -> WorkflowResult<Vec<StockMovement>> {
    let lines = merge_lines(items)?;

    let mut shortages = Vec::new();
    let mut pending = Vec::with_capacity(lines.len());
    for line in &lines {
        let product = lock_existing(tx, line.product_id).await?;
        let movements = tx.movements_for_product(product.id).await?;
        let ledger = ReservationLedger::replay(&movements);

        if ledger.reserved_for(order_id) > 0 {
            return Err(DomainError::conflict(format!(
                "order {order_id} already holds a reservation for {}",
                product.name
            ))
            .into());
        }

        match decide_reservation(&product, ledger.reserved(), line.quantity, order_id, user_id, at) {
            Ok(movement) => pending.push(movement),
            Err(shortage) => shortages.push(shortage),
        }
    }

    if !shortages.is_empty() {
        tracing::info!(order_id = %order_id, shortages = shortages.len(), "reservation rejected: insufficient stock");
        return Err(DomainError::insufficient_stock(shortages).into());
    }

    let mut appended = Vec::with_capacity(pending.len());
    for movement in pending {
        appended.push(tx.append_movement(movement).await?);
    }
    Ok(appended)
}

/// Lock the products an order has reserved and return its active reservations,
/// read after the locks are held.
async fn lock_order_reservations(
    tx: &mut dyn StoreTx,
    order_id: OrderId,
) -> WorkflowResult<(HashMap<ProductId, Product>, Vec<StockMovement>)> {
    let seen = active_reservations_for_order(&tx.movements_for_order(order_id).await?, order_id);
    let product_ids: BTreeSet<ProductId> = seen.iter().map(|m| m.product_id).collect();

    let mut products = HashMap::with_capacity(product_ids.len());
    for id in product_ids {
        products.insert(id, lock_existing(tx, id).await?);
    }

    let active = active_reservations_for_order(&tx.movements_for_order(order_id).await?, order_id);
    ensure_locked(&products, &active, order_id)?;

    Ok((products, active))
}

/// Every active reservation must be on a product locked in the first pass.
///
/// Locking a late arrival would break ascending lock order, so the caller
/// retries from scratch instead.
fn ensure_locked(
    products: &HashMap<ProductId, Product>,
    active: &[StockMovement],
    order_id: OrderId,
) -> Result<(), DomainError> {
    match active.iter().find(|m| !products.contains_key(&m.product_id)) {
        None => Ok(()),
        Some(m) => Err(DomainError::conflict(format!(
            "reservations of order {order_id} changed while locking (product {})",
            m.product_id
        ))),
    }
}

/// Turn the order's active reservations into sales.
pub(crate) async fn confirm_in(
    tx: &mut dyn StoreTx,
    order_id: OrderId,
    user_id: UserId,
    at: DateTime<Utc>,
) -> WorkflowResult<Vec<StockMovement>> {
    let (mut products, active) = lock_order_reservations(tx, order_id).await?;

    let mut appended = Vec::with_capacity(active.len());
    for reservation in &active {
        let product = products
            .get(&reservation.product_id)
            .ok_or_else(|| DomainError::invariant("reserved product was not locked"))?;
        let (updated, movement) = decide_sale(product, reservation, user_id, at)?;

        tx.update_product_stock(updated.id, updated.stock).await?;
        appended.push(tx.append_movement(movement).await?);
        products.insert(updated.id, updated);
    }
    Ok(appended)
}

/// Give back the order's active reservations. Real stock is unchanged.
pub(crate) async fn release_in(
    tx: &mut dyn StoreTx,
    order_id: OrderId,
    user_id: UserId,
    at: DateTime<Utc>,
) -> WorkflowResult<Vec<StockMovement>> {
    let (products, active) = lock_order_reservations(tx, order_id).await?;

    let mut appended = Vec::with_capacity(active.len());
    for reservation in &active {
        let product = products
            .get(&reservation.product_id)
            .ok_or_else(|| DomainError::invariant("reserved product was not locked"))?;
        let movement = decide_release(product, reservation, user_id, at)?;
        appended.push(tx.append_movement(movement).await?);
    }
    Ok(appended)
}
