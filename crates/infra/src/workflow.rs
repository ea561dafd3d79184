//! Order workflow: the order state machine wired to the reservation engine.
//!
//! Every transition runs in one transaction holding the order lock: the
//! aggregate decides, the declared [`StockEffect`] is carried out on the ledger,
//! and the updated order is written. Nothing is committed if any step fails.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use storefront_core::{Actor, Aggregate, DomainError, OrderId};
use storefront_inventory::{LineRequest, merge_lines};
use storefront_sales::{
    NewOrder, Order, OrderCommand, OrderItem, OrderNumber, OrderSnapshot, OrderTransition, PlaceOrder,
    StockEffect, TransitionKind,
};

use crate::engine::{confirm_in, release_in, reserve_in};
use crate::error::WorkflowResult;
use crate::notify::ReceiptNotifier;
use crate::store::{OrderFilter, Store};

pub struct OrderWorkflow {
    store: Arc<dyn Store>,
    notifier: Arc<dyn ReceiptNotifier>,
}

impl OrderWorkflow {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn ReceiptNotifier>) -> Self {
        Self { store, notifier }
    }

    /// Place an order and reserve its stock in the same transaction.
    #[instrument(skip(self, actor, request), fields(user_id = %actor.user_id, order_type = request.order_type.as_str(), order_id = tracing::field::Empty))]
    pub async fn create(&self, actor: &Actor, request: NewOrder) -> WorkflowResult<OrderSnapshot> {
        let request = request.validated(actor)?;
        let lines = merge_lines(&request.items)?;
        let order_id = OrderId::new();
        tracing::Span::current().record("order_id", tracing::field::display(order_id));
        let now = Utc::now();

        let mut tx = self.store.begin().await?;
        reserve_in(tx.as_mut(), &lines, order_id, actor.user_id, now).await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let product = tx
                .get_product(line.product_id)
                .await?
                .ok_or_else(|| DomainError::not_found(format!("product {}", line.product_id)))?;
            items.push(OrderItem::snapshot(&product, line.quantity)?);
        }

        let day = now.date_naive();
        let sequence = tx.next_order_sequence(day).await?;
        let number = OrderNumber::for_day(day, sequence)?;

        let mut order = Order::empty(order_id);
        let events = order.handle(&OrderCommand::Place(PlaceOrder {
            order_id,
            number,
            order_type: request.order_type,
            delivery_option: request.delivery_option,
            customer: request.customer,
            items,
            shipping_address: request.shipping_address,
            shipping_cost: request.shipping_cost,
            notes: request.notes,
            user_id: actor.user_id,
            occurred_at: now,
        }))?;
        for event in &events {
            order.apply(event);
        }

        let snapshot = order
            .snapshot()
            .ok_or_else(|| DomainError::invariant("placed order is incomplete"))?;
        tx.insert_order(&snapshot).await?;
        tx.commit().await?;

        tracing::info!(order_id = %snapshot.id, order_number = %snapshot.order_number, total = snapshot.total, "order placed");
        Ok(snapshot)
    }

    pub async fn mark_in_progress(&self, actor: &Actor, id: OrderId) -> WorkflowResult<OrderSnapshot> {
        self.transition(actor, id, TransitionKind::MarkInProgress).await
    }

    /// Confirm the sale. The receipt is sent after commit; a failed receipt is
    /// logged and does not affect the order.
    pub async fn complete(&self, actor: &Actor, id: OrderId) -> WorkflowResult<OrderSnapshot> {
        let order = self.transition(actor, id, TransitionKind::Complete).await?;
        if let Err(err) = self.notifier.send_receipt(&order).await {
            tracing::warn!(order_id = %order.id, error = %err, "receipt notification failed");
        }
        Ok(order)
    }

    pub async fn cancel(&self, actor: &Actor, id: OrderId) -> WorkflowResult<OrderSnapshot> {
        self.transition(actor, id, TransitionKind::Cancel).await
    }

    pub async fn archive(&self, actor: &Actor, id: OrderId) -> WorkflowResult<OrderSnapshot> {
        self.transition(actor, id, TransitionKind::Archive).await
    }

    pub async fn unarchive(&self, actor: &Actor, id: OrderId) -> WorkflowResult<OrderSnapshot> {
        self.transition(actor, id, TransitionKind::Unarchive).await
    }

    /// Soft-delete. An order still holding stock gives it back.
    pub async fn delete(&self, actor: &Actor, id: OrderId) -> WorkflowResult<OrderSnapshot> {
        self.transition(actor, id, TransitionKind::Delete).await
    }

    /// Undo a soft-delete. An active order reserves its items again and stays
    /// deleted if the stock is gone.
    pub async fn restore(&self, actor: &Actor, id: OrderId) -> WorkflowResult<OrderSnapshot> {
        self.transition(actor, id, TransitionKind::Restore).await
    }

    #[instrument(skip(self, actor), fields(order_id = %id))]
    pub async fn get(&self, actor: &Actor, id: OrderId, include_deleted: bool) -> WorkflowResult<OrderSnapshot> {
        let mut tx = self.store.begin().await?;
        let order = tx.get_order(id).await?;
        tx.rollback().await?;

        let order = order
            .filter(|o| include_deleted || o.deleted_at.is_none())
            .ok_or_else(|| DomainError::not_found(format!("order {id}")))?;
        ensure_can_view(actor, &order)?;
        Ok(order)
    }

    /// Staff see every order; customers only their own, never deleted ones.
    #[instrument(skip(self, actor, filter), fields(user_id = %actor.user_id))]
    pub async fn list(&self, actor: &Actor, mut filter: OrderFilter) -> WorkflowResult<Vec<OrderSnapshot>> {
        if !actor.role.is_elevated() {
            filter.user_id = Some(actor.user_id);
            filter.include_deleted = false;
        }

        let mut tx = self.store.begin().await?;
        let orders = tx.list_orders(&filter).await?;
        tx.rollback().await?;
        Ok(orders)
    }

    #[instrument(skip(self, actor), fields(order_id = %id, action = kind.action()))]
    async fn transition(&self, actor: &Actor, id: OrderId, kind: TransitionKind) -> WorkflowResult<OrderSnapshot> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let current = tx
            .lock_order(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("order {id}")))?;
        ensure_can_transition(actor, &current, kind)?;

        let mut order = Order::from(current);
        let from = order.status();
        let events = order.handle(&OrderCommand::Transition(OrderTransition { kind, occurred_at: now }))?;

        match order.stock_effect(kind) {
            StockEffect::None => {}
            StockEffect::Reserve => {
                let lines: Vec<LineRequest> = order
                    .items()
                    .iter()
                    .map(|item| LineRequest {
                        product_id: item.product_id,
                        quantity: item.quantity,
                    })
                    .collect();
                reserve_in(tx.as_mut(), &lines, id, actor.user_id, now).await?;
            }
            StockEffect::ConfirmSale => {
                confirm_in(tx.as_mut(), id, actor.user_id, now).await?;
            }
            StockEffect::Release => {
                release_in(tx.as_mut(), id, actor.user_id, now).await?;
            }
        }

        for event in &events {
            order.apply(event);
        }
        let updated = order
            .snapshot()
            .ok_or_else(|| DomainError::invariant("stored order is incomplete"))?;
        tx.update_order(&updated).await?;
        tx.commit().await?;

        tracing::info!(from = %from, to = %updated.status, deleted = updated.deleted_at.is_some(), "order updated");
        Ok(updated)
    }
}

fn ensure_can_view(actor: &Actor, order: &OrderSnapshot) -> Result<(), DomainError> {
    if actor.role.is_elevated() || order.user_id == actor.user_id {
        Ok(())
    } else {
        Err(DomainError::Unauthorized)
    }
}

/// Customers may cancel their own orders; everything else is staff work.
fn ensure_can_transition(actor: &Actor, order: &OrderSnapshot, kind: TransitionKind) -> Result<(), DomainError> {
    match kind {
        TransitionKind::Cancel => ensure_can_view(actor, order),
        _ => actor.ensure_elevated(),
    }
}
