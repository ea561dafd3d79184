use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{Aggregate, AggregateRoot, DomainError, OrderId, UserId};

use crate::number::OrderNumber;
use crate::placement::{
    CustomerInfo, DeliveryOption, OrderItem, OrderTotals, OrderType, ShippingAddress,
};

/// Order status lifecycle.
///
/// `pending → in_progress → completed | cancelled`, `completed ⇄ archived`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
    Archived,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Archived => "archived",
        }
    }

    /// Statuses in which the order's stock is reserved but not yet sold.
    pub fn holds_reservation(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::InProgress)
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "in_progress" => Ok(OrderStatus::InProgress),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "archived" => Ok(OrderStatus::Archived),
            other => Err(DomainError::validation(format!("unknown order status '{other}'"))),
        }
    }
}

/// Stock operation that must commit together with a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockEffect {
    None,
    Reserve,
    ConfirmSale,
    Release,
}

/// Lifecycle operations on an existing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    MarkInProgress,
    Complete,
    Cancel,
    Archive,
    Unarchive,
    Delete,
    Restore,
}

impl TransitionKind {
    pub fn action(&self) -> &'static str {
        match self {
            TransitionKind::MarkInProgress => "start",
            TransitionKind::Complete => "complete",
            TransitionKind::Cancel => "cancel",
            TransitionKind::Archive => "archive",
            TransitionKind::Unarchive => "unarchive",
            TransitionKind::Delete => "delete",
            TransitionKind::Restore => "restore",
        }
    }
}

/// Command: PlaceOrder.
///
/// Item snapshots and the order number are produced by the caller inside the
/// placement transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub number: OrderNumber,
    pub order_type: OrderType,
    pub delivery_option: DeliveryOption,
    pub customer: CustomerInfo,
    pub items: Vec<OrderItem>,
    pub shipping_address: Option<ShippingAddress>,
    pub shipping_cost: u64,
    pub notes: Option<String>,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: a lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTransition {
    pub kind: TransitionKind,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    Place(PlaceOrder),
    Transition(OrderTransition),
}

/// Event: OrderPlaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub number: OrderNumber,
    pub order_type: OrderType,
    pub delivery_option: DeliveryOption,
    pub customer: CustomerInfo,
    pub items: Vec<OrderItem>,
    pub shipping_address: Option<ShippingAddress>,
    pub totals: OrderTotals,
    pub notes: Option<String>,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    Placed(OrderPlaced),
    StatusChanged {
        from: OrderStatus,
        to: OrderStatus,
        occurred_at: DateTime<Utc>,
    },
    Deleted {
        occurred_at: DateTime<Utc>,
    },
    Restored {
        occurred_at: DateTime<Utc>,
    },
}

/// Aggregate root: Order.
///
/// Persisted and exposed through [`OrderSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    number: Option<OrderNumber>,
    status: OrderStatus,
    order_type: OrderType,
    delivery_option: DeliveryOption,
    customer: CustomerInfo,
    items: Vec<OrderItem>,
    shipping_address: Option<ShippingAddress>,
    totals: OrderTotals,
    notes: Option<String>,
    user_id: Option<UserId>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
    version: u64,
}

/// Flat, fully-populated view of a placed order (storage rows, API bodies).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub status: OrderStatus,
    pub order_type: OrderType,
    pub delivery_option: DeliveryOption,
    pub customer: CustomerInfo,
    pub items: Vec<OrderItem>,
    pub shipping_address: Option<ShippingAddress>,
    pub subtotal: u64,
    pub shipping_cost: u64,
    pub total: u64,
    pub notes: Option<String>,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub version: u64,
}

impl Order {
    /// Create an empty, not-yet-placed aggregate instance.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            number: None,
            status: OrderStatus::Pending,
            order_type: OrderType::Online,
            delivery_option: DeliveryOption::Delivery,
            customer: CustomerInfo {
                name: String::new(),
                email: String::new(),
                phone: None,
            },
            items: Vec::new(),
            shipping_address: None,
            totals: OrderTotals {
                subtotal: 0,
                shipping_cost: 0,
                total: 0,
            },
            notes: None,
            user_id: None,
            created_at: None,
            updated_at: None,
            deleted_at: None,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn is_placed(&self) -> bool {
        self.number.is_some()
    }


    /// Order number for messages; falls back to the id before placement.
    pub fn reference(&self) -> String {
        match &self.number {
            Some(n) => n.to_string(),
            None => self.id.to_string(),
        }
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }




    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }



    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }


    /// Stock operation that accompanies `kind` from the current state.
    ///
    /// Only meaningful for transitions `handle` accepts.
    pub fn stock_effect(&self, kind: TransitionKind) -> StockEffect {
        match kind {
            TransitionKind::Complete => StockEffect::ConfirmSale,
            TransitionKind::Cancel => StockEffect::Release,
            TransitionKind::Delete if self.status.holds_reservation() => StockEffect::Release,
            TransitionKind::Restore if self.status.holds_reservation() => StockEffect::Reserve,
            _ => StockEffect::None,
        }
    }

    pub fn snapshot(&self) -> Option<OrderSnapshot> {
        Some(OrderSnapshot {
            id: self.id,
            order_number: self.number.clone()?,
            status: self.status,
            order_type: self.order_type,
            delivery_option: self.delivery_option,
            customer: self.customer.clone(),
            items: self.items.clone(),
            shipping_address: self.shipping_address.clone(),
            subtotal: self.totals.subtotal,
            shipping_cost: self.totals.shipping_cost,
            total: self.totals.total,
            notes: self.notes.clone(),
            user_id: self.user_id?,
            created_at: self.created_at?,
            updated_at: self.updated_at?,
            deleted_at: self.deleted_at,
            version: self.version,
        })
    }
}

impl From<OrderSnapshot> for Order {
    fn from(s: OrderSnapshot) -> Self {
        Self {
            id: s.id,
            number: Some(s.order_number),
            status: s.status,
            order_type: s.order_type,
            delivery_option: s.delivery_option,
            customer: s.customer,
            items: s.items,
            shipping_address: s.shipping_address,
            totals: OrderTotals {
                subtotal: s.subtotal,
                shipping_cost: s.shipping_cost,
                total: s.total,
            },
            notes: s.notes,
            user_id: Some(s.user_id),
            created_at: Some(s.created_at),
            updated_at: Some(s.updated_at),
            deleted_at: s.deleted_at,
            version: s.version,
        }
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::Placed(e) => {
                self.id = e.order_id;
                self.number = Some(e.number.clone());
                self.status = OrderStatus::Pending;
                self.order_type = e.order_type;
                self.delivery_option = e.delivery_option;
                self.customer = e.customer.clone();
                self.items = e.items.clone();
                self.shipping_address = e.shipping_address.clone();
                self.totals = e.totals;
                self.notes = e.notes.clone();
                self.user_id = Some(e.user_id);
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.deleted_at = None;
            }
            OrderEvent::StatusChanged { to, occurred_at, .. } => {
                self.status = *to;
                self.updated_at = Some(*occurred_at);
            }
            OrderEvent::Deleted { occurred_at } => {
                self.deleted_at = Some(*occurred_at);
                self.updated_at = Some(*occurred_at);
            }
            OrderEvent::Restored { occurred_at } => {
                self.deleted_at = None;
                self.updated_at = Some(*occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::Place(cmd) => self.handle_place(cmd),
            OrderCommand::Transition(cmd) => self.handle_transition(cmd),
        }
    }
}

impl Order {
    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<OrderEvent>, DomainError> {
        if self.is_placed() {
            return Err(DomainError::conflict("order already exists"));
        }
        if cmd.order_id != self.id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        if cmd.items.is_empty() {
            return Err(DomainError::validation("an order needs at least one item"));
        }
        if cmd.order_type == OrderType::InStore && cmd.shipping_address.is_some() {
            return Err(DomainError::validation("in-store orders have no shipping address"));
        }

        let totals = OrderTotals::compute(&cmd.items, cmd.shipping_cost)?;

        Ok(vec![OrderEvent::Placed(OrderPlaced {
            order_id: cmd.order_id,
            number: cmd.number.clone(),
            order_type: cmd.order_type,
            delivery_option: cmd.delivery_option,
            customer: cmd.customer.clone(),
            items: cmd.items.clone(),
            shipping_address: cmd.shipping_address.clone(),
            totals,
            notes: cmd.notes.clone(),
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_transition(&self, cmd: &OrderTransition) -> Result<Vec<OrderEvent>, DomainError> {
        if !self.is_placed() {
            return Err(DomainError::not_found(format!("order {}", self.id)));
        }

        let at = cmd.occurred_at;
        match cmd.kind {
            TransitionKind::Restore => {
                if !self.is_deleted() {
                    return Err(DomainError::conflict(format!(
                        "order {} is not deleted",
                        self.reference()
                    )));
                }
                return Ok(vec![OrderEvent::Restored { occurred_at: at }]);
            }
            _ if self.is_deleted() => {
                return Err(DomainError::not_found(format!("order {}", self.reference())));
            }
            TransitionKind::Delete => return Ok(vec![OrderEvent::Deleted { occurred_at: at }]),
            _ => {}
        }

        let to = match (cmd.kind, self.status) {
            (TransitionKind::MarkInProgress, OrderStatus::Pending) => OrderStatus::InProgress,
            (TransitionKind::Complete, OrderStatus::Pending | OrderStatus::InProgress) => {
                OrderStatus::Completed
            }
            (TransitionKind::Cancel, OrderStatus::Pending | OrderStatus::InProgress) => {
                OrderStatus::Cancelled
            }
            (TransitionKind::Archive, OrderStatus::Completed) => OrderStatus::Archived,
            (TransitionKind::Unarchive, OrderStatus::Archived) => OrderStatus::Completed,
            (kind, from) => {
                return Err(DomainError::invalid_transition(self.reference(), from, kind.action()));
            }
        };

        Ok(vec![OrderEvent::StatusChanged {
            from: self.status,
            to,
            occurred_at: at,
        }])
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use storefront_core::ProductId;

    use super::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn item() -> OrderItem {
        OrderItem {
            product_id: ProductId::new(),
            product_name: "Mug".to_string(),
            sku: "MUG-01".to_string(),
            unit_price: 1200,
            quantity: 2,
            subtotal: 2400,
        }
    }

    fn place_cmd(order_id: OrderId) -> PlaceOrder {
        PlaceOrder {
            order_id,
            number: OrderNumber::for_day(test_time().date_naive(), 1).unwrap(),
            order_type: OrderType::Online,
            delivery_option: DeliveryOption::Pickup,
            customer: CustomerInfo {
                name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
                phone: None,
            },
            items: vec![item()],
            shipping_address: None,
            shipping_cost: 0,
            notes: None,
            user_id: UserId::new(),
            occurred_at: test_time(),
        }
    }

    fn placed_order() -> Order {
        let id = OrderId::new();
        let mut order = Order::empty(id);
        let events = order.handle(&OrderCommand::Place(place_cmd(id))).unwrap();
        for e in &events {
            order.apply(e);
        }
        order
    }

    fn run(order: &mut Order, kind: TransitionKind) -> Result<(), DomainError> {
        let events = order.handle(&OrderCommand::Transition(OrderTransition {
            kind,
            occurred_at: test_time(),
        }))?;
        for e in &events {
            order.apply(e);
        }
        Ok(())
    }

    #[test]
    fn place_emits_placed_with_totals() {
        let id = OrderId::new();
        let order = Order::empty(id);
        let events = order.handle(&OrderCommand::Place(place_cmd(id))).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            OrderEvent::Placed(e) => {
                assert_eq!(e.order_id, id);
                assert_eq!(e.totals.subtotal, 2400);
                assert_eq!(e.totals.total, 2400);
            }
            other => panic!("expected Placed, got {other:?}"),
        }
    }

    #[test]
    fn placed_order_starts_pending() {
        let order = placed_order();
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.version(), 1);
        assert!(order.snapshot().is_some());
    }

    #[test]
    fn cannot_place_twice() {
        let order = placed_order();
        let err = order
            .handle(&OrderCommand::Place(place_cmd(order.id_typed())))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn full_lifecycle_pending_to_archived_and_back() {
        let mut order = placed_order();
        run(&mut order, TransitionKind::MarkInProgress).unwrap();
        assert_eq!(order.status(), OrderStatus::InProgress);
        run(&mut order, TransitionKind::Complete).unwrap();
        assert_eq!(order.status(), OrderStatus::Completed);
        run(&mut order, TransitionKind::Archive).unwrap();
        assert_eq!(order.status(), OrderStatus::Archived);
        run(&mut order, TransitionKind::Unarchive).unwrap();
        assert_eq!(order.status(), OrderStatus::Completed);
        assert_eq!(order.version(), 5);
    }

    #[test]
    fn completed_order_cannot_be_cancelled() {
        let mut order = placed_order();
        run(&mut order, TransitionKind::Complete).unwrap();
        let version = order.version();

        let err = run(&mut order, TransitionKind::Cancel).unwrap_err();
        match err {
            DomainError::InvalidTransition { from, action, .. } => {
                assert_eq!(from, "completed");
                assert_eq!(action, "cancel");
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
        assert_eq!(order.status(), OrderStatus::Completed);
        assert_eq!(order.version(), version);
    }

    #[test]
    fn stock_effects_follow_status() {
        let mut order = placed_order();
        assert_eq!(order.stock_effect(TransitionKind::Complete), StockEffect::ConfirmSale);
        assert_eq!(order.stock_effect(TransitionKind::Cancel), StockEffect::Release);
        assert_eq!(order.stock_effect(TransitionKind::Delete), StockEffect::Release);
        assert_eq!(order.stock_effect(TransitionKind::MarkInProgress), StockEffect::None);

        run(&mut order, TransitionKind::Cancel).unwrap();
        assert_eq!(order.stock_effect(TransitionKind::Delete), StockEffect::None);
    }

    #[test]
    fn deleted_orders_only_accept_restore() {
        let mut order = placed_order();
        run(&mut order, TransitionKind::Delete).unwrap();
        assert!(order.is_deleted());
        assert_eq!(order.stock_effect(TransitionKind::Restore), StockEffect::Reserve);

        assert!(matches!(
            run(&mut order, TransitionKind::Complete),
            Err(DomainError::NotFound(_))
        ));
        run(&mut order, TransitionKind::Restore).unwrap();
        assert!(!order.is_deleted());
        assert_eq!(order.status(), OrderStatus::Pending);

        assert!(matches!(
            run(&mut order, TransitionKind::Restore),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let order = placed_order();
        let before = order.clone();
        let cmd = OrderCommand::Transition(OrderTransition {
            kind: TransitionKind::Complete,
            occurred_at: test_time(),
        });
        let e1 = order.handle(&cmd).unwrap();
        let e2 = order.handle(&cmd).unwrap();
        assert_eq!(order, before);
        assert_eq!(e1, e2);
    }

    #[test]
    fn snapshot_round_trips_through_from() {
        let order = placed_order();
        let snap = order.snapshot().unwrap();
        assert_eq!(Order::from(snap), order);
    }

    fn kind_strategy() -> impl Strategy<Value = TransitionKind> {
        prop_oneof![
            Just(TransitionKind::MarkInProgress),
            Just(TransitionKind::Complete),
            Just(TransitionKind::Cancel),
            Just(TransitionKind::Archive),
            Just(TransitionKind::Unarchive),
            Just(TransitionKind::Delete),
            Just(TransitionKind::Restore),
        ]
    }

    proptest! {
        #[test]
        fn terminal_statuses_are_never_left_for_active_ones(kinds in prop::collection::vec(kind_strategy(), 0..30)) {
            let mut order = placed_order();
            let mut left_active = false;
            for kind in kinds {
                let before = order.status();
                let _ = run(&mut order, kind);
                if !before.holds_reservation() && order.status().holds_reservation() {
                    left_active = true;
                }
            }
            prop_assert!(!left_active);
        }
    }
}
