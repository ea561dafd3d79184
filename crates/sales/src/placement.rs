//! Order placement input and the purchase-time snapshots an order keeps.

use serde::{Deserialize, Serialize};

use storefront_core::{Actor, DomainError, DomainResult, ProductId, ValueObject};
use storefront_inventory::{LineRequest, Product};

/// Sales channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Online,
    InStore,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Online => "online",
            OrderType::InStore => "in_store",
        }
    }
}

impl core::str::FromStr for OrderType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(OrderType::Online),
            "in_store" => Ok(OrderType::InStore),
            other => Err(DomainError::validation(format!("unknown order type '{other}'"))),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOption {
    Delivery,
    Pickup,
}

impl DeliveryOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOption::Delivery => "delivery",
            DeliveryOption::Pickup => "pickup",
        }
    }
}

impl core::str::FromStr for DeliveryOption {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delivery" => Ok(DeliveryOption::Delivery),
            "pickup" => Ok(DeliveryOption::Pickup),
            other => Err(DomainError::validation(format!("unknown delivery option '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ValueObject for CustomerInfo {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub recipient: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ValueObject for ShippingAddress {}

/// Line item as sold: product details are frozen at placement time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
    pub quantity: i64,
    pub subtotal: u64,
}

impl OrderItem {
    pub fn snapshot(product: &Product, quantity: i64) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        let subtotal = product
            .price
            .checked_mul(quantity as u64)
            .ok_or_else(|| DomainError::validation("line subtotal overflows"))?;
        Ok(Self {
            product_id: product.id,
            product_name: product.name.clone(),
            sku: product.sku.clone(),
            unit_price: product.price,
            quantity,
            subtotal,
        })
    }
}

impl ValueObject for OrderItem {}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: u64,
    pub shipping_cost: u64,
    pub total: u64,
}

impl OrderTotals {
    /// Largest amount any total may reach; amounts are stored as signed 64-bit.
    pub const MAX_AMOUNT: u64 = i64::MAX as u64;

    pub fn compute(items: &[OrderItem], shipping_cost: u64) -> DomainResult<Self> {
        let overflow = || DomainError::validation("order total is too large");
        let subtotal = items
            .iter()
            .try_fold(0u64, |acc, i| acc.checked_add(i.subtotal))
            .ok_or_else(overflow)?;
        let total = subtotal.checked_add(shipping_cost).ok_or_else(overflow)?;
        if total > Self::MAX_AMOUNT {
            return Err(overflow());
        }

        Ok(Self {
            subtotal,
            shipping_cost,
            total,
        })
    }
}

/// Request to place an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_type: OrderType,
    pub customer: CustomerInfo,
    pub items: Vec<LineRequest>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    pub delivery_option: DeliveryOption,
    #[serde(default)]
    pub shipping_cost: u64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewOrder {
    /// Check who may place this order and that it is complete, then apply the
    /// channel rules: in-store orders are always pickups without a shipping
    /// address, and only delivered orders carry a shipping cost.
    pub fn validated(mut self, actor: &Actor) -> DomainResult<Self> {
        if self.items.is_empty() {
            return Err(DomainError::validation("an order needs at least one item"));
        }
        if self.customer.name.trim().is_empty() {
            return Err(DomainError::validation("customer name is required"));
        }
        if self.shipping_cost > OrderTotals::MAX_AMOUNT {
            return Err(DomainError::validation("shipping cost is too large"));
        }

        match self.order_type {
            OrderType::InStore => {
                actor.ensure_elevated()?;
                self.delivery_option = DeliveryOption::Pickup;
                self.shipping_address = None;
            }
            OrderType::Online => {
                if self.delivery_option == DeliveryOption::Delivery && self.shipping_address.is_none() {
                    return Err(DomainError::validation(
                        "a shipping address is required for delivery",
                    ));
                }
            }
        }

        if self.delivery_option == DeliveryOption::Pickup {
            self.shipping_cost = 0;
            self.shipping_address = None;
        }

        Ok(self)
    }
}
