//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects carry no identity and are compared by their attribute values.
/// In this workspace they are the purchase-time snapshots an order keeps
/// (line items, shipping address, customer details): once captured they never
/// change, even if the product or customer record they were copied from does.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
