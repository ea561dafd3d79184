use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, Entity, ProductId};

/// Catalog product as seen by the stock engine.
///
/// `stock` is the real on-hand quantity. It only changes through confirmed
/// sales and explicit adjustments, never through reservations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    /// Price in smallest currency unit (e.g., cents).
    pub price: u64,
    pub stock: i64,
    /// Reorder threshold.
    pub stock_min: i64,
}

impl Product {
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.stock_min
    }

    /// Copy of this product with a new real stock value.
    pub fn with_stock(&self, stock: i64) -> DomainResult<Self> {
        if stock < 0 {
            return Err(DomainError::invariant(format!(
                "stock of {} cannot go negative (attempted {stock})",
                self.name
            )));
        }
        Ok(Self {
            stock,
            ..self.clone()
        })
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for registering a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub price: u64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub stock_min: i64,
}

impl NewProduct {
    pub fn into_product(self, id: ProductId) -> DomainResult<Product> {
        if self.sku.trim().is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.stock < 0 {
            return Err(DomainError::validation("stock cannot be negative"));
        }
        if self.stock_min < 0 {
            return Err(DomainError::validation("stock_min cannot be negative"));
        }
        Ok(Product {
            id,
            sku: self.sku.trim().to_string(),
            name: self.name.trim().to_string(),
            price: self.price,
            stock: self.stock,
            stock_min: self.stock_min,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_product(stock: i64) -> NewProduct {
        NewProduct {
            sku: " MUG-01 ".to_string(),
            name: "Mug".to_string(),
            price: 1200,
            stock,
            stock_min: 3,
        }
    }

    #[test]
    fn into_product_trims_and_keeps_values() {
        let id = ProductId::new();
        let p = new_product(10).into_product(id).unwrap();
        assert_eq!(p.id, id);
        assert_eq!(p.sku, "MUG-01");
        assert_eq!(p.stock, 10);
        assert!(!p.is_low_stock());
    }

    #[test]
    fn negative_initial_stock_is_rejected() {
        let err = new_product(-1).into_product(ProductId::new()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn with_stock_refuses_negative_values() {
        let p = new_product(2).into_product(ProductId::new()).unwrap();
        assert!(p.with_stock(-1).is_err());
        let lower = p.with_stock(3).unwrap();
        assert!(lower.is_low_stock());
    }
}
