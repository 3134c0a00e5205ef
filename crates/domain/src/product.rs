//! Catalog products.

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Stock keeping unit — the unique, case-normalized catalog identifier.
///
/// Construction trims whitespace and uppercases, so `" ab-101 "` and
/// `"AB-101"` name the same product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sku(String);

impl Sku {
    /// Creates a normalized SKU from raw input.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_uppercase())
    }

    /// Returns the SKU as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the SKU is empty after normalization.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Sku {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Sku {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for Sku {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A catalog product.
///
/// `stock` is a unit count and never goes below zero; the storage layer
/// enforces this with conditional updates rather than post-hoc correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub sku: Sku,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: i64,
}

impl Product {
    /// Creates a product with normalized SKU.
    pub fn new(
        sku: impl AsRef<str>,
        name: impl Into<String>,
        description: impl Into<String>,
        price: Money,
        stock: i64,
    ) -> Self {
        Self {
            sku: Sku::new(sku),
            name: name.into(),
            description: description.into(),
            price,
            stock,
        }
    }
}

/// Partial update applied to a product by administrative maintenance.
///
/// `stock` here is an absolute replacement used for corrections; order flow
/// never goes through it.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<i64>,
}

impl ProductUpdate {
    /// Applies the update to an existing product record.
    pub fn apply(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sku_is_normalized() {
        assert_eq!(Sku::new("  ab-101 ").as_str(), "AB-101");
        assert_eq!(Sku::new("AB-101"), Sku::new("ab-101"));
    }

    #[test]
    fn product_update_applies_only_set_fields() {
        let mut product = Product::new("A-1", "Widget", "", Money::from_cents(1000), 5);
        ProductUpdate {
            price: Some(Money::from_cents(1200)),
            ..Default::default()
        }
        .apply(&mut product);

        assert_eq!(product.price.cents(), 1200);
        assert_eq!(product.name, "Widget");
        assert_eq!(product.stock, 5);
    }
}
