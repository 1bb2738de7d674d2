//! Catalog entities: products and categories.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Money, Sku};
use crate::error::{Error, Result};

#[derive(Clone, Debug, Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Product {
    pub id: i64,
    pub sku: Sku,
    pub name: String,
    pub brand: Option<String>,
    pub price: Money,
    pub stock: i64,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub category_id: i64,
    pub category_name: String,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
}

/// Validated, trimmed input for creating or updating a product.
#[derive(Clone, Debug)]
pub struct ProductDraft {
    pub sku: Sku,
    pub name: String,
    pub brand: Option<String>,
    pub price: Money,
    pub stock: i64,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub category_id: i64,
    pub is_featured: bool,
}

impl ProductDraft {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sku: &str,
        name: &str,
        brand: Option<&str>,
        price: Money,
        stock: i64,
        image_url: Option<&str>,
        description: Option<&str>,
        category_id: i64,
        is_featured: bool,
    ) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("product name is required".into()));
        }
        if price < Money::ZERO {
            return Err(Error::Validation("price must not be negative".into()));
        }
        if stock < 0 {
            return Err(Error::Validation("stock must not be negative".into()));
        }
        Ok(Self {
            sku: Sku::parse(sku)?,
            name: name.to_string(),
            brand: trimmed(brand),
            price,
            stock,
            image_url: trimmed(image_url),
            description: trimmed(description),
            category_id,
            is_featured,
        })
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, price_cents: i64, stock: i64) -> Result<ProductDraft> {
        ProductDraft::new(
            "EPO-TT-001",
            name,
            Some("  Pulse "),
            Money::from_cents(price_cents),
            stock,
            None,
            Some("   "),
            1,
            false,
        )
    }

    #[test]
    fn draft_trims_fields() {
        let d = draft("  Widget  ", 1_999, 5).unwrap();
        assert_eq!(d.name, "Widget");
        assert_eq!(d.brand.as_deref(), Some("Pulse"));
        assert!(d.description.is_none()); // whitespace-only collapses to None
    }

    #[test]
    fn draft_rejects_bad_input() {
        assert!(draft("   ", 1_999, 5).is_err());
        assert!(draft("Widget", -1, 5).is_err());
        assert!(draft("Widget", 1_999, -5).is_err());
    }
}
