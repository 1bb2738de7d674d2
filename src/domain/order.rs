//! Order entities and checkout input shapes.
//!
//! An order is immutable once written except for `status`. Items carry a
//! frozen copy of the product name, SKU and unit price taken at purchase
//! time, so later catalog changes never rewrite history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Money;
use crate::error::{Error, Result};

#[derive(Clone, Debug, Serialize)]
pub struct Order {
    pub id: i64,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub subtotal: Money,
    pub shipping: Money,
    pub total: Money,
    pub status: String,
    pub shipping_name: String,
    pub shipping_phone: String,
    pub shipping_address_line1: String,
    pub shipping_address_line2: Option<String>,
    pub shipping_city: String,
    pub shipping_country: String,
    pub notes: Option<String>,
    pub items: Vec<OrderItem>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderItem {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
    pub product_name: String,
    pub product_sku: String,
}

/// One requested cart line: a product and how many units of it.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct CartLine {
    pub product_id: i64,
    pub quantity: i64,
}

/// Trimmed, validated shipping fields for a new order.
#[derive(Clone, Debug)]
pub struct ShippingDetails {
    pub name: String,
    pub phone: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub country: String,
    pub notes: Option<String>,
}

impl ShippingDetails {
    #[allow(clippy::too_many_arguments)]
    pub fn parse(
        name: &str,
        phone: &str,
        address_line1: &str,
        address_line2: Option<&str>,
        city: &str,
        country: &str,
        notes: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            name: required("shipping name", name)?,
            phone: required("shipping phone", phone)?,
            address_line1: required("shipping address", address_line1)?,
            address_line2: optional(address_line2),
            city: required("shipping city", city)?,
            country: required("shipping country", country)?,
            notes: optional(notes),
        })
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
