//! Order reads and the status update. Order creation lives in [`crate::checkout`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::domain::{Money, Order, OrderItem};
use crate::error::{Error, Result};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    user_id: String,
    created_at: DateTime<Utc>,
    subtotal_cents: i64,
    shipping_cents: i64,
    total_cents: i64,
    status: String,
    shipping_name: String,
    shipping_phone: String,
    shipping_address_line1: String,
    shipping_address_line2: Option<String>,
    shipping_city: String,
    shipping_country: String,
    notes: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    order_id: i64,
    product_id: i64,
    quantity: i64,
    unit_price_cents: i64,
    line_total_cents: i64,
    product_name: String,
    product_sku: String,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price: Money::from_cents(row.unit_price_cents),
            line_total: Money::from_cents(row.line_total_cents),
            product_name: row.product_name,
            product_sku: row.product_sku,
        }
    }
}

const ORDER_SELECT: &str = "SELECT id, user_id, created_at, subtotal_cents, shipping_cents, \
     total_cents, status, shipping_name, shipping_phone, shipping_address_line1, \
     shipping_address_line2, shipping_city, shipping_country, notes FROM orders";

/// All orders owned by `user_id`, newest first, items included.
pub async fn list_for_user(db: &SqlitePool, user_id: &str) -> Result<Vec<Order>> {
    let rows: Vec<OrderRow> = sqlx::query_as(&format!(
        "{ORDER_SELECT} WHERE user_id = ? ORDER BY created_at DESC, id DESC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
    .map_err(Error::from_sqlx)?;
    assemble(db, rows).await
}

/// All orders in the system, newest first. Admin capability is enforced by
/// the caller.
pub async fn list_all(db: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<Order>> {
    let rows: Vec<OrderRow> = sqlx::query_as(&format!(
        "{ORDER_SELECT} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .map_err(Error::from_sqlx)?;
    assemble(db, rows).await
}

pub async fn get(db: &SqlitePool, order_id: i64) -> Result<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as(&format!("{ORDER_SELECT} WHERE id = ?"))
        .bind(order_id)
        .fetch_optional(db)
        .await
        .map_err(Error::from_sqlx)?;
    match row {
        Some(row) => Ok(assemble(db, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

/// Overwrites `status` only; totals and items are never recomputed.
/// Existence is checked before the payload, so a missing order is a
/// not-found even when the status is blank.
pub async fn set_status(db: &SqlitePool, order_id: i64, status: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE id = ?)")
        .bind(order_id)
        .fetch_one(db)
        .await
        .map_err(Error::from_sqlx)?;
    if !exists {
        return Err(Error::OrderNotFound { order_id });
    }
    let status = status.trim();
    if status.is_empty() {
        return Err(Error::Validation("status is required".into()));
    }
    let result = sqlx::query("UPDATE orders SET status = ? WHERE id = ?")
        .bind(status)
        .bind(order_id)
        .execute(db)
        .await
        .map_err(Error::from_sqlx)?;
    if result.rows_affected() == 0 {
        return Err(Error::OrderNotFound { order_id });
    }
    Ok(())
}

async fn assemble(db: &SqlitePool, rows: Vec<OrderRow>) -> Result<Vec<Order>> {
    if rows.is_empty() {
        return Ok(vec![]);
    }

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT order_id, product_id, quantity, unit_price_cents, line_total_cents, \
         product_name, product_sku FROM order_items WHERE order_id IN (",
    );
    let mut ids = qb.separated(", ");
    for row in &rows {
        ids.push_bind(row.id);
    }
    qb.push(") ORDER BY id");

    let item_rows: Vec<OrderItemRow> = qb
        .build_query_as()
        .fetch_all(db)
        .await
        .map_err(Error::from_sqlx)?;
    let mut by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
    for item in item_rows {
        by_order.entry(item.order_id).or_default().push(item.into());
    }

    Ok(rows
        .into_iter()
        .map(|row| Order {
            items: by_order.remove(&row.id).unwrap_or_default(),
            id: row.id,
            user_id: row.user_id,
            created_at: row.created_at,
            subtotal: Money::from_cents(row.subtotal_cents),
            shipping: Money::from_cents(row.shipping_cents),
            total: Money::from_cents(row.total_cents),
            status: row.status,
            shipping_name: row.shipping_name,
            shipping_phone: row.shipping_phone,
            shipping_address_line1: row.shipping_address_line1,
            shipping_address_line2: row.shipping_address_line2,
            shipping_city: row.shipping_city,
            shipping_country: row.shipping_country,
            notes: row.notes,
        })
        .collect())
}
