//! Order placement: validate a cart against live stock, price it
//! deterministically, and commit the stock decrements plus the order
//! snapshot as one atomic unit.
//!
//! Concurrency model: each checkout runs in its own transaction, and the
//! decrement re-checks stock at write time (`stock >= ?`), so two buyers
//! racing for the last unit cannot both win no matter what their reads
//! saw. A write conflict between overlapping checkouts surfaces as a
//! retryable [`Error::Conflict`]; either way the transaction rolls back
//! on drop and leaves zero side effects.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::config::ShippingPolicy;
use crate::domain::{CartLine, Money, Order, OrderItem, ShippingDetails};
use crate::error::{Error, Result};

const INITIAL_STATUS: &str = "Pending";

/// Product fields read once per checkout; validation and pricing both use
/// this same snapshot so a request is priced consistently.
#[derive(Debug, sqlx::FromRow)]
struct ProductSnapshot {
    id: i64,
    sku: String,
    name: String,
    price_cents: i64,
    stock: i64,
}

pub async fn create_order(
    db: &SqlitePool,
    policy: &ShippingPolicy,
    user_id: &str,
    shipping: ShippingDetails,
    lines: &[CartLine],
) -> Result<Order> {
    if lines.is_empty() {
        return Err(Error::EmptyCart);
    }

    // An early return or a cancelled request drops the transaction, which
    // rolls it back: no partial decrement, no order row, no items.
    let mut tx = db.begin().await.map_err(Error::from_sqlx)?;
    let order = commit_order(&mut tx, policy, user_id, &shipping, lines).await?;
    tx.commit().await.map_err(Error::from_sqlx)?;

    tracing::info!(
        order_id = order.id,
        user_id,
        total = %order.total,
        "order placed"
    );
    Ok(order)
}

async fn commit_order(
    conn: &mut SqliteConnection,
    policy: &ShippingPolicy,
    user_id: &str,
    shipping: &ShippingDetails,
    lines: &[CartLine],
) -> Result<Order> {
    let snapshots = load_snapshots(conn, lines).await?;

    let missing: Vec<i64> = lines
        .iter()
        .map(|line| line.product_id)
        .filter(|id| !snapshots.contains_key(id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if !missing.is_empty() {
        return Err(Error::ProductNotFound { ids: missing });
    }

    for line in lines {
        if line.quantity <= 0 {
            return Err(Error::InvalidQuantity {
                product_id: line.product_id,
            });
        }
    }

    let mut resolved: Vec<(&ProductSnapshot, i64)> = Vec::with_capacity(lines.len());
    for line in lines {
        let product = snapshots
            .get(&line.product_id)
            .ok_or_else(|| Error::ProductNotFound {
                ids: vec![line.product_id],
            })?;
        if product.stock < line.quantity {
            return Err(Error::InsufficientStock {
                product_id: product.id,
                name: product.name.clone(),
                requested: line.quantity,
                available: product.stock,
            });
        }
        resolved.push((product, line.quantity));
    }

    let pricing = price(policy, &resolved);

    // Decrements aggregate duplicate lines and run in ascending product-id
    // order; the `stock >= ?` guard re-validates at write time.
    let mut wanted: BTreeMap<i64, i64> = BTreeMap::new();
    for line in lines {
        *wanted.entry(line.product_id).or_default() += line.quantity;
    }
    for (&product_id, &quantity) in &wanted {
        let result =
            sqlx::query("UPDATE products SET stock = stock - ? WHERE id = ? AND stock >= ?")
                .bind(quantity)
                .bind(product_id)
                .bind(quantity)
                .execute(&mut *conn)
                .await
                .map_err(Error::from_sqlx)?;
        if result.rows_affected() == 0 {
            let available: i64 = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?")
                .bind(product_id)
                .fetch_optional(&mut *conn)
                .await
                .map_err(Error::from_sqlx)?
                .unwrap_or(0);
            let name = snapshots
                .get(&product_id)
                .map(|p| p.name.clone())
                .unwrap_or_default();
            return Err(Error::InsufficientStock {
                product_id,
                name,
                requested: quantity,
                available,
            });
        }
    }

    let created_at = Utc::now();
    let order_id: i64 = sqlx::query_scalar(
        "INSERT INTO orders (user_id, created_at, subtotal_cents, shipping_cents, total_cents, \
         status, shipping_name, shipping_phone, shipping_address_line1, shipping_address_line2, \
         shipping_city, shipping_country, notes) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(user_id)
    .bind(created_at)
    .bind(pricing.subtotal.cents())
    .bind(pricing.shipping.cents())
    .bind(pricing.total.cents())
    .bind(INITIAL_STATUS)
    .bind(&shipping.name)
    .bind(&shipping.phone)
    .bind(&shipping.address_line1)
    .bind(&shipping.address_line2)
    .bind(&shipping.city)
    .bind(&shipping.country)
    .bind(&shipping.notes)
    .fetch_one(&mut *conn)
    .await
    .map_err(Error::from_sqlx)?;

    for item in &pricing.items {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, quantity, unit_price_cents, \
             line_total_cents, product_name, product_sku) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(order_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price.cents())
        .bind(item.line_total.cents())
        .bind(&item.product_name)
        .bind(&item.product_sku)
        .execute(&mut *conn)
        .await
        .map_err(Error::from_sqlx)?;
    }

    Ok(Order {
        id: order_id,
        user_id: user_id.to_string(),
        created_at,
        subtotal: pricing.subtotal,
        shipping: pricing.shipping,
        total: pricing.total,
        status: INITIAL_STATUS.to_string(),
        shipping_name: shipping.name.clone(),
        shipping_phone: shipping.phone.clone(),
        shipping_address_line1: shipping.address_line1.clone(),
        shipping_address_line2: shipping.address_line2.clone(),
        shipping_city: shipping.city.clone(),
        shipping_country: shipping.country.clone(),
        notes: shipping.notes.clone(),
        items: pricing.items,
    })
}

async fn load_snapshots(
    conn: &mut SqliteConnection,
    lines: &[CartLine],
) -> Result<BTreeMap<i64, ProductSnapshot>> {
    let ids: BTreeSet<i64> = lines.iter().map(|line| line.product_id).collect();
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT id, sku, name, price_cents, stock FROM products WHERE id IN (",
    );
    let mut sep = qb.separated(", ");
    for id in &ids {
        sep.push_bind(*id);
    }
    qb.push(")");

    let rows: Vec<ProductSnapshot> = qb
        .build_query_as()
        .fetch_all(&mut *conn)
        .await
        .map_err(Error::from_sqlx)?;
    Ok(rows.into_iter().map(|row| (row.id, row)).collect())
}

struct Pricing {
    subtotal: Money,
    shipping: Money,
    total: Money,
    items: Vec<OrderItem>,
}

fn price(policy: &ShippingPolicy, resolved: &[(&ProductSnapshot, i64)]) -> Pricing {
    let items: Vec<OrderItem> = resolved
        .iter()
        .map(|(product, quantity)| {
            let unit_price = Money::from_cents(product.price_cents);
            OrderItem {
                product_id: product.id,
                quantity: *quantity,
                unit_price,
                line_total: unit_price.times(*quantity),
                product_name: product.name.clone(),
                product_sku: product.sku.clone(),
            }
        })
        .collect();

    let subtotal: Money = items.iter().map(|item| item.line_total).sum();
    let shipping = if subtotal >= policy.free_threshold {
        Money::ZERO
    } else {
        policy.flat_fee
    };
    Pricing {
        subtotal,
        shipping,
        total: subtotal + shipping,
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: i64, price_cents: i64, stock: i64) -> ProductSnapshot {
        ProductSnapshot {
            id,
            sku: format!("SKU-{id}"),
            name: format!("Product {id}"),
            price_cents,
            stock,
        }
    }

    #[test]
    fn flat_fee_below_threshold() {
        let policy = ShippingPolicy::default();
        let p = snapshot(2, 3_000, 10);
        let pricing = price(&policy, &[(&p, 3)]);
        assert_eq!(pricing.subtotal.cents(), 9_000);
        assert_eq!(pricing.shipping.cents(), 500);
        assert_eq!(pricing.total.cents(), 9_500);
    }

    #[test]
    fn free_shipping_at_threshold() {
        let policy = ShippingPolicy::default();
        let p = snapshot(1, 7_500, 10);
        let pricing = price(&policy, &[(&p, 2)]);
        assert_eq!(pricing.subtotal.cents(), 15_000);
        assert!(pricing.shipping.is_zero());
        assert_eq!(pricing.total.cents(), 15_000);
    }

    #[test]
    fn fee_applies_just_under_threshold() {
        let policy = ShippingPolicy::default();
        let p = snapshot(1, 14_999, 10);
        let pricing = price(&policy, &[(&p, 1)]);
        assert_eq!(pricing.shipping.cents(), 500);
        assert_eq!(pricing.total.cents(), 15_499);
    }

    #[test]
    fn subtotal_sums_line_totals() {
        let policy = ShippingPolicy::default();
        let a = snapshot(1, 10_000, 10);
        let b = snapshot(2, 2_550, 10);
        let pricing = price(&policy, &[(&a, 2), (&b, 3)]);
        let lines: i64 = pricing.items.iter().map(|i| i.line_total.cents()).sum();
        assert_eq!(pricing.subtotal.cents(), lines);
        assert_eq!(pricing.subtotal.cents(), 27_650);
        assert!(pricing.shipping.is_zero());
    }

    #[test]
    fn items_freeze_product_fields() {
        let policy = ShippingPolicy::default();
        let p = snapshot(7, 1_234, 5);
        let pricing = price(&policy, &[(&p, 2)]);
        let item = &pricing.items[0];
        assert_eq!(item.product_name, "Product 7");
        assert_eq!(item.product_sku, "SKU-7");
        assert_eq!(item.unit_price.cents(), 1_234);
        assert_eq!(item.line_total.cents(), 2_468);
    }
}
