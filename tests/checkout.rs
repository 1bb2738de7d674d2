//! Order Engine behavior against a real database: validation order,
//! pricing, atomicity, snapshot isolation, and the oversell race.

mod common;

use std::time::Duration;

use common::*;
use voltshop::checkout;
use voltshop::config::ShippingPolicy;
use voltshop::domain::CartLine;
use voltshop::store::orders;
use voltshop::Error;

fn line(product_id: i64, quantity: i64) -> CartLine {
    CartLine {
        product_id,
        quantity,
    }
}

#[tokio::test]
async fn order_above_threshold_ships_free_and_consumes_stock() {
    let db = test_db().await;
    let cat = insert_category(&db.pool, "Laptops").await;
    let product = insert_product(&db.pool, "VS-LT-1", "Featherbook 14", 10_000, 2, cat).await;

    let order = checkout::create_order(
        &db.pool,
        &ShippingPolicy::default(),
        "user-1",
        shipping(),
        &[line(product, 2)],
    )
    .await
    .unwrap();

    assert_eq!(order.subtotal.cents(), 20_000);
    assert!(order.shipping.is_zero());
    assert_eq!(order.total.cents(), 20_000);
    assert_eq!(order.status, "Pending");
    assert_eq!(order.items.len(), 1);
    assert_eq!(stock_of(&db.pool, product).await, 0);

    // The shelf is now empty; the next buyer is turned away.
    let err = checkout::create_order(
        &db.pool,
        &ShippingPolicy::default(),
        "user-2",
        shipping(),
        &[line(product, 1)],
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        Error::InsufficientStock {
            requested: 1,
            available: 0,
            ..
        }
    ));
}

#[tokio::test]
async fn order_below_threshold_pays_flat_fee() {
    let db = test_db().await;
    let cat = insert_category(&db.pool, "Headphones").await;
    let product = insert_product(&db.pool, "VS-HP-1", "Drift ANC", 3_000, 10, cat).await;

    let order = checkout::create_order(
        &db.pool,
        &ShippingPolicy::default(),
        "user-1",
        shipping(),
        &[line(product, 3)],
    )
    .await
    .unwrap();

    assert_eq!(order.subtotal.cents(), 9_000);
    assert_eq!(order.shipping.cents(), 500);
    assert_eq!(order.total.cents(), 9_500);
    assert_eq!(stock_of(&db.pool, product).await, 7);

    let item = &order.items[0];
    assert_eq!(item.product_sku, "VS-HP-1");
    assert_eq!(item.unit_price.cents(), 3_000);
    assert_eq!(item.line_total.cents(), 9_000);
}

#[tokio::test]
async fn empty_cart_is_rejected() {
    let db = test_db().await;
    let err = checkout::create_order(
        &db.pool,
        &ShippingPolicy::default(),
        "user-1",
        shipping(),
        &[],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::EmptyCart));
}

#[tokio::test]
async fn unknown_products_are_named() {
    let db = test_db().await;
    let cat = insert_category(&db.pool, "Gaming").await;
    let product = insert_product(&db.pool, "VS-GM-1", "Arc Controller", 5_900, 5, cat).await;

    let err = checkout::create_order(
        &db.pool,
        &ShippingPolicy::default(),
        "user-1",
        shipping(),
        &[line(product, 1), line(99, 1), line(98, 1)],
    )
    .await
    .unwrap_err();
    match err {
        Error::ProductNotFound { ids } => assert_eq!(ids, vec![98, 99]),
        other => panic!("expected ProductNotFound, got {other:?}"),
    }
    assert_eq!(stock_of(&db.pool, product).await, 5);
}

#[tokio::test]
async fn zero_quantity_is_rejected() {
    let db = test_db().await;
    let cat = insert_category(&db.pool, "Gaming").await;
    let product = insert_product(&db.pool, "VS-GM-1", "Arc Controller", 5_900, 5, cat).await;

    let err = checkout::create_order(
        &db.pool,
        &ShippingPolicy::default(),
        "user-1",
        shipping(),
        &[line(product, 0)],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::InvalidQuantity { product_id } if product_id == product));
}

#[tokio::test]
async fn rejected_order_leaves_no_trace() {
    let db = test_db().await;
    let cat = insert_category(&db.pool, "TV & Audio").await;
    let product = insert_product(&db.pool, "VS-TV-1", "Vista 55", 64_900, 2, cat).await;

    let err = checkout::create_order(
        &db.pool,
        &ShippingPolicy::default(),
        "user-1",
        shipping(),
        &[line(product, 5)],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::InsufficientStock { .. }));

    assert_eq!(stock_of(&db.pool, product).await, 2);
    assert_eq!(order_count(&db.pool).await, 0);
    assert_eq!(item_count(&db.pool).await, 0);
}

#[tokio::test]
async fn duplicate_lines_cannot_oversell_combined() {
    let db = test_db().await;
    let cat = insert_category(&db.pool, "Smart Home").await;
    let product = insert_product(&db.pool, "VS-SH-1", "Nest Node", 4_900, 3, cat).await;

    // Each line passes the per-line stock check; their sum does not.
    let err = checkout::create_order(
        &db.pool,
        &ShippingPolicy::default(),
        "user-1",
        shipping(),
        &[line(product, 2), line(product, 2)],
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        Error::InsufficientStock {
            requested: 4,
            available: 3,
            ..
        }
    ));
    assert_eq!(stock_of(&db.pool, product).await, 3);
    assert_eq!(order_count(&db.pool).await, 0);
}

#[tokio::test]
async fn snapshots_survive_product_mutation_and_deletion() {
    let db = test_db().await;
    let cat = insert_category(&db.pool, "Smartphones").await;
    let product = insert_product(&db.pool, "VS-SM-1", "Volt One X", 69_900, 5, cat).await;

    checkout::create_order(
        &db.pool,
        &ShippingPolicy::default(),
        "user-1",
        shipping(),
        &[line(product, 1)],
    )
    .await
    .unwrap();

    sqlx::query("UPDATE products SET name = 'Renamed', sku = 'VS-XX-9', price_cents = 1 WHERE id = ?")
        .bind(product)
        .execute(&db.pool)
        .await
        .unwrap();
    sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(product)
        .execute(&db.pool)
        .await
        .unwrap();

    let mine = orders::list_for_user(&db.pool, "user-1").await.unwrap();
    let item = &mine[0].items[0];
    assert_eq!(item.product_name, "Volt One X");
    assert_eq!(item.product_sku, "VS-SM-1");
    assert_eq!(item.unit_price.cents(), 69_900);
    assert_eq!(item.line_total.cents(), 69_900);
}

#[tokio::test]
async fn owned_orders_come_newest_first() {
    let db = test_db().await;
    let cat = insert_category(&db.pool, "Gaming").await;
    let product = insert_product(&db.pool, "VS-GM-1", "Arc Controller", 5_900, 10, cat).await;

    let policy = ShippingPolicy::default();
    let first = checkout::create_order(&db.pool, &policy, "user-1", shipping(), &[line(product, 1)])
        .await
        .unwrap();
    let second =
        checkout::create_order(&db.pool, &policy, "user-1", shipping(), &[line(product, 2)])
            .await
            .unwrap();
    checkout::create_order(&db.pool, &policy, "user-2", shipping(), &[line(product, 1)])
        .await
        .unwrap();

    let mine = orders::list_for_user(&db.pool, "user-1").await.unwrap();
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0].id, second.id);
    assert_eq!(mine[1].id, first.id);

    let all = orders::list_all(&db.pool, 50, 0).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn status_update_touches_nothing_else() {
    let db = test_db().await;
    let cat = insert_category(&db.pool, "Laptops").await;
    let product = insert_product(&db.pool, "VS-LT-1", "Forge 16", 149_900, 5, cat).await;

    let order = checkout::create_order(
        &db.pool,
        &ShippingPolicy::default(),
        "user-1",
        shipping(),
        &[line(product, 1)],
    )
    .await
    .unwrap();

    orders::set_status(&db.pool, order.id, "  Shipped  ")
        .await
        .unwrap();
    let reloaded = orders::get(&db.pool, order.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, "Shipped");
    assert_eq!(reloaded.total.cents(), order.total.cents());
    assert_eq!(reloaded.items.len(), 1);

    let err = orders::set_status(&db.pool, order.id, "   ").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    let err = orders::set_status(&db.pool, 4040, "Shipped").await.unwrap_err();
    assert!(matches!(err, Error::OrderNotFound { order_id: 4040 }));

    // A missing order wins over a bad payload.
    let err = orders::set_status(&db.pool, 4040, "   ").await.unwrap_err();
    assert!(matches!(err, Error::OrderNotFound { order_id: 4040 }));
}

#[tokio::test]
async fn status_update_under_write_lock_is_retryable() {
    let db = test_db().await;
    let cat = insert_category(&db.pool, "Laptops").await;
    let product = insert_product(&db.pool, "VS-LT-1", "Forge 16", 149_900, 5, cat).await;
    let order = checkout::create_order(
        &db.pool,
        &ShippingPolicy::default(),
        "user-1",
        shipping(),
        &[line(product, 1)],
    )
    .await
    .unwrap();

    // Hold the database write lock from one connection while a pool with a
    // short lock wait tries to update.
    let mut holder = db.pool.acquire().await.unwrap();
    sqlx::query("BEGIN IMMEDIATE")
        .execute(&mut *holder)
        .await
        .unwrap();

    let impatient = db.pool_with_busy_timeout(Duration::from_millis(50)).await;
    let err = orders::set_status(&impatient, order.id, "Shipped")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict));

    sqlx::query("ROLLBACK").execute(&mut *holder).await.unwrap();
    drop(holder);
    orders::set_status(&db.pool, order.id, "Shipped")
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_buyers_never_oversell() {
    let db = test_db().await;
    let cat = insert_category(&db.pool, "Headphones").await;
    let product = insert_product(&db.pool, "VS-HP-1", "Drift ANC", 19_900, 5, cat).await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let pool = db.pool.clone();
        handles.push(tokio::spawn(async move {
            // Conflict means another buyer committed first; retry like a
            // client would until the answer is a win or a sold-out.
            loop {
                match checkout::create_order(
                    &pool,
                    &ShippingPolicy::default(),
                    &format!("user-{i}"),
                    shipping(),
                    &[line(product, 1)],
                )
                .await
                {
                    Err(Error::Conflict) => tokio::task::yield_now().await,
                    outcome => break outcome,
                }
            }
        }));
    }

    let mut won = 0;
    let mut turned_away = 0;
    for result in futures::future::join_all(handles).await {
        match result.unwrap() {
            Ok(_) => won += 1,
            Err(Error::InsufficientStock { .. }) => turned_away += 1,
            Err(other) => panic!("unexpected checkout failure: {other:?}"),
        }
    }

    assert_eq!(won, 5);
    assert_eq!(turned_away, 3);
    assert_eq!(stock_of(&db.pool, product).await, 0);
    assert_eq!(order_count(&db.pool).await, 5);
}

#[tokio::test]
async fn abandoned_transaction_does_not_poison_the_pool() {
    let db = test_db().await;
    let cat = insert_category(&db.pool, "Laptops").await;
    let product = insert_product(&db.pool, "VS-LT-1", "Featherbook 14", 10_000, 5, cat).await;

    // A write transaction dropped mid-flight must roll back instead of
    // riding its connection back into the pool with the lock still held.
    {
        let mut tx = db.pool.begin().await.unwrap();
        sqlx::query("UPDATE products SET stock = stock - 1 WHERE id = ?")
            .bind(product)
            .execute(&mut *tx)
            .await
            .unwrap();
    }

    assert_eq!(stock_of(&db.pool, product).await, 5);
    let order = checkout::create_order(
        &db.pool,
        &ShippingPolicy::default(),
        "user-1",
        shipping(),
        &[line(product, 1)],
    )
    .await
    .unwrap();
    assert_eq!(order.total.cents(), 10_500);
    assert_eq!(stock_of(&db.pool, product).await, 4);
    assert_eq!(order_count(&db.pool).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelled_checkout_leaves_no_partial_state() {
    let db = test_db().await;
    let cat = insert_category(&db.pool, "Smartphones").await;
    let product = insert_product(&db.pool, "VS-SM-1", "Volt One X", 69_900, 3, cat).await;

    // Abort a checkout at whatever await point it has reached, the way a
    // client disconnect aborts the handler.
    let pool = db.pool.clone();
    let handle = tokio::spawn(async move {
        checkout::create_order(
            &pool,
            &ShippingPolicy::default(),
            "user-1",
            shipping(),
            &[line(product, 1)],
        )
        .await
    });
    tokio::task::yield_now().await;
    handle.abort();
    let _ = handle.await;

    // Either the order landed whole or not at all; stock and orders agree.
    let placed = order_count(&db.pool).await;
    assert!(placed <= 1);
    assert_eq!(stock_of(&db.pool, product).await, 3 - placed);
    assert_eq!(item_count(&db.pool).await, placed);

    // And the pool serves the next buyer without waiting out a stale lock.
    checkout::create_order(
        &db.pool,
        &ShippingPolicy::default(),
        "user-2",
        shipping(),
        &[line(product, 1)],
    )
    .await
    .unwrap();
    assert_eq!(stock_of(&db.pool, product).await, 2 - placed);
    assert_eq!(order_count(&db.pool).await, placed + 1);
}
