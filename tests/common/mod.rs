#![allow(dead_code)]

//! Shared fixtures: a throwaway SQLite database per test plus row helpers.

use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tempfile::TempDir;
use voltshop::domain::ShippingDetails;
use voltshop::MIGRATOR;

pub struct TestDb {
    pub pool: SqlitePool,
    path: std::path::PathBuf,
    _dir: TempDir,
}

impl TestDb {
    /// A second pool onto the same database file, with its own lock wait.
    pub async fn pool_with_busy_timeout(&self, timeout: Duration) -> SqlitePool {
        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(timeout)
            .foreign_keys(true);
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .expect("second pool")
    }
}

pub async fn test_db() -> TestDb {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("test.db");
    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
        .expect("connect");
    MIGRATOR.run(&pool).await.expect("migrations");
    TestDb {
        pool,
        path,
        _dir: dir,
    }
}

pub async fn insert_category(pool: &SqlitePool, name: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO categories (name) VALUES (?) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("insert category")
}

pub async fn insert_product(
    pool: &SqlitePool,
    sku: &str,
    name: &str,
    price_cents: i64,
    stock: i64,
    category_id: i64,
) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO products (sku, name, price_cents, stock, category_id, is_featured, created_at) \
         VALUES (?, ?, ?, ?, ?, 0, ?) RETURNING id",
    )
    .bind(sku)
    .bind(name)
    .bind(price_cents)
    .bind(stock)
    .bind(category_id)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .expect("insert product")
}

pub fn shipping() -> ShippingDetails {
    ShippingDetails::parse(
        "Arta Hoxha",
        "+355 69 000 0000",
        "Rruga e Durresit 12",
        None,
        "Tirana",
        "Albania",
        None,
    )
    .expect("valid shipping fixture")
}

pub async fn stock_of(pool: &SqlitePool, product_id: i64) -> i64 {
    sqlx::query_scalar("SELECT stock FROM products WHERE id = ?")
        .bind(product_id)
        .fetch_one(pool)
        .await
        .expect("stock")
}

pub async fn order_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(pool)
        .await
        .expect("order count")
}

pub async fn item_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM order_items")
        .fetch_one(pool)
        .await
        .expect("item count")
}
