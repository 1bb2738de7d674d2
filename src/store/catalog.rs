//! Catalog reads and admin CRUD.
//!
//! Category deletion is refused while any product references the category;
//! SKU and category-name uniqueness are case-insensitive (NOCASE columns).

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::domain::{Category, Money, Product, ProductDraft, Sku};
use crate::error::{Error, Result};
use crate::store::unique_violation;

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    sku: String,
    name: String,
    brand: Option<String>,
    price_cents: i64,
    stock: i64,
    image_url: Option<String>,
    description: Option<String>,
    category_id: i64,
    category_name: String,
    is_featured: bool,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            sku: Sku::from_trusted(row.sku),
            name: row.name,
            brand: row.brand,
            price: Money::from_cents(row.price_cents),
            stock: row.stock,
            image_url: row.image_url,
            description: row.description,
            category_id: row.category_id,
            category_name: row.category_name,
            is_featured: row.is_featured,
            created_at: row.created_at,
        }
    }
}

const PRODUCT_SELECT: &str = "SELECT p.id, p.sku, p.name, p.brand, p.price_cents, p.stock, \
     p.image_url, p.description, p.category_id, c.name AS category_name, \
     p.is_featured, p.created_at \
     FROM products p JOIN categories c ON c.id = p.category_id";

#[derive(Debug, Default)]
pub struct ProductFilter {
    pub category_id: Option<i64>,
    pub q: Option<String>,
    pub featured: Option<bool>,
}

pub async fn list_products(db: &SqlitePool, filter: &ProductFilter) -> Result<Vec<Product>> {
    let mut qb = QueryBuilder::<Sqlite>::new(PRODUCT_SELECT);
    qb.push(" WHERE 1 = 1");
    if let Some(category_id) = filter.category_id {
        qb.push(" AND p.category_id = ").push_bind(category_id);
    }
    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let term = format!("%{}%", q.to_lowercase());
        qb.push(" AND (lower(p.name) LIKE ").push_bind(term.clone());
        qb.push(" OR lower(coalesce(p.brand, '')) LIKE ")
            .push_bind(term.clone());
        qb.push(" OR lower(p.sku) LIKE ").push_bind(term);
        qb.push(")");
    }
    if let Some(featured) = filter.featured {
        qb.push(" AND p.is_featured = ").push_bind(featured);
    }
    qb.push(" ORDER BY p.is_featured DESC, p.name");

    let rows: Vec<ProductRow> = qb
        .build_query_as()
        .fetch_all(db)
        .await
        .map_err(Error::from_sqlx)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn get_product(db: &SqlitePool, id: i64) -> Result<Option<Product>> {
    let row: Option<ProductRow> =
        sqlx::query_as(&format!("{PRODUCT_SELECT} WHERE p.id = ?"))
            .bind(id)
            .fetch_optional(db)
            .await
            .map_err(Error::from_sqlx)?;
    Ok(row.map(Into::into))
}

pub async fn create_product(db: &SqlitePool, draft: &ProductDraft) -> Result<Product> {
    ensure_category_exists(db, draft.category_id).await?;
    ensure_sku_free(db, draft.sku.as_str(), None).await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO products (sku, name, brand, price_cents, stock, image_url, description, \
         category_id, is_featured, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(draft.sku.as_str())
    .bind(&draft.name)
    .bind(&draft.brand)
    .bind(draft.price.cents())
    .bind(draft.stock)
    .bind(&draft.image_url)
    .bind(&draft.description)
    .bind(draft.category_id)
    .bind(draft.is_featured)
    .bind(Utc::now())
    .fetch_one(db)
    .await
    .map_err(|e| {
        if unique_violation(&e) {
            Error::DuplicateSku
        } else {
            Error::from_sqlx(e)
        }
    })?;

    get_product(db, id)
        .await?
        .ok_or_else(|| Error::Internal("created product vanished".into()))
}

pub async fn update_product(db: &SqlitePool, id: i64, draft: &ProductDraft) -> Result<Product> {
    ensure_category_exists(db, draft.category_id).await?;
    ensure_sku_free(db, draft.sku.as_str(), Some(id)).await?;

    let result = sqlx::query(
        "UPDATE products SET sku = ?, name = ?, brand = ?, price_cents = ?, stock = ?, \
         image_url = ?, description = ?, category_id = ?, is_featured = ? WHERE id = ?",
    )
    .bind(draft.sku.as_str())
    .bind(&draft.name)
    .bind(&draft.brand)
    .bind(draft.price.cents())
    .bind(draft.stock)
    .bind(&draft.image_url)
    .bind(&draft.description)
    .bind(draft.category_id)
    .bind(draft.is_featured)
    .bind(id)
    .execute(db)
    .await
    .map_err(|e| {
        if unique_violation(&e) {
            Error::DuplicateSku
        } else {
            Error::from_sqlx(e)
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(Error::ProductNotFound { ids: vec![id] });
    }
    get_product(db, id)
        .await?
        .ok_or(Error::ProductNotFound { ids: vec![id] })
}

pub async fn delete_product(db: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(id)
        .execute(db)
        .await
        .map_err(Error::from_sqlx)?;
    if result.rows_affected() == 0 {
        return Err(Error::ProductNotFound { ids: vec![id] });
    }
    Ok(())
}

pub async fn list_categories(db: &SqlitePool) -> Result<Vec<Category>> {
    let rows: Vec<(i64, String)> =
        sqlx::query_as("SELECT id, name FROM categories ORDER BY name")
            .fetch_all(db)
            .await
            .map_err(Error::from_sqlx)?;
    Ok(rows
        .into_iter()
        .map(|(id, name)| Category { id, name })
        .collect())
}

pub async fn create_category(db: &SqlitePool, name: &str) -> Result<Category> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("category name is required".into()));
    }
    let id: i64 = sqlx::query_scalar("INSERT INTO categories (name) VALUES (?) RETURNING id")
        .bind(name)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if unique_violation(&e) {
                Error::DuplicateCategory
            } else {
                Error::from_sqlx(e)
            }
        })?;
    Ok(Category {
        id,
        name: name.to_string(),
    })
}

pub async fn delete_category(db: &SqlitePool, id: i64) -> Result<()> {
    let in_use: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE category_id = ?)")
            .bind(id)
            .fetch_one(db)
            .await
            .map_err(Error::from_sqlx)?;
    if in_use {
        return Err(Error::CategoryInUse);
    }
    let result = sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(db)
        .await
        .map_err(Error::from_sqlx)?;
    if result.rows_affected() == 0 {
        return Err(Error::CategoryNotFound);
    }
    Ok(())
}

async fn ensure_category_exists(db: &SqlitePool, id: i64) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?)")
        .bind(id)
        .fetch_one(db)
        .await
        .map_err(Error::from_sqlx)?;
    if exists {
        Ok(())
    } else {
        Err(Error::UnknownCategory)
    }
}

async fn ensure_sku_free(db: &SqlitePool, sku: &str, except: Option<i64>) -> Result<()> {
    let taken: bool = match except {
        Some(id) => {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE sku = ? AND id != ?)")
                .bind(sku)
                .bind(id)
                .fetch_one(db)
                .await
                .map_err(Error::from_sqlx)?
        }
        None => {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE sku = ?)")
                .bind(sku)
                .fetch_one(db)
                .await
                .map_err(Error::from_sqlx)?
        }
    };
    if taken {
        Err(Error::DuplicateSku)
    } else {
        Ok(())
    }
}
