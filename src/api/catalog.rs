//! Catalog endpoints: public reads, admin CRUD.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::domain::{Category, Money, Product, ProductDraft};
use crate::error::{Error, Result};
use crate::store::catalog::{self, ProductFilter};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub category_id: Option<i64>,
    pub q: Option<String>,
    pub featured: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ProductUpsertRequest {
    pub sku: String,
    pub name: String,
    pub brand: Option<String>,
    pub price: Decimal,
    pub stock: i64,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub category_id: i64,
    #[serde(default)]
    pub is_featured: bool,
}

impl ProductUpsertRequest {
    fn into_draft(self) -> Result<ProductDraft> {
        ProductDraft::new(
            &self.sku,
            &self.name,
            self.brand.as_deref(),
            Money::new(self.price),
            self.stock,
            self.image_url.as_deref(),
            self.description.as_deref(),
            self.category_id,
            self.is_featured,
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>> {
    let filter = ProductFilter {
        category_id: query.category_id,
        q: query.q,
        featured: query.featured,
    };
    Ok(Json(catalog::list_products(&state.db, &filter).await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Product>> {
    catalog::get_product(&state.db, id)
        .await?
        .map(Json)
        .ok_or(Error::ProductNotFound { ids: vec![id] })
}

pub async fn create_product(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ProductUpsertRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    user.require_admin()?;
    let draft = req.into_draft()?;
    let product = catalog::create_product(&state.db, &draft).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<ProductUpsertRequest>,
) -> Result<Json<Product>> {
    user.require_admin()?;
    let draft = req.into_draft()?;
    Ok(Json(catalog::update_product(&state.db, id, &draft).await?))
}

pub async fn delete_product(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    user.require_admin()?;
    catalog::delete_product(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(catalog::list_categories(&state.db).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    user.require_admin()?;
    let category = catalog::create_category(&state.db, &req.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn delete_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    user.require_admin()?;
    catalog::delete_category(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
