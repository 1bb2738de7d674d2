//! Order endpoints: checkout, history, and admin status updates.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::checkout;
use crate::domain::{CartLine, Order, ShippingDetails};
use crate::error::{Error, Result};
use crate::store::orders;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub shipping_name: String,
    pub shipping_phone: String,
    pub shipping_address_line1: String,
    pub shipping_address_line2: Option<String>,
    pub shipping_city: String,
    pub shipping_country: String,
    pub notes: Option<String>,
    pub items: Vec<CartLine>,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    // Cart emptiness is the first rule checked, before shipping fields.
    if req.items.is_empty() {
        return Err(Error::EmptyCart);
    }
    let shipping = ShippingDetails::parse(
        &req.shipping_name,
        &req.shipping_phone,
        &req.shipping_address_line1,
        req.shipping_address_line2.as_deref(),
        &req.shipping_city,
        &req.shipping_country,
        req.notes.as_deref(),
    )?;
    let order =
        checkout::create_order(&state.db, &state.shipping, &user.id, shipping, &req.items).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn mine(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Vec<Order>>> {
    Ok(Json(orders::list_for_user(&state.db, &user.id).await?))
}

pub async fn list_all(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(page): Query<PageParams>,
) -> Result<Json<Vec<Order>>> {
    user.require_admin()?;
    let per_page = i64::from(page.per_page.unwrap_or(50).clamp(1, 200));
    let page = i64::from(page.page.unwrap_or(1).max(1));
    let offset = (page - 1) * per_page;
    Ok(Json(orders::list_all(&state.db, per_page, offset).await?))
}

pub async fn set_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<StatusCode> {
    user.require_admin()?;
    orders::set_status(&state.db, id, &req.status).await?;
    Ok(StatusCode::NO_CONTENT)
}
