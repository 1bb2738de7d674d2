//! VoltShop Storefront Backend
//!
//! Self-hosted electronics storefront API.
//!
//! ## Features
//! - Account registration and login (JWT)
//! - Product catalog with categories
//! - Order placement against live inventory
//! - Order history and admin status updates

use std::sync::Arc;

use sqlx::SqlitePool;

pub mod api;
pub mod auth;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod error;
pub mod seed;
pub mod store;

pub use error::{Error, Result};

use crate::auth::jwt::JwtService;
use crate::config::ShippingPolicy;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub jwt: Arc<JwtService>,
    pub shipping: ShippingPolicy,
}
