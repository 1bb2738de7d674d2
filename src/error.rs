//! Service error type and its HTTP mapping.
//!
//! Validation errors are detected before any mutation; `Conflict` means a
//! concurrent writer got there first and the request is safe to retry.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cart is empty")]
    EmptyCart,

    #[error("products not found: {ids:?}")]
    ProductNotFound { ids: Vec<i64> },

    #[error("invalid quantity for product {product_id}")]
    InvalidQuantity { product_id: i64 },

    #[error("not enough stock for {name}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: i64,
        name: String,
        requested: i64,
        available: i64,
    },

    #[error("order {order_id} not found")]
    OrderNotFound { order_id: i64 },

    #[error("category not found")]
    CategoryNotFound,

    #[error("category already exists")]
    DuplicateCategory,

    #[error("category has products")]
    CategoryInUse,

    #[error("invalid category")]
    UnknownCategory,

    #[error("SKU already exists")]
    DuplicateSku,

    #[error("email already registered")]
    EmailTaken,

    #[error("authentication required")]
    Unauthenticated,

    #[error("admin access required")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("concurrent update detected, retry the request")]
    Conflict,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

impl Error {
    /// Converts a sqlx error, turning lock contention into a retryable
    /// `Conflict` instead of an opaque database failure.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        if is_locked(&err) {
            Error::Conflict
        } else {
            Error::Database(err)
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict)
    }

    fn status(&self) -> StatusCode {
        match self {
            Error::EmptyCart
            | Error::InvalidQuantity { .. }
            | Error::UnknownCategory
            | Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::ProductNotFound { .. }
            | Error::OrderNotFound { .. }
            | Error::CategoryNotFound => StatusCode::NOT_FOUND,
            Error::InsufficientStock { .. }
            | Error::DuplicateCategory
            | Error::CategoryInUse
            | Error::DuplicateSku
            | Error::EmailTaken
            | Error::Conflict => StatusCode::CONFLICT,
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::Internal(_) | Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Error::EmptyCart => "empty_cart",
            Error::ProductNotFound { .. } => "product_not_found",
            Error::InvalidQuantity { .. } => "invalid_quantity",
            Error::InsufficientStock { .. } => "insufficient_stock",
            Error::OrderNotFound { .. } => "order_not_found",
            Error::CategoryNotFound => "category_not_found",
            Error::DuplicateCategory => "duplicate_category",
            Error::CategoryInUse => "category_in_use",
            Error::UnknownCategory => "unknown_category",
            Error::DuplicateSku => "duplicate_sku",
            Error::EmailTaken => "email_taken",
            Error::Unauthenticated => "unauthenticated",
            Error::Forbidden => "forbidden",
            Error::Validation(_) => "validation",
            Error::Conflict => "conflict",
            Error::Internal(_) | Error::Database(_) => "internal",
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Error::Validation(errors.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        let mut body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        match &self {
            Error::ProductNotFound { ids } => body["product_ids"] = json!(ids),
            Error::InvalidQuantity { product_id } => body["product_id"] = json!(product_id),
            Error::InsufficientStock {
                product_id,
                requested,
                available,
                ..
            } => {
                body["product_id"] = json!(product_id);
                body["requested"] = json!(requested);
                body["available"] = json!(available);
            }
            Error::OrderNotFound { order_id } => body["order_id"] = json!(order_id),
            Error::Conflict => body["retryable"] = json!(true),
            _ => {}
        }
        (status, Json(body)).into_response()
    }
}

fn is_locked(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            // SQLITE_BUSY (5) and SQLITE_LOCKED (6) family, including the
            // extended WAL codes.
            matches!(
                db.code().as_deref(),
                Some("5") | Some("6") | Some("261") | Some("262") | Some("517")
            ) || db.message().contains("locked")
                || db.message().contains("busy")
        }
        sqlx::Error::PoolTimedOut => true,
        _ => false,
    }
}
