//! HTTP surface: routes and handlers.

pub mod auth;
pub mod catalog;
pub mod orders;

use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route(
            "/api/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route("/api/categories/:id", delete(catalog::delete_category))
        .route(
            "/api/products",
            get(catalog::list_products).post(catalog::create_product),
        )
        .route(
            "/api/products/:id",
            get(catalog::get_product)
                .put(catalog::update_product)
                .delete(catalog::delete_product),
        )
        .route("/api/orders", get(orders::list_all).post(orders::create))
        .route("/api/orders/mine", get(orders::mine))
        .route("/api/orders/:id/status", put(orders::set_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy", "service": "voltshop"}))
}
