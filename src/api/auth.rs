//! Registration, login, and the current-account endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::{password, CurrentUser};
use crate::error::{Error, Result};
use crate::store::users::{self, ROLE_CUSTOMER};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "full name is required"))]
    pub full_name: String,
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub email: String,
    pub full_name: String,
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub email: String,
    pub full_name: String,
    pub role: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    req.validate()?;
    let email = req.email.trim().to_lowercase();
    let password_hash = password::hash(&req.password)?;
    let user = users::create(
        &state.db,
        &email,
        req.full_name.trim(),
        &password_hash,
        ROLE_CUSTOMER,
    )
    .await?;
    let token = state.jwt.issue(&user)?;
    tracing::info!(user_id = %user.id, "account registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            is_admin: user.is_admin(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let email = req.email.trim().to_lowercase();
    let user = users::find_by_email(&state.db, &email)
        .await?
        .ok_or(Error::Unauthenticated)?;
    if !password::verify(&req.password, &user.password_hash) {
        return Err(Error::Unauthenticated);
    }
    let token = state.jwt.issue(&user)?;
    Ok(Json(AuthResponse {
        token,
        email: user.email.clone(),
        full_name: user.full_name.clone(),
        is_admin: user.is_admin(),
    }))
}

pub async fn me(State(state): State<AppState>, user: CurrentUser) -> Result<Json<MeResponse>> {
    // Read from the store so a deleted account stops resolving even while
    // its token is still valid.
    let user = users::find_by_id(&state.db, &user.id)
        .await?
        .ok_or(Error::Unauthenticated)?;
    Ok(Json(MeResponse {
        email: user.email,
        full_name: user.full_name,
        role: user.role,
    }))
}
