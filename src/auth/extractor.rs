//! Axum extractor for the authenticated caller.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::auth::jwt::{Claims, JwtService};
use crate::error::Error;
use crate::store::users::ROLE_ADMIN;
use crate::AppState;

/// Authenticated caller identity, decoded from the Authorization header.
/// Handlers needing a login take this as an argument; admin-only handlers
/// additionally call [`CurrentUser::require_admin`].
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    pub fn require_admin(&self) -> Result<(), Error> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::Forbidden)
        }
    }
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            name: claims.name,
            role: claims.role,
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Error> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(Error::Unauthenticated)?;
        let token = JwtService::bearer(header).ok_or(Error::Unauthenticated)?;
        let claims = state.jwt.verify(token)?;

        let user = CurrentUser::from(claims);
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}
