//! User accounts. Email uniqueness is case-insensitive.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::unique_violation;

pub const ROLE_CUSTOMER: &str = "Customer";
pub const ROLE_ADMIN: &str = "Admin";

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

pub async fn create(
    db: &SqlitePool,
    email: &str,
    full_name: &str,
    password_hash: &str,
    role: &str,
) -> Result<User> {
    let user = User {
        id: Uuid::new_v4().to_string(),
        email: email.to_string(),
        full_name: full_name.to_string(),
        password_hash: password_hash.to_string(),
        role: role.to_string(),
        created_at: Utc::now(),
    };
    sqlx::query(
        "INSERT INTO users (id, email, full_name, password_hash, role, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.full_name)
    .bind(&user.password_hash)
    .bind(&user.role)
    .bind(user.created_at)
    .execute(db)
    .await
    .map_err(|e| {
        if unique_violation(&e) {
            Error::EmailTaken
        } else {
            Error::from_sqlx(e)
        }
    })?;
    Ok(user)
}

pub async fn find_by_email(db: &SqlitePool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(db)
        .await
        .map_err(Error::from_sqlx)?;
    Ok(user)
}

pub async fn find_by_id(db: &SqlitePool, id: &str) -> Result<Option<User>> {
    let user = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
        .map_err(Error::from_sqlx)?;
    Ok(user)
}
