//! Environment-backed configuration, read once at startup.

use rust_decimal::Decimal;

use crate::auth::jwt::JwtConfig;
use crate::domain::Money;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub shipping: ShippingPolicy,
    pub admin_email: String,
    pub admin_password: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://voltshop.db".to_string()),
            port: env_parse("PORT", 8083),
            jwt: JwtConfig::from_env(),
            shipping: ShippingPolicy::from_env(),
            admin_email: std::env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@voltshop.local".to_string()),
            admin_password: std::env::var("ADMIN_PASSWORD")
                .unwrap_or_else(|_| "Admin123!".to_string()),
        }
    }
}

/// Shipping pricing knobs. Orders at or above `free_threshold` ship free,
/// everything below pays the flat fee.
#[derive(Debug, Clone)]
pub struct ShippingPolicy {
    pub free_threshold: Money,
    pub flat_fee: Money,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            free_threshold: Money::from_cents(15_000),
            flat_fee: Money::from_cents(500),
        }
    }
}

impl ShippingPolicy {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            free_threshold: env_money("SHIPPING_FREE_THRESHOLD", defaults.free_threshold),
            flat_fee: env_money("SHIPPING_FLAT_FEE", defaults.flat_fee),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, %raw, "unparseable value, using default");
            default
        }),
        Err(_) => default,
    }
}

fn env_money(key: &str, default: Money) -> Money {
    match std::env::var(key) {
        Ok(raw) => match raw.parse::<Decimal>() {
            Ok(amount) => Money::new(amount),
            Err(_) => {
                tracing::warn!(key, %raw, "unparseable amount, using default");
                default
            }
        },
        Err(_) => default,
    }
}
