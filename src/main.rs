//! VoltShop - Self-hosted Electronics Storefront API

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voltshop::auth::JwtService;
use voltshop::config::Config;
use voltshop::{api, seed, AppState, MIGRATOR};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);
    let db = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;
    MIGRATOR.run(&db).await?;
    seed::run(&db, &config).await?;

    let state = AppState {
        db,
        jwt: Arc::new(JwtService::new(config.jwt.clone())),
        shipping: config.shipping.clone(),
    };
    let app = api::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("voltshop listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
