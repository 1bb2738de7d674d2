//! First-run seed data: an admin account and a demo catalog.

use std::collections::HashMap;

use sqlx::SqlitePool;

use crate::auth::password;
use crate::config::Config;
use crate::domain::{Money, ProductDraft};
use crate::error::Result;
use crate::store::users::ROLE_ADMIN;
use crate::store::{catalog, users};

pub async fn run(db: &SqlitePool, config: &Config) -> Result<()> {
    if users::find_by_email(db, &config.admin_email).await?.is_none() {
        let hash = password::hash(&config.admin_password)?;
        users::create(db, &config.admin_email, "Store Admin", &hash, ROLE_ADMIN).await?;
        tracing::info!(email = %config.admin_email, "admin account created");
    }

    let category_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
        .fetch_one(db)
        .await?;
    if category_count > 0 {
        return Ok(());
    }

    let names = [
        "Smartphones",
        "Laptops",
        "Headphones",
        "Smart Home",
        "Gaming",
        "TV & Audio",
    ];
    let mut categories = HashMap::new();
    for name in names {
        let category = catalog::create_category(db, name).await?;
        categories.insert(name, category.id);
    }

    let demo: [(&str, &str, Option<&str>, i64, i64, &str, bool); 8] = [
        ("VS-SM-001", "Volt One X", Some("Volt"), 69_900, 22, "Smartphones", true),
        ("VS-SM-002", "Lumen Pro 12", Some("Lumen"), 79_900, 15, "Smartphones", false),
        ("VS-LT-010", "Featherbook 14", Some("Feather"), 109_900, 10, "Laptops", true),
        ("VS-LT-011", "Forge 16 Creator", Some("Forge"), 149_900, 6, "Laptops", false),
        ("VS-HP-100", "Drift ANC", Some("Drift"), 19_900, 40, "Headphones", true),
        ("VS-SH-220", "Nest Node Mini", Some("Node"), 4_900, 60, "Smart Home", false),
        ("VS-GM-300", "Arc Controller", Some("Arc"), 5_900, 50, "Gaming", false),
        ("VS-TV-500", "Vista 55 4K", Some("Vista"), 64_900, 8, "TV & Audio", true),
    ];
    for (sku, name, brand, price_cents, stock, category, featured) in demo {
        let draft = ProductDraft::new(
            sku,
            name,
            brand,
            Money::from_cents(price_cents),
            stock,
            None,
            None,
            categories[category],
            featured,
        )?;
        catalog::create_product(db, &draft).await?;
    }
    tracing::info!("demo catalog seeded");
    Ok(())
}
