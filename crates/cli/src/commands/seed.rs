//! Seed the catalog with sample products.
//!
//! Intended for local development; does nothing when the catalog already
//! has products.

use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::info;

use clementine_core::Price;

use super::migrate::MigrationError;

struct SeedProduct {
    title: &'static str,
    description: &'static str,
    category: &'static str,
    brand: &'static str,
    price: &'static str,
    sale_price: Option<&'static str>,
    total_stock: i32,
}

const SEED_PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        title: "Classic Leather Sneakers",
        description: "Low-top sneakers in full-grain leather",
        category: "footwear",
        brand: "stride",
        price: "4500",
        sale_price: Some("3800"),
        total_stock: 25,
    },
    SeedProduct {
        title: "Canvas Weekend Tote",
        description: "Heavy canvas tote with leather handles",
        category: "bags",
        brand: "harbor",
        price: "2200",
        sale_price: None,
        total_stock: 40,
    },
    SeedProduct {
        title: "Merino Crewneck Sweater",
        description: "Midweight merino wool, machine washable",
        category: "apparel",
        brand: "north-loom",
        price: "5600",
        sale_price: Some("4900"),
        total_stock: 15,
    },
    SeedProduct {
        title: "Stainless Water Bottle 750ml",
        description: "Double-walled, keeps drinks cold for 24h",
        category: "accessories",
        brand: "harbor",
        price: "1400",
        sale_price: None,
        total_stock: 60,
    },
];

/// Insert the sample catalog.
///
/// # Errors
///
/// Returns `MigrationError` if the database URL is missing, the connection
/// fails, or an insert fails.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = super::migrate::database_url()?;
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shop.products")
        .fetch_one(&pool)
        .await?;
    if count > 0 {
        info!(products = count, "Catalog already seeded, skipping");
        return Ok(());
    }

    for product in SEED_PRODUCTS {
        let price: Price = product
            .price
            .parse()
            .map_err(|_| MigrationError::InvalidSeedData(product.title))?;
        let sale_price: Option<Price> = match product.sale_price {
            Some(p) => Some(
                p.parse()
                    .map_err(|_| MigrationError::InvalidSeedData(product.title))?,
            ),
            None => None,
        };

        sqlx::query(
            r"
            INSERT INTO shop.products
                (title, description, category, brand, price, sale_price, total_stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(product.title)
        .bind(product.description)
        .bind(product.category)
        .bind(product.brand)
        .bind(price)
        .bind(sale_price)
        .bind(product.total_stock)
        .execute(&pool)
        .await?;
    }

    info!(products = SEED_PRODUCTS.len(), "Catalog seeded");
    Ok(())
}
