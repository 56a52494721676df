//! Database operations for the storefront `PostgreSQL` schema `shop`.
//!
//! ## Tables
//!
//! - `shop.products` - Catalog with the contended `total_stock` counter
//! - `shop.carts` / `shop.cart_items` - One pending cart per user
//! - `shop.addresses` - Saved shipping addresses (max 3 per user)
//! - `shop.orders` - Frozen order snapshots (items/address as JSONB)
//! - `shop.reviews` - One review per (product, user)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p clementine-cli -- migrate
//! ```
//!
//! Queries are runtime-checked (`sqlx::query_as`); row structs are converted
//! to domain types in the repositories, with bad stored data surfaced as
//! [`StoreError::DataCorruption`].

pub mod addresses;
pub mod carts;
pub mod memory;
pub mod orders;
pub mod products;
pub mod reviews;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use clementine_core::{AddressId, OrderId, ProductId};

/// Error from a repository or checkout/review store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// A line item references a product with not enough stock left.
    #[error("insufficient stock for \"{title}\": {available} available, {requested} requested")]
    InsufficientStock {
        product_id: ProductId,
        title: String,
        available: i32,
        requested: i32,
    },

    /// A line item references a product that does not exist.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// The cart does not exist.
    #[error("cart not found")]
    CartNotFound,

    /// The cart has no line for the product.
    #[error("product {0} is not in the cart")]
    CartItemNotFound(ProductId),

    /// The order does not exist.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// The address does not exist (or belongs to another user).
    #[error("address {0} not found")]
    AddressNotFound(AddressId),

    /// The (product, user) pair already has a review.
    #[error("review already exists for this product")]
    DuplicateReview,

    /// No confirmed or delivered order contains the product.
    #[error("product must be purchased before it can be reviewed")]
    PurchaseRequired,

    /// Constraint violation (e.g., address limit).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Transient transaction failure (write conflict, deadlock); safe to retry.
    #[error("transient transaction failure: {0}")]
    Transient(String),
}

impl StoreError {
    /// Map a sqlx error, classifying serialization failures and deadlocks
    /// as transient so the checkout service can retry them.
    #[must_use]
    pub fn from_db(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && let Some(code) = db_err.code()
            && (code == "40001" || code == "40P01")
        {
            return Self::Transient(db_err.message().to_owned());
        }
        Self::Database(e)
    }
}

/// Postgres-backed checkout and review store.
///
/// Cheap to clone; wraps the shared connection pool. The trait
/// implementations live next to their queries in [`orders`] and [`reviews`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
