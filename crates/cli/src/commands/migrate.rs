//! Database migration command.
//!
//! # Environment Variables
//!
//! - `API_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)
//!
//! Migration files live in `crates/api/migrations/`.

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;

/// Migration failure.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid seed data: {0}")]
    InvalidSeedData(&'static str),
}

/// Run the shop database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the database URL is missing, the connection
/// fails, or a migration fails to apply.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = database_url()?;

    tracing::info!("Connecting to shop database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Running shop migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Shop migrations complete!");
    Ok(())
}

pub(crate) fn database_url() -> Result<SecretString, MigrationError> {
    std::env::var("API_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingEnvVar("API_DATABASE_URL"))
}
