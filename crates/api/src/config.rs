//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `API_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)
//!
//! ## Optional
//! - `API_HOST` - Bind address (default: 127.0.0.1)
//! - `API_PORT` - Listen port (default: 3000)
//! - `SHOP_SHIPPING_FEE` - Default shipping fee applied when the client
//!   does not send one (default: 200)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `PAYFAST_MERCHANT_ID` / `PAYFAST_MERCHANT_PASSWORD` - Gateway merchant
//!   credentials (default: public sandbox)
//! - `PAYFAST_CHECKOUT_URL` / `PAYFAST_RETURN_URL` / `PAYFAST_CANCEL_URL` /
//!   `PAYFAST_CURRENCY` - Gateway endpoints and currency

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

use clementine_core::Price;

use crate::services::payment::PayfastConfig;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Shop API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Default shipping fee when the client does not send one
    pub shipping_fee: Price,
    /// Payment gateway configuration
    pub payfast: PayfastConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("API_DATABASE_URL")?;
        let host = get_env_or_default("API_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("API_HOST".to_owned(), e.to_string()))?;
        let port = get_env_or_default("API_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("API_PORT".to_owned(), e.to_string()))?;
        let shipping_fee = get_env_or_default("SHOP_SHIPPING_FEE", "200")
            .parse::<Price>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("SHOP_SHIPPING_FEE".to_owned(), e.to_string())
            })?;
        let payfast = payfast_from_env();
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            shipping_fee,
            payfast,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Load PayFast settings, keeping the sandbox defaults for anything unset.
fn payfast_from_env() -> PayfastConfig {
    let defaults = PayfastConfig::default();
    PayfastConfig {
        merchant_id: get_env_or_default("PAYFAST_MERCHANT_ID", &defaults.merchant_id),
        merchant_password: get_optional_env("PAYFAST_MERCHANT_PASSWORD")
            .map_or(defaults.merchant_password, SecretString::from),
        checkout_url: get_env_or_default("PAYFAST_CHECKOUT_URL", &defaults.checkout_url),
        return_url: get_env_or_default("PAYFAST_RETURN_URL", &defaults.return_url),
        cancel_url: get_env_or_default("PAYFAST_CANCEL_URL", &defaults.cancel_url),
        currency: get_env_or_default("PAYFAST_CURRENCY", &defaults.currency),
    }
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_owned()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> ApiConfig {
        ApiConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            shipping_fee: Price::from(200),
            payfast: PayfastConfig::default(),
            sentry_dsn: None,
        }
    }

    #[test]
    fn socket_addr_combines_host_and_port() {
        let addr = test_config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn default_shipping_fee_parses() {
        let fee: Price = "200".parse().unwrap();
        assert_eq!(fee, Price::from(200));
    }

    #[test]
    fn config_debug_redacts_the_database_url() {
        let debug = format!("{:?}", test_config());
        assert!(!debug.contains("postgres://localhost/test"));
    }
}
