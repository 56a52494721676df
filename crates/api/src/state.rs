//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::db::PgStore;
use crate::services::payment::PayfastClient;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; provides access to the database pool, the
/// checkout/review store, and the payment gateway client.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    store: PgStore,
    payfast: PayfastClient,
}

impl AppState {
    /// Create a new application state over a connected pool.
    #[must_use]
    pub fn new(config: ApiConfig, pool: PgPool) -> Self {
        let store = PgStore::new(pool.clone());
        let payfast = PayfastClient::new(config.payfast.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                store,
                payfast,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the checkout and review store.
    #[must_use]
    pub fn store(&self) -> &PgStore {
        &self.inner.store
    }

    /// Get a reference to the payment gateway client.
    #[must_use]
    pub fn payfast(&self) -> &PayfastClient {
        &self.inner.payfast
    }
}
