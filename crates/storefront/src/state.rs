//! Application state shared across handlers.

use std::sync::Arc;

use atelier_core::CurrencyCode;

use crate::config::StorefrontConfig;
use crate::store::CommerceStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the store and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Arc<dyn CommerceStore>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `store` - Store backend selected by `config.store`
    #[must_use]
    pub fn new(config: StorefrontConfig, store: Arc<dyn CommerceStore>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, store }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &dyn CommerceStore {
        self.inner.store.as_ref()
    }

    /// Currency prices are computed in.
    #[must_use]
    pub fn currency(&self) -> CurrencyCode {
        self.config().currency
    }
}
