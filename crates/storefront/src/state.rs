//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::middleware::CookiePolicy;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. The cookie endpoints are stateless per
/// request; the state only carries configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    cookies: CookiePolicy,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let cookies = CookiePolicy::new(config.secure_cookies());
        Self {
            inner: Arc::new(AppStateInner { config, cookies }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Attributes applied to every auth cookie this server writes.
    #[must_use]
    pub fn cookies(&self) -> &CookiePolicy {
        &self.inner.cookies
    }
}
