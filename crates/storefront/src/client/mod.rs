//! Client session layer.
//!
//! # Components
//!
//! - [`ImagePathResolver`] - Normalizes raw image paths into fetchable URLs
//! - [`ImageCacheRegistry`] - Per-product freshness timestamps and cache-busted URLs
//! - [`SessionStore`] - The locally persisted session record
//! - [`AuthErrorHandler`] - Classifies failed calls, tears down on 401/403
//! - [`BackendClient`] - Login, logout and authorized backend calls
//! - [`Diagnostics`] - Session inspection for support
//!
//! # Session lifecycle
//!
//! ```text
//! Anonymous --login success--> Authenticated
//! Authenticated --logout | 401/403--> Anonymous
//! ```
//!
//! There is no refreshing state: an expired token looks valid until the next
//! authorized call fails.
//!
//! # Example
//!
//! ```rust,ignore
//! let storage = MemoryStorage::shared();
//! let session = SessionStore::new(Arc::clone(&storage));
//! let images = Arc::new(ImageCacheRegistry::new(
//!     ImagePathResolver::new(&config.asset_base_url),
//!     storage,
//! ));
//! let errors = AuthErrorHandler::new(session.clone(), Arc::new(|to: &str| router.push(to)));
//! let client = BackendClient::new(&config.api_url, &config.base_url, session, errors, images);
//!
//! client.login("ada@example.com", "hunter22").await?;
//! let orders: Vec<Order> = client.get_json("/api/orders/mine").await?;
//! ```

pub mod api;
pub mod auth_errors;
pub mod diagnostics;
pub mod image_cache;
pub mod images;
pub mod session_store;

pub use api::{ApiError, BackendClient};
pub use auth_errors::{AuthErrorHandler, AuthOutcome, FailedCall, Navigator, classify};
pub use diagnostics::{Diagnostics, TokenInfo};
pub use image_cache::ImageCacheRegistry;
pub use images::{ImagePathResolver, PLACEHOLDER_IMAGE};
pub use session_store::{CurrentUser, SessionStore};
