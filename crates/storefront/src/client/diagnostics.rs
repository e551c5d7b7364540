//! Session diagnostics.
//!
//! Inspection and fault-injection helpers for support and manual testing.
//! Constructed explicitly where needed; nothing here is reachable unless a
//! caller builds a [`Diagnostics`].

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use kicks_core::{StorageError, UserId, keys};

use super::image_cache::ImageCacheRegistry;
use super::session_store::SessionStore;

/// Access token written by [`Diagnostics::expire_token`]. The backend
/// rejects it, so the next authorized call exercises the teardown path.
pub const EXPIRED_TOKEN: &str = "expired.diagnostic.token";

const TOKEN_PREVIEW_CHARS: usize = 8;

/// Summary of the stored session, safe to log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub has_session: bool,
    pub is_valid: bool,
    pub user_id: Option<UserId>,
    pub is_admin: bool,
    /// First few characters of the access token followed by `...`.
    pub token_preview: Option<String>,
    pub token_length: usize,
    pub has_refresh_token: bool,
}

/// Inspection operations over the session layer.
pub struct Diagnostics {
    session: SessionStore,
    images: Arc<ImageCacheRegistry>,
}

impl Diagnostics {
    #[must_use]
    pub const fn new(session: SessionStore, images: Arc<ImageCacheRegistry>) -> Self {
        Self { session, images }
    }

    /// Describe the stored session without exposing the token.
    #[must_use]
    pub fn show_token_info(&self) -> TokenInfo {
        let info = self.session.record().map_or(
            TokenInfo {
                has_session: false,
                is_valid: false,
                user_id: None,
                is_admin: false,
                token_preview: None,
                token_length: 0,
                has_refresh_token: false,
            },
            |record| TokenInfo {
                has_session: true,
                is_valid: record.is_valid(),
                token_preview: (!record.access_token.is_empty()).then(|| {
                    let head: String = record
                        .access_token
                        .chars()
                        .take(TOKEN_PREVIEW_CHARS)
                        .collect();
                    format!("{head}...")
                }),
                token_length: record.access_token.chars().count(),
                has_refresh_token: record.refresh_token.is_some(),
                is_admin: record.is_admin,
                user_id: Some(record.id),
            },
        );

        info!(
            has_session = info.has_session,
            is_valid = info.is_valid,
            token_length = info.token_length,
            "Session token info"
        );
        info
    }

    /// Replace the stored access token with one the backend will reject.
    ///
    /// Returns `false` when there is no stored session to expire.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be rewritten.
    pub fn expire_token(&self) -> Result<bool, StorageError> {
        let Some(mut record) = self.session.record() else {
            return Ok(false);
        };

        record.access_token = EXPIRED_TOKEN.to_string();
        self.session.save(&record)?;
        info!(user_id = %record.id, "Access token replaced with an expired token");
        Ok(true)
    }

    /// Remove every piece of client-local state: session, cart, favorites
    /// and image freshness.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any key cannot be removed.
    pub fn clear_all_data(&self) -> Result<(), StorageError> {
        self.images.clear_all();
        self.session.clear_with(keys::AUTH_TEARDOWN)?;
        info!("Cleared all client-local data");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kicks_core::{LocalStorage, ProductId, SessionRecord};

    use super::*;
    use crate::client::images::ImagePathResolver;
    use crate::storage::MemoryStorage;

    fn diagnostics() -> Diagnostics {
        let storage = MemoryStorage::shared();
        let images = Arc::new(ImageCacheRegistry::new(
            ImagePathResolver::new("https://api.kicks.test"),
            Arc::clone(&storage),
        ));
        Diagnostics::new(SessionStore::new(storage), images)
    }

    fn seed(diagnostics: &Diagnostics) {
        diagnostics
            .session
            .save(&SessionRecord {
                id: UserId::new("u1"),
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                is_admin: true,
                access_token: "eyJhbGciOiJIUzI1NiJ9.payload.sig".to_string(),
                refresh_token: Some("r".to_string()),
            })
            .unwrap();
    }

    #[test]
    fn test_token_info_without_session() {
        let info = diagnostics().show_token_info();
        assert!(!info.has_session);
        assert!(!info.is_valid);
        assert_eq!(info.token_preview, None);
    }

    #[test]
    fn test_token_info_redacts_token() {
        let diagnostics = diagnostics();
        seed(&diagnostics);

        let info = diagnostics.show_token_info();
        assert!(info.has_session && info.is_valid && info.is_admin);
        assert_eq!(info.token_preview.as_deref(), Some("eyJhbGci..."));
        assert_eq!(info.token_length, 32);
        assert!(info.has_refresh_token);
    }

    #[test]
    fn test_expire_token_keeps_session_shape() {
        let diagnostics = diagnostics();
        assert!(!diagnostics.expire_token().unwrap());

        seed(&diagnostics);
        assert!(diagnostics.expire_token().unwrap());

        let record = diagnostics.session.record().unwrap();
        assert_eq!(record.access_token, EXPIRED_TOKEN);
        // An expired token is indistinguishable from a valid one locally.
        assert!(diagnostics.session.is_valid());
    }

    #[test]
    fn test_clear_all_data() {
        let diagnostics = diagnostics();
        seed(&diagnostics);
        diagnostics
            .session
            .storage()
            .set_item(keys::CART, "[]")
            .unwrap();
        diagnostics.images.touch(&ProductId::new("1"));

        diagnostics.clear_all_data().unwrap();

        assert!(!diagnostics.session.is_valid());
        assert!(diagnostics.images.peek(&ProductId::new("1")).is_none());
        assert!(
            diagnostics
                .session
                .storage()
                .get_item(keys::CART)
                .unwrap()
                .is_none()
        );
    }
}
