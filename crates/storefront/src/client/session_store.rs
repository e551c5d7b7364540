//! Client-local session persistence.
//!
//! Owns the `userInfo` entry of durable storage. Reading never fails: a
//! missing, unreadable or malformed record is reported as "no user".

use serde::Serialize;
use tracing::warn;

use kicks_core::{LocalStorage, SessionRecord, StorageError, UserId, keys};

use crate::storage::SharedStorage;

/// The view of the stored session handed to callers.
///
/// The access token is exposed twice, as `access_token` and `token`, for
/// consumers written against either name. Both always hold the same value.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    pub access_token: String,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl From<SessionRecord> for CurrentUser {
    fn from(record: SessionRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            email: record.email,
            is_admin: record.is_admin,
            token: record.access_token.clone(),
            access_token: record.access_token,
            refresh_token: record.refresh_token,
        }
    }
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("is_admin", &self.is_admin)
            .field("access_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Reads, writes and validates the persisted [`SessionRecord`].
#[derive(Clone)]
pub struct SessionStore {
    storage: SharedStorage,
}

impl SessionStore {
    /// Create a store over `storage`.
    #[must_use]
    pub fn new(storage: SharedStorage) -> Self {
        Self { storage }
    }

    /// The storage this store writes to.
    #[must_use]
    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    /// The raw stored record, if one can be read.
    #[must_use]
    pub fn record(&self) -> Option<SessionRecord> {
        match self.storage.get_json::<SessionRecord>(keys::USER_INFO) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable session record");
                None
            }
        }
    }

    /// The current user, if a record is stored.
    ///
    /// The record is returned even when it is not [valid](Self::is_valid);
    /// callers deciding whether to make authorized calls should check
    /// validity.
    #[must_use]
    pub fn current_user(&self) -> Option<CurrentUser> {
        self.record().map(CurrentUser::from)
    }

    /// Returns `true` iff a stored record has both an ID and an access token.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.record().is_some_and(|record| record.is_valid())
    }

    /// The bearer token for authorized calls, when the session is valid.
    #[must_use]
    pub fn bearer_token(&self) -> Option<String> {
        self.record()
            .filter(SessionRecord::is_valid)
            .map(|record| record.access_token)
    }

    /// Persist `record`, replacing any previous session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be written.
    pub fn save(&self, record: &SessionRecord) -> Result<(), StorageError> {
        self.storage.set_json(keys::USER_INFO, record)
    }

    /// Remove the session record. Other stored state is left alone.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be removed.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove_item(keys::USER_INFO)
    }

    /// Remove the session record and every key in `extra`.
    ///
    /// Every key is attempted; the first failure is returned.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any key cannot be removed.
    pub fn clear_with(&self, extra: &[&str]) -> Result<(), StorageError> {
        let mut first_error = self.clear().err();
        for key in extra.iter().filter(|key| **key != keys::USER_INFO) {
            if let Err(e) = self.storage.remove_item(key) {
                warn!(error = %e, key, "Failed to remove stored key");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
