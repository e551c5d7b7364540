//! Client-held session identity.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Identity snapshot of the authenticated user.
///
/// A record is only a usable session when both [`id`](Self::id) and
/// [`access_token`](Self::access_token) are non-empty; any other
/// combination is treated as anonymous. See [`SessionRecord::is_valid`].
///
/// Deserialization is lenient about the shapes the backend has produced over
/// time: the document-style `_id` key is accepted for `id`, and the legacy
/// `token` key is accepted for `accessToken`. Missing fields default to empty.
///
/// `Debug` is implemented manually to redact the tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredSessionRecord")]
pub struct SessionRecord {
    /// Backend user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Email address as issued by the backend (not re-validated here).
    pub email: String,
    /// Whether the user may access admin views.
    pub is_admin: bool,
    /// Opaque bearer token.
    pub access_token: String,
    /// Opaque refresh token, when the backend issued one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl SessionRecord {
    /// Returns `true` iff both the user ID and the access token are present.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.id.is_empty() && !self.access_token.is_empty()
    }
}

impl fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("is_admin", &self.is_admin)
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Wire shape accepted when reading a stored record.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSessionRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "_id")]
    document_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    is_admin: bool,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl From<StoredSessionRecord> for SessionRecord {
    fn from(raw: StoredSessionRecord) -> Self {
        let id = raw
            .id
            .filter(|id| !id.is_empty())
            .or(raw.document_id)
            .unwrap_or_default();
        let access_token = raw
            .access_token
            .filter(|token| !token.is_empty())
            .or(raw.token)
            .unwrap_or_default();

        Self {
            id: UserId::new(id),
            name: raw.name.unwrap_or_default(),
            email: raw.email.unwrap_or_default(),
            is_admin: raw.is_admin,
            access_token,
            refresh_token: raw.refresh_token.filter(|token| !token.is_empty()),
        }
    }
}
