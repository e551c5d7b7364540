//! Failed backend call classification and authorization teardown.
//!
//! [`classify`] is pure. [`AuthErrorHandler::handle`] applies the side
//! effects for authorization failures: it clears the local session together
//! with client-only data tied to the user, then asks the injected
//! [`Navigator`] to show the login view with a return target.

use std::sync::Arc;

use tracing::{info, warn};

use kicks_core::keys;

use super::session_store::SessionStore;
use crate::error::clear_sentry_user;

/// Path of the login view.
pub const LOGIN_PATH: &str = "/login";

/// Message reported for authorization failures.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

/// What is known about a failed backend call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailedCall {
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
    /// Error message supplied by the server in the response body.
    pub server_message: Option<String>,
    /// Message of the transport-level error.
    pub transport_message: String,
}

impl FailedCall {
    /// A failure that produced a response with `status`.
    #[must_use]
    pub fn with_status(status: u16, server_message: Option<String>) -> Self {
        Self {
            status: Some(status),
            server_message,
            transport_message: format!("Request failed with status code {status}"),
        }
    }

    /// A failure that never produced a response.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            server_message: None,
            transport_message: message.into(),
        }
    }
}

/// Classification of a [`FailedCall`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub is_auth_error: bool,
    /// Always `false`: there is no token refresh path to retry through.
    pub should_retry: bool,
    pub message: String,
    pub status: Option<u16>,
}

/// Returns `true` for statuses that mean the credentials were rejected.
#[must_use]
pub const fn is_auth_status(status: u16) -> bool {
    matches!(status, 401 | 403)
}

/// Classify a failed call without side effects.
#[must_use]
pub fn classify(failure: &FailedCall) -> AuthOutcome {
    if failure.status.is_some_and(is_auth_status) {
        return AuthOutcome {
            is_auth_error: true,
            should_retry: false,
            message: SESSION_EXPIRED_MESSAGE.to_string(),
            status: failure.status,
        };
    }

    let message = failure
        .server_message
        .as_deref()
        .filter(|msg| !msg.trim().is_empty())
        .unwrap_or(&failure.transport_message)
        .to_string();

    AuthOutcome {
        is_auth_error: false,
        should_retry: false,
        message,
        status: failure.status,
    }
}

/// Moves the client to another view.
pub trait Navigator: Send + Sync {
    /// Navigate to `location` (a root-relative path with query).
    fn navigate(&self, location: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn navigate(&self, location: &str) {
        self(location);
    }
}

/// Build the login location carrying `return_to` as its redirect target.
#[must_use]
pub fn login_location(return_to: &str) -> String {
    format!("{LOGIN_PATH}?redirect={}", urlencoding::encode(return_to))
}

/// Routes failed calls to the session teardown when credentials are rejected.
#[derive(Clone)]
pub struct AuthErrorHandler {
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
}

impl AuthErrorHandler {
    /// Create a handler that clears `session` and navigates with `navigator`.
    #[must_use]
    pub fn new(session: SessionStore, navigator: Arc<dyn Navigator>) -> Self {
        Self { session, navigator }
    }

    /// Classify `failure` and, for authorization failures, tear the session
    /// down and navigate to login with `current_location` as return target.
    pub fn handle(&self, failure: &FailedCall, current_location: &str) -> AuthOutcome {
        let outcome = classify(failure);
        if !outcome.is_auth_error {
            return outcome;
        }

        info!(
            status = ?failure.status,
            "Authorization failed, clearing local session"
        );

        if let Err(e) = self.session.clear_with(keys::AUTH_TEARDOWN) {
            warn!(error = %e, "Session teardown incomplete");
        }
        clear_sentry_user();

        self.navigator.navigate(&login_location(current_location));
        outcome
    }
}
