//! Backend API client for the storefront session layer.
//!
//! Ties the session components together:
//! - [`login`](BackendClient::login) stores the returned record, then waits
//!   for the cookie bridge to set the durable cookie.
//! - Authorized calls read the bearer token from the [`SessionStore`]; any
//!   failure goes through the [`AuthErrorHandler`] before it is returned.
//! - [`update_product_image`](BackendClient::update_product_image) bumps the
//!   product's freshness so its image URLs change.

use std::sync::{Arc, Mutex, PoisonError};

use reqwest::{Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use kicks_core::{Freshness, ProductId, SessionRecord, StorageError};

use super::auth_errors::{AuthErrorHandler, FailedCall};
use super::image_cache::ImageCacheRegistry;
use super::session_store::{CurrentUser, SessionStore};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::routes::auth::{SetCookieRequest, SetCookieUser};

/// Backend path for credential login.
pub const LOGIN_ENDPOINT: &str = "/api/users/login";

/// Errors returned by [`BackendClient`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("request failed with status {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status {
        status: u16,
        message: Option<String>,
    },

    /// An authorized call was attempted without a valid session.
    #[error("not logged in")]
    NotAuthenticated,

    /// The login response did not contain a usable session.
    #[error("login response did not contain a valid session")]
    InvalidSession,

    /// Local session state could not be written.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// Describe this error for the [`AuthErrorHandler`].
    #[must_use]
    pub fn failed_call(&self) -> FailedCall {
        match self {
            Self::Status { status, message } => FailedCall::with_status(*status, message.clone()),
            Self::NotAuthenticated => FailedCall::with_status(401, None),
            Self::Http(e) => match e.status() {
                Some(status) => FailedCall::with_status(status.as_u16(), None),
                None => FailedCall::transport(e.to_string()),
            },
            other => FailedCall::transport(other.to_string()),
        }
    }

    /// HTTP status of the failure, if the server answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.failed_call().status
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Server error body: `{"message": ...}` or `{"error": ...}`.
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

fn server_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .filter(|m| !m.trim().is_empty())
}

#[derive(Serialize)]
struct ProductImageUpdate<'a> {
    image: &'a str,
}

/// HTTP client for the backend API and the storefront cookie bridge.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    http: reqwest::Client,
    api_base: String,
    storefront_base: String,
    session: SessionStore,
    auth_errors: AuthErrorHandler,
    images: Arc<ImageCacheRegistry>,
    location: Mutex<String>,
}

impl BackendClient {
    /// Create a client.
    ///
    /// * `api_base` - Origin of the backend API
    /// * `storefront_base` - Origin serving `/api/auth/set-cookie` and `/api/auth/logout`
    #[must_use]
    pub fn new(
        api_base: &str,
        storefront_base: &str,
        session: SessionStore,
        auth_errors: AuthErrorHandler,
        images: Arc<ImageCacheRegistry>,
    ) -> Self {
        Self::with_http(
            reqwest::Client::new(),
            api_base,
            storefront_base,
            session,
            auth_errors,
            images,
        )
    }

    /// Create a client on an existing `reqwest` client (e.g., one with a
    /// cookie store).
    #[must_use]
    pub fn with_http(
        http: reqwest::Client,
        api_base: &str,
        storefront_base: &str,
        session: SessionStore,
        auth_errors: AuthErrorHandler,
        images: Arc<ImageCacheRegistry>,
    ) -> Self {
        Self {
            inner: Arc::new(BackendClientInner {
                http,
                api_base: api_base.trim_end_matches('/').to_string(),
                storefront_base: storefront_base.trim_end_matches('/').to_string(),
                session,
                auth_errors,
                images,
                location: Mutex::new("/".to_string()),
            }),
        }
    }

    /// The session store backing this client.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// The image registry backing this client.
    #[must_use]
    pub fn images(&self) -> &ImageCacheRegistry {
        &self.inner.images
    }

    /// Record the view the user is on; used as the return target after an
    /// authorization failure.
    pub fn set_location(&self, location: impl Into<String>) {
        *self
            .inner
            .location
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = location.into();
    }

    fn location(&self) -> String {
        self.inner
            .location
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // =========================================================================
    // Session lifecycle
    // =========================================================================

    /// Log in with credentials.
    ///
    /// Stores the returned session locally, then waits for the cookie bridge
    /// so the login survives a reload.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend rejects the credentials, returns no
    /// usable session, or the session cannot be stored. If only the cookie
    /// bridge fails, the local session is kept and the error is returned.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<CurrentUser, ApiError> {
        let response = self
            .inner
            .http
            .post(format!("{}{LOGIN_ENDPOINT}", self.inner.api_base))
            .json(&LoginRequest { email, password })
            .send()
            .await?;
        let record: SessionRecord = decode(response).await?;

        if !record.is_valid() {
            return Err(ApiError::InvalidSession);
        }

        self.inner.session.save(&record)?;
        self.set_cookie(&record).await?;
        set_sentry_user(&record.id, Some(record.email.as_str()).filter(|e| !e.is_empty()));

        debug!(user_id = %record.id, "Logged in");
        Ok(CurrentUser::from(record))
    }

    /// Ask the cookie bridge to set the durable cookie pair for `record`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the bridge rejects the request.
    pub async fn set_cookie(&self, record: &SessionRecord) -> Result<(), ApiError> {
        let body = SetCookieRequest {
            token: Some(record.access_token.clone()),
            user: Some(SetCookieUser::from(record)),
        };
        let response = self
            .inner
            .http
            .post(format!("{}/api/auth/set-cookie", self.inner.storefront_base))
            .json(&body)
            .send()
            .await?;
        decode::<serde_json::Value>(response).await.map(|_| ())
    }

    /// Log out: expire the cookie pair, then clear local session state.
    ///
    /// Local state is cleared even when the cookie bridge fails; the bridge
    /// error is returned afterwards.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the cookie bridge or local storage fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ApiError> {
        let bridge = self.expire_cookies().await;

        if let Err(e) = &bridge {
            warn!(error = %e, "Cookie logout failed, clearing local session anyway");
        }

        self.inner.session.clear()?;
        self.inner.images.clear_all();
        clear_sentry_user();
        bridge
    }

    async fn expire_cookies(&self) -> Result<(), ApiError> {
        let response = self
            .inner
            .http
            .post(format!("{}/api/auth/logout", self.inner.storefront_base))
            .send()
            .await?;
        decode::<serde_json::Value>(response).await.map(|_| ())
    }

    // =========================================================================
    // Authorized calls
    // =========================================================================

    /// `GET` an authorized JSON resource from the backend.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on any failure; authorization failures have already
    /// torn the session down when this returns.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.authorized(Method::GET, path, None::<&()>).await
    }

    /// Send an authorized JSON request to the backend.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on any failure; authorization failures have already
    /// torn the session down when this returns.
    pub async fn send_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.authorized(method, path, Some(body)).await
    }

    /// Point `product_id` at a new image and invalidate its cached URLs.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the update fails; the freshness is only bumped
    /// on success.
    #[instrument(skip(self))]
    pub async fn update_product_image(
        &self,
        product_id: &ProductId,
        image: &str,
    ) -> Result<Freshness, ApiError> {
        let _: serde_json::Value = self
            .send_json(
                Method::PUT,
                &format!("/api/products/{}", urlencoding::encode(product_id.as_str())),
                &ProductImageUpdate { image },
            )
            .await?;
        Ok(self.inner.images.touch(product_id))
    }

    /// Display URL for a product image.
    #[must_use]
    pub fn image_url(
        &self,
        raw_path: &str,
        product_id: &ProductId,
        fallback: Option<Freshness>,
    ) -> String {
        self.inner.images.build_url(raw_path, product_id, fallback)
    }

    async fn authorized<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let result = match self.inner.session.bearer_token() {
            Some(token) => {
                let request = self
                    .inner
                    .http
                    .request(method, format!("{}{path}", self.inner.api_base));
                let request = match body {
                    Some(body) => request.json(body),
                    None => request,
                };
                send_with_token(request, &SecretString::from(token)).await
            }
            None => Err(ApiError::NotAuthenticated),
        };

        let error = match result {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        let outcome = self
            .inner
            .auth_errors
            .handle(&error.failed_call(), &self.location());
        if outcome.is_auth_error {
            // The durable cookie pair must not outlive the local session.
            if let Err(e) = self.expire_cookies().await {
                warn!(error = %e, "Cookie expiry after auth failure failed");
            }
        }
        debug!(
            is_auth_error = outcome.is_auth_error,
            message = %outcome.message,
            "Backend call failed"
        );
        Err(error)
    }
}

async fn send_with_token<T: DeserializeOwned>(
    request: RequestBuilder,
    token: &SecretString,
) -> Result<T, ApiError> {
    let response = request.bearer_auth(token.expose_secret()).send().await?;
    decode(response).await
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        message: server_message(&body),
    })
}
