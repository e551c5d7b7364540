//! Auth cookie policy.
//!
//! Both auth cookies share one policy: `SameSite=Strict`, `Path=/`, a 30 day
//! lifetime, and `Secure` in production. Only the access token cookie is
//! `HttpOnly`; the display cookie is readable by page scripts. Values are
//! percent-encoded, so a value can never carry its own attributes.

use axum::http::{HeaderMap, HeaderValue, header::SET_COOKIE};
use axum_extra::extract::cookie::{Cookie, SameSite};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use time::Duration;

/// Cookie carrying the bearer token.
pub const ACCESS_COOKIE: &str = "accessToken";

/// Cookie carrying the JSON display info of the signed-in user.
pub const DISPLAY_COOKIE: &str = "userInfo";

/// Lifetime of both auth cookies in seconds (30 days).
pub const COOKIE_MAX_AGE_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Largest `name=value` pair a browser will store.
pub const MAX_COOKIE_BYTES: usize = 4096;

/// Failure writing a cookie into the response.
#[derive(Debug, Error)]
pub enum CookieError {
    #[error("cookie {name} is not a valid Set-Cookie header: {source}")]
    InvalidHeader {
        name: String,
        #[source]
        source: axum::http::header::InvalidHeaderValue,
    },
    #[error("cookie {name} is {size} bytes, over the {MAX_COOKIE_BYTES} byte limit")]
    TooLarge { name: String, size: usize },
    #[error("failed to encode cookie {name}: {source}")]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Attributes for the auth cookie pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    secure: bool,
}

impl CookiePolicy {
    #[must_use]
    pub const fn new(secure: bool) -> Self {
        Self { secure }
    }

    #[must_use]
    pub const fn secure(&self) -> bool {
        self.secure
    }

    /// The `HttpOnly` access token cookie, value percent-encoded.
    #[must_use]
    pub fn access_cookie(&self, token: &SecretString) -> Cookie<'static> {
        let mut cookie = self.cookie(
            ACCESS_COOKIE,
            urlencoding::encode(token.expose_secret()).into_owned(),
            Duration::seconds(COOKIE_MAX_AGE_SECONDS),
        );
        cookie.set_http_only(true);
        cookie
    }

    /// The script-readable display cookie: percent-encoded JSON of `user`.
    ///
    /// # Errors
    ///
    /// Returns `CookieError::Encode` if `user` cannot be serialized.
    pub fn display_cookie<T: Serialize>(&self, user: &T) -> Result<Cookie<'static>, CookieError> {
        let json = serde_json::to_string(user).map_err(|source| CookieError::Encode {
            name: DISPLAY_COOKIE.to_string(),
            source,
        })?;

        Ok(self.cookie(
            DISPLAY_COOKIE,
            urlencoding::encode(&json).into_owned(),
            Duration::seconds(COOKIE_MAX_AGE_SECONDS),
        ))
    }

    /// Both auth cookies, emptied and expiring immediately.
    #[must_use]
    pub fn expired_pair(&self) -> [Cookie<'static>; 2] {
        let mut access = self.cookie(ACCESS_COOKIE, String::new(), Duration::ZERO);
        access.set_http_only(true);
        let display = self.cookie(DISPLAY_COOKIE, String::new(), Duration::ZERO);
        [access, display]
    }

    fn cookie(&self, name: &'static str, value: String, max_age: Duration) -> Cookie<'static> {
        Cookie::build((name, value))
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .path("/")
            .max_age(max_age)
            .build()
    }
}

/// Append `cookie` to `headers` as a `Set-Cookie` header.
///
/// Values are expected to be encoded already (see [`CookiePolicy`]).
///
/// # Errors
///
/// Returns `CookieError::TooLarge` if the pair would be dropped by browsers,
/// or `CookieError::InvalidHeader` if it is not a valid header value.
pub fn append_cookie(headers: &mut HeaderMap, cookie: &Cookie<'_>) -> Result<(), CookieError> {
    let size = cookie.name().len() + cookie.value().len();
    if size > MAX_COOKIE_BYTES {
        return Err(CookieError::TooLarge {
            name: cookie.name().to_string(),
            size,
        });
    }

    let value = HeaderValue::from_str(&cookie.to_string()).map_err(|source| {
        CookieError::InvalidHeader {
            name: cookie.name().to_string(),
            source,
        }
    })?;
    headers.append(SET_COOKIE, value);
    Ok(())
}
