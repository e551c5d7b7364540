//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//!
//! [`cookies`] is not a layer; it holds the auth cookie policy used by the
//! cookie endpoints.

pub mod cookies;
pub mod request_id;

pub use cookies::{
    ACCESS_COOKIE, COOKIE_MAX_AGE_SECONDS, CookieError, CookiePolicy, DISPLAY_COOKIE,
    append_cookie,
};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
