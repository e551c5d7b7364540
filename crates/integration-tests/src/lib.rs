//! Integration tests for the Kicks storefront.
//!
//! Everything runs in-process: the storefront router and a fake backend are
//! each bound to `127.0.0.1:0`, and the client session layer talks to both
//! over real HTTP.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p kicks-integration-tests
//! ```
//!
//! # Fake backend
//!
//! | Route                      | Behavior                                        |
//! |----------------------------|-------------------------------------------------|
//! | `POST /api/users/login`    | `ada@example.com` (admin) and `bob@example.com` with password `hunter22` |
//! | `GET /api/orders/mine`     | any issued token, else 401                      |
//! | `PUT /api/products/{id}`   | admin token only, shopper gets 403              |

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    Json, Router,
    extract::Path,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::{get, post, put},
};
use serde_json::{Value, json};

use kicks_storefront::client::{
    AuthErrorHandler, BackendClient, ImageCacheRegistry, ImagePathResolver, Navigator,
    SessionStore,
};
use kicks_storefront::config::StorefrontConfig;
use kicks_storefront::routes;
use kicks_storefront::state::AppState;
use kicks_storefront::storage::SharedStorage;

/// Password accepted by the fake backend.
pub const PASSWORD: &str = "hunter22";
/// Token issued to the admin account.
pub const ADMIN_TOKEN: &str = "admin-token";
/// Token issued to the shopper account.
pub const SHOPPER_TOKEN: &str = "shopper-token";

/// Bind `app` to an ephemeral local port and serve it in the background.
///
/// # Panics
///
/// Panics if the listener cannot be bound.
pub async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    addr
}

/// Start the storefront in the `test` environment and return its origin.
///
/// # Panics
///
/// Panics if the test configuration is rejected.
pub async fn spawn_storefront() -> String {
    let config = StorefrontConfig::from_lookup(|key| match key {
        "STOREFRONT_BASE_URL" => Some("http://127.0.0.1".to_string()),
        "STOREFRONT_ENV" => Some("test".to_string()),
        _ => None,
    })
    .expect("Invalid test configuration");

    let addr = spawn(routes::app(AppState::new(config))).await;
    format!("http://{addr}")
}

/// Start the fake backend and return its origin.
pub async fn spawn_backend() -> String {
    let addr = spawn(fake_backend()).await;
    format!("http://{addr}")
}

fn fake_backend() -> Router {
    Router::new()
        .route("/api/users/login", post(login))
        .route("/api/orders/mine", get(orders))
        .route("/api/products/{id}", put(update_product))
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    let (id, name, is_admin, token) = match (email, password) {
        ("ada@example.com", PASSWORD) => ("u-ada", "Ada", true, ADMIN_TOKEN),
        ("bob@example.com", PASSWORD) => ("u-bob", "Bob", false, SHOPPER_TOKEN),
        _ => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "Invalid email or password"})),
            );
        }
    };

    (
        StatusCode::OK,
        Json(json!({
            "_id": id,
            "name": name,
            "email": email,
            "isAdmin": is_admin,
            "token": token,
        })),
    )
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

async fn orders(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    match bearer(&headers) {
        Some(ADMIN_TOKEN | SHOPPER_TOKEN) => (StatusCode::OK, Json(json!([{"_id": "o1"}]))),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Not authorized, token failed"})),
        ),
    }
}

async fn update_product(
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    match bearer(&headers) {
        Some(ADMIN_TOKEN) => (
            StatusCode::OK,
            Json(json!({"_id": id, "image": body["image"]})),
        ),
        Some(SHOPPER_TOKEN) => (
            StatusCode::FORBIDDEN,
            Json(json!({"message": "Not authorized as an admin"})),
        ),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Not authorized, no token"})),
        ),
    }
}

/// Navigator that records every location it is sent to.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn visits(&self) -> Vec<String> {
        self.visits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, location: &str) {
        self.visits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(location.to_string());
    }
}

/// A fully wired client session layer.
pub struct ClientContext {
    pub client: BackendClient,
    pub storage: SharedStorage,
    pub navigator: Arc<RecordingNavigator>,
    pub cookies: Arc<reqwest::cookie::Jar>,
    pub storefront: String,
}

impl ClientContext {
    /// Wire a client over `storage`, with images served from `backend`.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn new(storage: SharedStorage, backend: &str, storefront: &str) -> Self {
        let cookies = Arc::new(reqwest::cookie::Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .build()
            .expect("Failed to create HTTP client");

        let session = SessionStore::new(Arc::clone(&storage));
        let images = Arc::new(ImageCacheRegistry::new(
            ImagePathResolver::new(backend),
            Arc::clone(&storage),
        ));
        let navigator = Arc::new(RecordingNavigator::default());
        let auth_errors = AuthErrorHandler::new(session.clone(), navigator.clone());
        let client =
            BackendClient::with_http(http, backend, storefront, session, auth_errors, images);

        Self {
            client,
            storage,
            navigator,
            cookies,
            storefront: storefront.to_string(),
        }
    }

    /// The `Cookie` header the jar would send to the storefront.
    ///
    /// # Panics
    ///
    /// Panics if the storefront origin is not a valid URL.
    #[must_use]
    pub fn cookie_header(&self) -> Option<String> {
        use reqwest::cookie::CookieStore;

        let url = self
            .storefront
            .parse::<reqwest::Url>()
            .expect("Invalid storefront origin");
        self.cookies
            .cookies(&url)
            .and_then(|value| value.to_str().ok().map(String::from))
    }
}
