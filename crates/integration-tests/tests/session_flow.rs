//! End-to-end tests for the client session layer against a live storefront
//! and a fake backend.

use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;

use kicks_core::{LocalStorage, ProductId, keys};
use kicks_integration_tests::{
    ClientContext, PASSWORD, SHOPPER_TOKEN, spawn_backend, spawn_storefront,
};
use kicks_storefront::client::{ApiError, ImageCacheRegistry, ImagePathResolver};
use kicks_storefront::storage::{FileStorage, MemoryStorage, SharedStorage};

async fn context(storage: SharedStorage) -> ClientContext {
    let backend = spawn_backend().await;
    let storefront = spawn_storefront().await;
    ClientContext::new(storage, &backend, &storefront)
}

#[tokio::test]
async fn test_login_stores_session_and_sets_cookies() {
    let ctx = context(MemoryStorage::shared()).await;

    let user = ctx
        .client
        .login("bob@example.com", PASSWORD)
        .await
        .expect("Login failed");

    assert_eq!(user.id.as_str(), "u-bob");
    assert_eq!(user.access_token, SHOPPER_TOKEN);
    assert_eq!(user.token, SHOPPER_TOKEN);
    assert!(ctx.client.session().is_valid());

    let cookies = ctx.cookie_header().expect("No cookies stored");
    assert!(cookies.contains("accessToken=shopper-token"));
    assert!(cookies.contains("userInfo="));
}

#[tokio::test]
async fn test_failed_login_leaves_session_anonymous() {
    let ctx = context(MemoryStorage::shared()).await;

    let err = ctx
        .client
        .login("bob@example.com", "wrong")
        .await
        .expect_err("Login should fail");

    assert_eq!(err.status(), Some(401));
    assert!(!ctx.client.session().is_valid());
    assert!(ctx.cookie_header().is_none());
    // Login is not an authorized call, so no redirect happens.
    assert!(ctx.navigator.visits().is_empty());
}

#[tokio::test]
async fn test_authorized_call_uses_bearer_token() {
    let ctx = context(MemoryStorage::shared()).await;
    ctx.client
        .login("bob@example.com", PASSWORD)
        .await
        .expect("Login failed");

    let orders: Vec<Value> = ctx
        .client
        .get_json("/api/orders/mine")
        .await
        .expect("Orders request failed");

    assert_eq!(orders.len(), 1);
    assert!(ctx.navigator.visits().is_empty());
}

#[tokio::test]
async fn test_forbidden_call_tears_down_session() {
    let ctx = context(MemoryStorage::shared()).await;
    ctx.client
        .login("bob@example.com", PASSWORD)
        .await
        .expect("Login failed");
    ctx.storage
        .set_item(keys::CART, r#"[{"product":"7","qty":1}]"#)
        .expect("Failed to seed cart");
    ctx.storage
        .set_item(keys::FAVORITES, r#"["7"]"#)
        .expect("Failed to seed favorites");
    ctx.client.set_location("/admin/products/7/edit");

    let err = ctx
        .client
        .update_product_image(&ProductId::new("7"), "/uploads/new.png")
        .await
        .expect_err("Shopper must not update products");

    assert!(matches!(err, ApiError::Status { status: 403, .. }));
    assert!(!ctx.client.session().is_valid());
    assert!(ctx.cookie_header().is_none(), "auth cookies should be expired");
    for key in [keys::USER_INFO, keys::CART, keys::FAVORITES] {
        assert!(
            ctx.storage.get_item(key).expect("Storage read failed").is_none(),
            "{key} should be cleared"
        );
    }
    assert_eq!(
        ctx.navigator.visits(),
        ["/login?redirect=%2Fadmin%2Fproducts%2F7%2Fedit"]
    );
    assert!(ctx.client.images().peek(&ProductId::new("7")).is_none());
}

#[tokio::test]
async fn test_call_without_session_redirects_to_login() {
    let ctx = context(MemoryStorage::shared()).await;
    ctx.client.set_location("/orders");

    let err = ctx
        .client
        .get_json::<Value>("/api/orders/mine")
        .await
        .expect_err("Anonymous call should fail");

    assert!(matches!(err, ApiError::NotAuthenticated));
    assert_eq!(ctx.navigator.visits(), ["/login?redirect=%2Forders"]);
}

#[tokio::test]
async fn test_image_update_bumps_url_version() {
    let ctx = context(MemoryStorage::shared()).await;
    ctx.client
        .login("ada@example.com", PASSWORD)
        .await
        .expect("Login failed");

    let product = ProductId::new("42");
    let before = ctx.client.image_url("shoe.png", &product, None);

    let freshness = ctx
        .client
        .update_product_image(&product, "/uploads/shoe.png")
        .await
        .expect("Image update failed");

    let after = ctx.client.image_url("shoe.png", &product, None);
    assert!(after.ends_with(&format!("/uploads/shoe.png?v={freshness}")));
    assert!(freshness.as_millis() >= version(&before));
    assert_eq!(ctx.client.images().peek(&product), Some(freshness));
}

#[tokio::test]
async fn test_non_auth_failure_keeps_session() {
    let ctx = context(MemoryStorage::shared()).await;
    ctx.client
        .login("bob@example.com", PASSWORD)
        .await
        .expect("Login failed");

    let err = ctx
        .client
        .send_json::<_, Value>(Method::POST, "/api/orders/mine", &serde_json::json!({}))
        .await
        .expect_err("POST is not routed");

    assert_eq!(err.status(), Some(405));
    assert!(ctx.client.session().is_valid());
    assert!(ctx.navigator.visits().is_empty());
}

#[tokio::test]
async fn test_logout_clears_local_state_and_cookies() {
    let ctx = context(MemoryStorage::shared()).await;
    ctx.client
        .login("ada@example.com", PASSWORD)
        .await
        .expect("Login failed");
    ctx.client.images().touch(&ProductId::new("1"));

    ctx.client.logout().await.expect("Logout failed");

    assert!(!ctx.client.session().is_valid());
    assert!(ctx.client.session().current_user().is_none());
    assert!(ctx.client.images().peek(&ProductId::new("1")).is_none());
    assert!(ctx.cookie_header().is_none());

    // A second logout is harmless.
    ctx.client.logout().await.expect("Second logout failed");
}

#[tokio::test]
async fn test_file_storage_shares_state_across_contexts() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("local-storage.json");

    let first: SharedStorage = Arc::new(FileStorage::new(&path));
    let ctx = context(Arc::clone(&first)).await;
    ctx.client
        .login("ada@example.com", PASSWORD)
        .await
        .expect("Login failed");
    let stamp = ctx.client.images().touch(&ProductId::new("9"));

    // A second context over the same file sees the same session and stamp.
    let second: SharedStorage = Arc::new(FileStorage::new(&path));
    let registry = ImageCacheRegistry::new(
        ImagePathResolver::new("http://cdn.kicks.test"),
        Arc::clone(&second),
    );
    assert_eq!(registry.peek(&ProductId::new("9")), Some(stamp));
    assert_eq!(
        registry.build_url("a.png", &ProductId::new("9"), None),
        format!("http://cdn.kicks.test/uploads/a.png?v={stamp}")
    );
    assert!(second.get_item(keys::USER_INFO).expect("read").is_some());
}

fn version(url: &str) -> i64 {
    url.rsplit_once("v=")
        .and_then(|(_, v)| v.parse().ok())
        .expect("URL has no version")
}
