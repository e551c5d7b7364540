//! Cookie bridge route handlers.
//!
//! The client layer persists its session locally; these endpoints mirror it
//! into the durable cookie pair (`accessToken`, `userInfo`) so server-rendered
//! requests see the same login.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use kicks_core::{SessionRecord, UserId};

use crate::error::{AppError, Result};
use crate::middleware::append_cookie;
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Body of `POST /api/auth/set-cookie`.
#[derive(Default, Serialize, Deserialize)]
pub struct SetCookieRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SetCookieUser>,
}

/// Display info stored in the `userInfo` cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCookieUser {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl From<&SessionRecord> for SetCookieUser {
    fn from(record: &SessionRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            email: record.email.clone(),
            is_admin: record.is_admin,
        }
    }
}

/// `{"success": true}`
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    const OK: Self = Self { success: true };
}

// =============================================================================
// Handlers
// =============================================================================

/// Set the durable cookie pair from a freshly issued token.
///
/// The body is parsed leniently: an unparseable body is treated the same as
/// one without a token.
pub async fn set_cookie(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let request: SetCookieRequest = serde_json::from_slice(&body).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Unparseable set-cookie body");
        SetCookieRequest::default()
    });

    let token = request
        .token
        .filter(|token| !token.is_empty())
        .map(SecretString::from)
        .ok_or_else(|| AppError::BadRequest("Token is required".to_string()))?;

    let policy = state.cookies();
    let mut headers = HeaderMap::new();

    append_cookie(&mut headers, &policy.access_cookie(&token)).map_err(set_failed)?;
    if let Some(user) = &request.user {
        let cookie = policy.display_cookie(user).map_err(set_failed)?;
        append_cookie(&mut headers, &cookie).map_err(set_failed)?;
        tracing::info!(user_id = %user.id, "Auth cookies set");
    } else {
        tracing::info!("Access cookie set");
    }

    Ok((headers, Json(SuccessResponse::OK)).into_response())
}

/// Expire both auth cookies. Succeeds whether or not they were present.
pub async fn logout(State(state): State<AppState>) -> Result<Response> {
    let mut headers = HeaderMap::new();
    for cookie in state.cookies().expired_pair() {
        append_cookie(&mut headers, &cookie).map_err(|source| AppError::CookieStore {
            public_message: "Failed to logout",
            source,
        })?;
    }

    tracing::info!("Auth cookies cleared");
    Ok((headers, Json(SuccessResponse::OK)).into_response())
}

fn set_failed(source: crate::middleware::CookieError) -> AppError {
    AppError::CookieStore {
        public_message: "Failed to set cookie",
        source,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header::SET_COOKIE},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::config::StorefrontConfig;

    fn app(production: bool) -> Router {
        let env = if production { "production" } else { "test" };
        let config = StorefrontConfig::from_lookup(|key| match key {
            "STOREFRONT_BASE_URL" => Some("https://kicks.test".to_string()),
            "STOREFRONT_ENV" => Some(env.to_string()),
            _ => None,
        })
        .unwrap();
        crate::routes::api_routes().with_state(AppState::new(config))
    }

    async fn post(app: Router, uri: &str, body: &str) -> (StatusCode, Vec<String>, serde_json::Value) {
        let response = app
            .oneshot(
                Request::post(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, cookies, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_set_cookie_requires_token() {
        for body in ["{}", r#"{"token":""}"#, r#"{"token":null}"#, "not json", ""] {
            let (status, cookies, json) = post(app(false), "/auth/set-cookie", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(json["error"], "Token is required");
            assert!(cookies.is_empty());
        }
    }

    #[tokio::test]
    async fn test_set_cookie_token_only() {
        let (status, cookies, json) =
            post(app(false), "/auth/set-cookie", r#"{"token":"abc.def"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].starts_with("accessToken=abc.def"));
        assert!(cookies[0].contains("HttpOnly"));
        assert!(cookies[0].contains("SameSite=Strict"));
        assert!(cookies[0].contains("Max-Age=2592000"));
        assert!(!cookies[0].contains("Secure"));
    }

    #[tokio::test]
    async fn test_set_cookie_with_user_in_production() {
        let body = r#"{"token":"abc","user":{"id":"u1","name":"Ada","email":"ada@example.com","isAdmin":false}}"#;
        let (status, cookies, _) = post(app(true), "/auth/set-cookie", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| c.contains("Secure")));

        let display = cookies.iter().find(|c| c.starts_with("userInfo=")).unwrap();
        assert!(!display.contains("HttpOnly"));
        let value = display
            .trim_start_matches("userInfo=")
            .split(';')
            .next()
            .unwrap();
        let user: SetCookieUser =
            serde_json::from_str(&urlencoding::decode(value).unwrap()).unwrap();
        assert_eq!(user.id.as_str(), "u1");
        assert_eq!(user.name, "Ada");
    }

    #[tokio::test]
    async fn test_set_cookie_store_failure() {
        let body = serde_json::json!({"token": "t".repeat(5000)}).to_string();
        let (status, cookies, json) = post(app(false), "/auth/set-cookie", &body).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Failed to set cookie");
        assert!(cookies.is_empty());
    }

    #[tokio::test]
    async fn test_set_cookie_token_cannot_inject_attributes() {
        let body = r#"{"token":"abc; Domain=evil.example; SameSite=None"}"#;
        let (status, cookies, _) = post(app(true), "/auth/set-cookie", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(cookies.len(), 1);
        let access = &cookies[0];
        assert!(access.starts_with("accessToken=abc%3B%20Domain%3Devil.example%3B%20SameSite%3DNone;"));
        assert!(!access.contains("Domain="));
        assert_eq!(access.matches("SameSite=").count(), 1);
        assert!(access.contains("SameSite=Strict"));
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        for _ in 0..2 {
            let (status, cookies, json) = post(app(false), "/auth/logout", "").await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(json["success"], true);
            assert_eq!(cookies.len(), 2);
            assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
            assert!(cookies.iter().any(|c| c.starts_with("accessToken=")));
            assert!(cookies.iter().any(|c| c.starts_with("userInfo=")));
        }
    }

    #[tokio::test]
    async fn test_logout_in_production_keeps_cookie_policy() {
        let (status, cookies, json) = post(app(true), "/auth/logout", "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(cookies.len(), 2);
        for cookie in &cookies {
            assert!(cookie.contains("Secure"), "{cookie}");
            assert!(cookie.contains("SameSite=Strict"), "{cookie}");
            assert!(cookie.contains("Path=/"), "{cookie}");
            assert!(cookie.contains("Max-Age=0"), "{cookie}");
        }
        let access = cookies.iter().find(|c| c.starts_with("accessToken=")).unwrap();
        assert!(access.contains("HttpOnly"));
        let display = cookies.iter().find(|c| c.starts_with("userInfo=")).unwrap();
        assert!(!display.contains("HttpOnly"));
    }

    #[test]
    fn test_set_cookie_user_from_record() {
        let record = SessionRecord {
            id: UserId::new("u9"),
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
            is_admin: true,
            access_token: "t".to_string(),
            refresh_token: None,
        };
        let user = SetCookieUser::from(&record);
        assert_eq!(
            serde_json::to_value(&user).unwrap(),
            serde_json::json!({"id": "u9", "name": "Grace", "email": "grace@example.com", "isAdmin": true})
        );
    }
}
