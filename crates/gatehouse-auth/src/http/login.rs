//! Login initiation endpoint.
//!
//! `GET /auth/{provider}?redirect=<path>` answers 302 toward the provider's
//! authorization URL and sets the three transient cookies the callback needs.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::error::AuthError;

use super::{AuthState, cookies, found};

/// Query parameters for login initiation.
#[derive(Debug, Deserialize)]
pub struct LoginParams {
    /// Relative path to land on after the login completes.
    #[serde(default)]
    pub redirect: Option<String>,
}

/// GET /auth/{provider} handler.
pub async fn login_handler(
    State(state): State<AuthState>,
    Path(provider): Path<String>,
    Query(params): Query<LoginParams>,
    jar: CookieJar,
) -> Response {
    let redirect = params.redirect.as_deref().unwrap_or_default();

    match state.orchestrator.initiate(&provider, redirect) {
        Ok(login) => {
            let config = state.orchestrator.config();
            let jar = cookies::add_transient_cookies(
                jar,
                &login.transient,
                config.state.ttl,
                config.cookie.secure,
            );
            (jar, found(&login.authorization_url)).into_response()
        }
        Err(err @ AuthError::UnknownProvider { .. }) => {
            let available: Vec<&str> = state
                .orchestrator
                .providers()
                .list_configured()
                .iter()
                .map(|provider| provider.name.as_str())
                .collect();
            (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": err.to_string(),
                    "provider": provider,
                    "available": available,
                })),
            )
                .into_response()
        }
        Err(AuthError::ProviderMisconfigured {
            provider: name,
            message,
        }) => {
            // The validation detail stays in the server log
            error!(provider = %name, error = %message, "Provider misconfigured");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Provider is not configured",
                    "provider": name,
                    "details": "The provider is registered but missing credentials or endpoint URLs",
                })),
            )
                .into_response()
        }
        Err(other) => other.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::Value;
    use tower::ServiceExt;
    use url::Url;

    use crate::config::AuthConfig;
    use crate::http::{AuthState, auth_routes};
    use crate::orchestrator::AuthOrchestrator;
    use crate::provider::{ProviderConfig, ProviderRegistry};

    fn test_state() -> AuthState {
        let mut config = AuthConfig::default();
        config.token.secret = "0123456789abcdef0123456789abcdef".to_string();

        let mut registry = ProviderRegistry::with_defaults();
        registry.register(
            ProviderConfig::new("github")
                .with_display_name("GitHub")
                .with_authorize_url("https://github.com/login/oauth/authorize")
                .with_token_url("https://github.com/login/oauth/access_token")
                .with_user_api_url("https://api.github.com/user")
                .with_scope("read:user user:email")
                .with_credentials("client-id", "client-secret"),
        );

        AuthState::new(Arc::new(AuthOrchestrator::new(config, registry)))
    }

    fn set_cookie_values(response: &axum::response::Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|value| value.to_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_login_redirects_to_provider() {
        let app = auth_routes(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/github?redirect=/dashboard")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);

        let location = response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(location.starts_with("https://github.com/login/oauth/authorize"));

        let url = Url::parse(location).unwrap();
        let state = url
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.to_string())
            .unwrap();
        assert!(state.len() >= 36);

        let cookies = set_cookie_values(&response);
        assert_eq!(cookies.len(), 3);
        assert!(
            cookies
                .iter()
                .any(|cookie| cookie.starts_with("oauth_provider=github"))
        );
        assert!(
            cookies
                .iter()
                .any(|cookie| cookie.starts_with("oauth_redirect=%2Fdashboard"))
        );
        assert!(
            cookies
                .iter()
                .any(|cookie| cookie.starts_with(&format!("oauth_state={state}")))
        );
        for cookie in &cookies {
            assert!(cookie.contains("HttpOnly"));
            assert!(cookie.contains("SameSite=Lax"));
            assert!(cookie.contains("Path=/"));
            assert!(cookie.contains("Max-Age=600"));
        }
    }

    #[tokio::test]
    async fn test_login_without_redirect_uses_default() {
        let app = auth_routes(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/github")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        let cookies = set_cookie_values(&response);
        assert!(
            cookies
                .iter()
                .any(|cookie| cookie.starts_with("oauth_redirect=%2F;"))
        );
    }

    #[tokio::test]
    async fn test_login_unknown_provider() {
        let app = auth_routes(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/gitlab")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["provider"], "gitlab");
        assert!(json["error"].as_str().unwrap().contains("gitlab"));
        assert_eq!(json["available"], serde_json::json!(["github"]));
    }

    #[tokio::test]
    async fn test_login_unconfigured_provider() {
        // with_defaults registers google without credentials
        let app = auth_routes(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/google")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["provider"], "google");
        // Generic details only; validation specifics stay server-side
        assert!(!json["details"].as_str().unwrap().contains("clientId"));
    }

    #[tokio::test]
    async fn test_login_rejects_offsite_redirect() {
        let app = auth_routes(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/github?redirect=https://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        let cookies = set_cookie_values(&response);
        assert!(
            cookies
                .iter()
                .any(|cookie| cookie.starts_with("oauth_redirect=%2F;"))
        );
    }
}
