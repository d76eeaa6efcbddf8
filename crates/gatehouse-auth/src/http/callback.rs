//! OAuth callback endpoint.
//!
//! `GET /auth/callback?code=&state=&error=` closes the provider round trip:
//! it rebuilds the carried login state from the transient cookies, runs the
//! callback state machine, and answers with a 302 in every case. Failures
//! land on `/?error=<reason>` with a stable reason code and nothing else.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use tracing::warn;

use crate::oauth::CallbackParams;
use crate::orchestrator::LoginCompletion;

use super::{AuthState, client_metadata, cookies, found};

/// GET /auth/callback handler.
pub async fn callback_handler(
    State(state): State<AuthState>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    let carried = cookies::read_transient_state(&jar);
    let metadata = client_metadata(&headers);
    let config = state.orchestrator.config();

    let result = state
        .orchestrator
        .complete_login(&params, carried.as_ref(), metadata)
        .await;

    // The transient cookies are single-use whatever the outcome
    let jar = cookies::clear_transient_cookies(jar);

    match result {
        Ok(LoginCompletion::SignedIn {
            token,
            redirect_target,
            ..
        }) => {
            let jar = jar.add(cookies::session_cookie(
                &config.cookie,
                &token,
                config.token.ttl,
            ));
            (jar, found(&redirect_target)).into_response()
        }
        Ok(LoginCompletion::MfaRequired {
            challenge_token,
            redirect_target,
            ..
        }) => {
            let jar = jar.add(cookies::challenge_cookie(
                &challenge_token,
                config.mfa.challenge_ttl,
                config.cookie.secure,
            ));
            let query: String = url::form_urlencoded::Serializer::new(String::new())
                .append_pair("redirect", &redirect_target)
                .finish();
            (jar, found(&format!("/mfa?{query}"))).into_response()
        }
        Err(err) => {
            warn!(error = %err, "Login callback failed");
            let query: String = url::form_urlencoded::Serializer::new(String::new())
                .append_pair("error", err.redirect_code())
                .finish();
            (jar, found(&format!("/?{query}"))).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::config::AuthConfig;
    use crate::http::{AuthState, auth_routes};
    use crate::orchestrator::AuthOrchestrator;
    use crate::provider::{ProviderConfig, ProviderRegistry};

    const CARRIED_COOKIES: &str =
        "oauth_state=expected-state; oauth_provider=github; oauth_redirect=%2Fdashboard";

    fn test_state(server: &MockServer) -> AuthState {
        let mut config = AuthConfig::default();
        config.token.secret = "0123456789abcdef0123456789abcdef".to_string();

        let mut registry = ProviderRegistry::new();
        registry.register(
            ProviderConfig::new("github")
                .with_display_name("GitHub")
                .with_authorize_url("https://github.com/login/oauth/authorize")
                .with_token_url(format!("{}/login/oauth/access_token", server.uri()))
                .with_user_api_url(format!("{}/user", server.uri()))
                .with_scope("read:user")
                .with_credentials("client-id", "client-secret"),
        );

        AuthState::new(Arc::new(AuthOrchestrator::new(config, registry)))
    }

    async fn mount_happy_provider(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "gho_test_token"
            })))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 583231,
                "login": "octocat",
                "name": "The Octocat"
            })))
            .mount(server)
            .await;
    }

    async fn get(app: axum::Router, uri: &str, cookies: Option<&str>) -> axum::response::Response {
        let mut request = Request::builder().uri(uri);
        if let Some(cookies) = cookies {
            request = request.header(header::COOKIE, cookies);
        }
        app.oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    fn location(response: &axum::response::Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
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
    async fn test_callback_success_sets_auth_cookie() {
        let server = MockServer::start().await;
        mount_happy_provider(&server).await;
        let state = test_state(&server);
        let app = auth_routes(state.clone());

        let response = get(
            app,
            "/auth/callback?code=test-code&state=expected-state",
            Some(CARRIED_COOKIES),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/dashboard");

        let cookies = set_cookie_values(&response);
        let session_cookie = cookies
            .iter()
            .find(|cookie| cookie.starts_with("gatehouse_session="))
            .expect("auth cookie set");
        assert!(session_cookie.contains("HttpOnly"));
        assert!(session_cookie.contains("SameSite=Lax"));

        // The issued token authenticates against the same orchestrator
        let token = session_cookie
            .split(';')
            .next()
            .unwrap()
            .split_once('=')
            .unwrap()
            .1
            .to_string();
        let authenticated = state.orchestrator.authenticate(&token).unwrap();
        assert_eq!(authenticated.claims.sub, "github:583231");

        // Transient cookies are cleared
        assert!(
            cookies
                .iter()
                .any(|cookie| cookie.starts_with("oauth_state=") && cookie.contains("Max-Age=0"))
        );
        assert!(
            cookies
                .iter()
                .any(|cookie| cookie.starts_with("oauth_provider=") && cookie.contains("Max-Age=0"))
        );
        assert!(
            cookies
                .iter()
                .any(|cookie| cookie.starts_with("oauth_redirect=") && cookie.contains("Max-Age=0"))
        );
    }

    #[tokio::test]
    async fn test_callback_provider_error_redirects_with_reason() {
        let server = MockServer::start().await;
        let app = auth_routes(test_state(&server));

        let response = get(
            app,
            "/auth/callback?error=access_denied",
            Some(CARRIED_COOKIES),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/?error=access_denied");
        assert!(
            !set_cookie_values(&response)
                .iter()
                .any(|cookie| cookie.starts_with("gatehouse_session="))
        );
    }

    #[tokio::test]
    async fn test_callback_missing_parameters() {
        let server = MockServer::start().await;
        let app = auth_routes(test_state(&server));

        let response = get(app, "/auth/callback", Some(CARRIED_COOKIES)).await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/?error=missing_parameters");
    }

    #[tokio::test]
    async fn test_callback_state_mismatch() {
        let server = MockServer::start().await;
        let app = auth_routes(test_state(&server));

        let response = get(
            app,
            "/auth/callback?code=test-code&state=tampered",
            Some(CARRIED_COOKIES),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/?error=state_mismatch");
    }

    #[tokio::test]
    async fn test_callback_without_cookies() {
        let server = MockServer::start().await;
        let app = auth_routes(test_state(&server));

        let response = get(
            app,
            "/auth/callback?code=test-code&state=expected-state",
            None,
        )
        .await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/?error=state_mismatch");
    }

    #[tokio::test]
    async fn test_callback_unknown_carried_provider() {
        let server = MockServer::start().await;
        let app = auth_routes(test_state(&server));

        let response = get(
            app,
            "/auth/callback?code=test-code&state=expected-state",
            Some("oauth_state=expected-state; oauth_provider=gitlab; oauth_redirect=%2F"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/?error=missing_provider");
    }

    #[tokio::test]
    async fn test_callback_mfa_required_defers_session() {
        let server = MockServer::start().await;
        mount_happy_provider(&server).await;
        let state = test_state(&server);
        let app = auth_routes(state.clone());

        let enrollment = state
            .orchestrator
            .mfa()
            .begin_enrollment("github:583231", "octocat")
            .unwrap();
        let secret = totp_rs::Secret::Encoded(enrollment.secret.clone())
            .to_bytes()
            .unwrap();
        let totp = totp_rs::TOTP::new(
            totp_rs::Algorithm::SHA1,
            6,
            1,
            30,
            secret,
            Some("Gatehouse".to_string()),
            "user".to_string(),
        )
        .unwrap();
        state
            .orchestrator
            .mfa()
            .confirm_enrollment("github:583231", &totp.generate_current().unwrap())
            .unwrap();

        let response = get(
            app,
            "/auth/callback?code=test-code&state=expected-state",
            Some(CARRIED_COOKIES),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/mfa?redirect=%2Fdashboard");

        let cookies = set_cookie_values(&response);
        assert!(
            cookies
                .iter()
                .any(|cookie| cookie.starts_with("gatehouse_mfa=") && cookie.contains("HttpOnly"))
        );
        assert!(
            !cookies
                .iter()
                .any(|cookie| cookie.starts_with("gatehouse_session="))
        );
        assert!(state.orchestrator.sessions().is_empty());
    }
}
