//! OAuth2 authorization-code flow coordinator.
//!
//! Two stateless halves: [`OAuthFlowCoordinator::initiate`] produces the
//! provider redirect plus the transient triple the client carries, and
//! [`OAuthFlowCoordinator::callback`] validates the round trip, exchanges the
//! authorization code, and maps the provider profile to an [`AppUser`].
//! Session creation and token issuance happen above this layer.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::state::{TransientLoginState, sanitize_redirect};
use crate::provider::{AppUser, ProviderConfig, ProviderRegistry};

/// Outbound call timeout for token exchange and user fetch.
///
/// A hung provider must not pin request handlers, so every outbound call is
/// bounded.
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of [`OAuthFlowCoordinator::initiate`].
#[derive(Debug, Clone)]
pub struct InitiatedLogin {
    /// Fully built provider authorization URL to redirect the user agent to.
    pub authorization_url: String,

    /// The triple the client must carry to the callback.
    pub transient: TransientLoginState,
}

/// Query parameters received at the callback endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CallbackParams {
    /// Authorization code issued by the provider.
    pub code: Option<String>,

    /// State echoed back by the provider.
    pub state: Option<String>,

    /// Error code reported by the provider (e.g. `access_denied`).
    pub error: Option<String>,
}

/// Result of a successful [`OAuthFlowCoordinator::callback`].
#[derive(Debug, Clone)]
pub struct CallbackOutcome {
    /// The resolved application user.
    pub user: AppUser,

    /// Post-login redirect target carried from `initiate`.
    pub redirect_target: String,
}

/// Successful token-endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
}

/// Error-shaped token-endpoint response.
#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Coordinates the OAuth2 authorization-code round trip with a provider.
#[derive(Debug, Clone)]
pub struct OAuthFlowCoordinator {
    registry: Arc<ProviderRegistry>,
    http: reqwest::Client,
    public_url: String,
    default_redirect: String,
}

impl OAuthFlowCoordinator {
    /// Creates a new coordinator over the given provider registry.
    #[must_use]
    pub fn new(registry: Arc<ProviderRegistry>, config: &AuthConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .user_agent(concat!("gatehouse/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            registry,
            http,
            public_url: config.public_url.trim_end_matches('/').to_string(),
            default_redirect: config.post_login_redirect.clone(),
        }
    }

    /// Returns the provider registry backing this coordinator.
    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Returns the callback URL providers redirect back to.
    #[must_use]
    pub fn callback_url(&self) -> String {
        format!("{}/auth/callback", self.public_url)
    }

    /// Starts a login flow against the named provider.
    ///
    /// Generates a fresh CSRF state token and builds the authorization URL.
    /// The returned triple must be round-tripped to [`Self::callback`] by the
    /// caller; the coordinator itself holds nothing.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnknownProvider`] if the provider is not
    /// registered, or [`AuthError::ProviderMisconfigured`] if its
    /// configuration fails validation.
    pub fn initiate(
        &self,
        provider: &str,
        redirect_target: &str,
    ) -> Result<InitiatedLogin, AuthError> {
        let config = self.registry.get(provider)?;

        let errors = config.validation_errors();
        if !errors.is_empty() {
            return Err(AuthError::provider_misconfigured(
                provider,
                errors.join("; "),
            ));
        }

        let transient = TransientLoginState::new(
            provider,
            sanitize_redirect(redirect_target, &self.default_redirect),
        );
        let authorization_url =
            self.build_authorization_url(config, transient.state.as_str())?;

        debug!(provider, redirect = %transient.redirect, "Initiated OAuth login flow");

        Ok(InitiatedLogin {
            authorization_url,
            transient,
        })
    }

    fn build_authorization_url(
        &self,
        config: &ProviderConfig,
        state: &str,
    ) -> Result<String, AuthError> {
        let mut url = Url::parse(&config.authorize_url).map_err(|e| {
            AuthError::provider_misconfigured(
                &config.name,
                format!("invalid authorize_url: {e}"),
            )
        })?;

        {
            let mut params = url.query_pairs_mut();
            params.append_pair("client_id", &config.client_id);
            params.append_pair("redirect_uri", &self.callback_url());
            params.append_pair("scope", &config.scope);
            params.append_pair("state", state);
            params.append_pair("response_type", "code");
        }

        Ok(url.to_string())
    }

    /// Completes a login flow from the provider redirect.
    ///
    /// Applies the callback checks in order, terminal on first failure:
    /// provider-reported error, missing parameters, state mismatch, unknown
    /// carried provider, code exchange, user fetch, profile mapping. The
    /// caller clears the carried state afterwards regardless of outcome.
    ///
    /// # Errors
    ///
    /// Returns the error matching the first failed check; see [`AuthError`].
    pub async fn callback(
        &self,
        params: &CallbackParams,
        carried: Option<&TransientLoginState>,
    ) -> Result<CallbackOutcome, AuthError> {
        if let Some(error) = params.error.as_deref().filter(|e| !e.is_empty()) {
            return Err(AuthError::provider_denied(error));
        }

        let code = params.code.as_deref().filter(|v| !v.is_empty());
        let state = params.state.as_deref().filter(|v| !v.is_empty());
        let (code, state) = match (code, state) {
            (Some(code), Some(state)) => (code, state),
            _ => {
                return Err(AuthError::missing_parameters(
                    "code and state are required",
                ));
            }
        };

        // A missing carried state rejects the same way as a mismatching one
        let carried = carried.ok_or(AuthError::StateMismatch)?;
        carried.validate_returned(state)?;

        let config = self.registry.get(&carried.provider)?;

        let access_token = self.exchange_code(config, code).await?;
        let profile = self.fetch_user(config, &access_token).await?;
        let user = AppUser::from_provider_profile(&config.name, &profile);

        debug!(provider = %config.name, user = %user.id, "OAuth callback completed");

        Ok(CallbackOutcome {
            user,
            redirect_target: carried.redirect.clone(),
        })
    }

    /// Exchanges an authorization code for an access token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenExchangeFailed`] on transport errors,
    /// non-success responses, or a response without an `access_token`.
    pub async fn exchange_code(
        &self,
        config: &ProviderConfig,
        code: &str,
    ) -> Result<String, AuthError> {
        debug!(provider = %config.name, "Exchanging authorization code");

        let redirect_uri = self.callback_url();
        let params = [
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http
            .post(&config.token_url)
            // GitHub answers with form encoding unless JSON is requested
            .header(header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::token_exchange_failed(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if let Ok(oauth_error) = serde_json::from_str::<OAuthErrorResponse>(&body) {
                return Err(AuthError::token_exchange_failed(format!(
                    "{} - {}",
                    oauth_error.error,
                    oauth_error.error_description.unwrap_or_default()
                )));
            }
            return Err(AuthError::token_exchange_failed(format!(
                "HTTP {status} - {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::token_exchange_failed(format!("invalid response body: {e}")))?;

        if token.access_token.is_empty() {
            return Err(AuthError::token_exchange_failed(
                "response did not include an access token",
            ));
        }

        Ok(token.access_token)
    }

    /// Fetches the raw user profile from the provider.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UserFetchFailed`] on transport errors, non-success
    /// responses, or an unparseable body.
    pub async fn fetch_user(
        &self,
        config: &ProviderConfig,
        access_token: &str,
    ) -> Result<serde_json::Value, AuthError> {
        debug!(provider = %config.name, "Fetching user profile");

        let response = self
            .http
            .get(&config.user_api_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::user_fetch_failed(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::user_fetch_failed(format!("HTTP {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::user_fetch_failed(format!("invalid response body: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::state::StateToken;
    use serde_json::json;
    use wiremock::matchers::{bearer_token, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn coordinator_with(registry: ProviderRegistry) -> OAuthFlowCoordinator {
        let config = AuthConfig::default();
        OAuthFlowCoordinator::new(Arc::new(registry), &config)
    }

    fn configured_github() -> ProviderRegistry {
        let mut registry = ProviderRegistry::with_defaults();
        let github = registry.get("github").unwrap().clone();
        registry.register(github.with_credentials("test-client-id", "test-client-secret"));
        registry
    }

    /// Registry whose github entry points at a local mock provider.
    fn mock_github(server: &MockServer) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        registry.register(
            ProviderConfig::new("github")
                .with_display_name("GitHub")
                .with_authorize_url("https://github.com/login/oauth/authorize")
                .with_token_url(format!("{}/login/oauth/access_token", server.uri()))
                .with_user_api_url(format!("{}/user", server.uri()))
                .with_scope("read:user user:email")
                .with_credentials("test-client-id", "test-client-secret"),
        );
        registry
    }

    fn carried(state: &str) -> TransientLoginState {
        TransientLoginState {
            state: StateToken::from_value(state),
            provider: "github".to_string(),
            redirect: "/dashboard".to_string(),
        }
    }

    fn callback_params(code: &str, state: &str) -> CallbackParams {
        CallbackParams {
            code: Some(code.to_string()),
            state: Some(state.to_string()),
            error: None,
        }
    }

    #[test]
    fn test_initiate_builds_authorization_url() {
        let coordinator = coordinator_with(configured_github());
        let login = coordinator.initiate("github", "/dashboard").unwrap();

        assert!(
            login
                .authorization_url
                .starts_with("https://github.com/login/oauth/authorize?")
        );

        let url = Url::parse(&login.authorization_url).unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(pairs.contains(&(
            "client_id".to_string(),
            "test-client-id".to_string()
        )));
        assert!(pairs.contains(&(
            "redirect_uri".to_string(),
            "http://localhost:8080/auth/callback".to_string()
        )));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));

        let state = pairs
            .iter()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.clone())
            .unwrap();
        assert!(state.len() >= 36);
        assert_eq!(state, login.transient.state.as_str());
        assert_eq!(login.transient.provider, "github");
        assert_eq!(login.transient.redirect, "/dashboard");
    }

    #[test]
    fn test_initiate_unknown_provider() {
        let coordinator = coordinator_with(configured_github());
        let err = coordinator.initiate("gitlab", "/").unwrap_err();
        assert!(matches!(err, AuthError::UnknownProvider { .. }));
    }

    #[test]
    fn test_initiate_unconfigured_provider() {
        // Defaults have no credentials
        let coordinator = coordinator_with(ProviderRegistry::with_defaults());
        let err = coordinator.initiate("github", "/").unwrap_err();
        assert!(matches!(err, AuthError::ProviderMisconfigured { .. }));
    }

    #[test]
    fn test_initiate_rejects_offsite_redirect() {
        let coordinator = coordinator_with(configured_github());
        let login = coordinator
            .initiate("github", "https://evil.example.com")
            .unwrap();
        assert_eq!(login.transient.redirect, "/");
    }

    #[tokio::test]
    async fn test_callback_provider_error() {
        let coordinator = coordinator_with(configured_github());
        let params = CallbackParams {
            error: Some("access_denied".to_string()),
            ..CallbackParams::default()
        };

        let err = coordinator.callback(&params, None).await.unwrap_err();
        assert!(matches!(err, AuthError::ProviderDenied { code } if code == "access_denied"));
    }

    #[tokio::test]
    async fn test_callback_missing_parameters() {
        let coordinator = coordinator_with(configured_github());
        let carried_state = carried("expected");

        for params in [
            CallbackParams::default(),
            CallbackParams {
                code: Some("abc".to_string()),
                ..CallbackParams::default()
            },
            CallbackParams {
                state: Some("expected".to_string()),
                ..CallbackParams::default()
            },
            callback_params("", "expected"),
        ] {
            let err = coordinator
                .callback(&params, Some(&carried_state))
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::MissingParameters { .. }));
        }
    }

    #[tokio::test]
    async fn test_callback_state_mismatch() {
        let coordinator = coordinator_with(configured_github());
        let carried_state = carried("expected-state");

        let err = coordinator
            .callback(
                &callback_params("some-code", "different-state"),
                Some(&carried_state),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::StateMismatch));
    }

    #[tokio::test]
    async fn test_callback_missing_carried_state() {
        let coordinator = coordinator_with(configured_github());
        let err = coordinator
            .callback(&callback_params("some-code", "some-state"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::StateMismatch));
    }

    #[tokio::test]
    async fn test_callback_unknown_carried_provider() {
        let coordinator = coordinator_with(configured_github());
        let carried_state = TransientLoginState {
            state: StateToken::from_value("expected"),
            provider: "gitlab".to_string(),
            redirect: "/".to_string(),
        };

        let err = coordinator
            .callback(&callback_params("some-code", "expected"), Some(&carried_state))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UnknownProvider { .. }));
    }

    #[tokio::test]
    async fn test_callback_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=test-code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "gho_test_token",
                "token_type": "bearer",
                "scope": "read:user"
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/user"))
            .and(bearer_token("gho_test_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 583231,
                "login": "octocat",
                "name": "The Octocat",
                "email": "octocat@github.com",
                "avatar_url": "https://avatars.githubusercontent.com/u/583231"
            })))
            .mount(&mock_server)
            .await;

        let coordinator = coordinator_with(mock_github(&mock_server));
        let outcome = coordinator
            .callback(
                &callback_params("test-code", "expected-state"),
                Some(&carried("expected-state")),
            )
            .await
            .unwrap();

        assert_eq!(outcome.user.id, "github:583231");
        assert_eq!(outcome.user.display_name, "The Octocat");
        assert_eq!(outcome.redirect_target, "/dashboard");
    }

    #[tokio::test]
    async fn test_callback_token_exchange_rejected() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "bad_verification_code",
                "error_description": "The code passed is incorrect or expired."
            })))
            .mount(&mock_server)
            .await;

        let coordinator = coordinator_with(mock_github(&mock_server));
        let err = coordinator
            .callback(
                &callback_params("stale-code", "expected-state"),
                Some(&carried("expected-state")),
            )
            .await
            .unwrap_err();

        assert!(
            matches!(err, AuthError::TokenExchangeFailed { ref message } if message.contains("bad_verification_code"))
        );
    }

    #[tokio::test]
    async fn test_callback_token_response_without_access_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"token_type": "bearer"})),
            )
            .mount(&mock_server)
            .await;

        let coordinator = coordinator_with(mock_github(&mock_server));
        let err = coordinator
            .callback(
                &callback_params("test-code", "expected-state"),
                Some(&carried("expected-state")),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::TokenExchangeFailed { .. }));
    }

    #[tokio::test]
    async fn test_callback_user_fetch_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "gho_test_token"
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let coordinator = coordinator_with(mock_github(&mock_server));
        let err = coordinator
            .callback(
                &callback_params("test-code", "expected-state"),
                Some(&carried("expected-state")),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::UserFetchFailed { .. }));
    }
}
