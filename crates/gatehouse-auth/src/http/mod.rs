//! HTTP handlers for the authentication endpoints.
//!
//! # Routes
//!
//! - `GET /auth/{provider}` - start a login flow
//! - `GET /auth/callback` - provider redirect target
//! - `POST /auth/logout` / `GET /auth/logout` - end the session
//! - `GET /auth/providers` - provider listing for login UIs
//! - `POST /auth/mfa/*`, `GET /auth/mfa/status` - second-factor management

pub mod callback;
pub mod cookies;
pub mod login;
pub mod logout;
pub mod mfa;
pub mod providers;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum_extra::extract::CookieJar;

use crate::orchestrator::AuthOrchestrator;
use crate::session::SessionMetadata;

/// Shared state for the auth handlers.
#[derive(Clone)]
pub struct AuthState {
    /// The wired-up authentication subsystem.
    pub orchestrator: Arc<AuthOrchestrator>,
}

impl AuthState {
    /// Creates handler state around an orchestrator.
    #[must_use]
    pub fn new(orchestrator: Arc<AuthOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

/// Creates the auth route tree.
///
/// Static segments win over the `{provider}` capture, so `callback`,
/// `logout`, `providers`, and the MFA endpoints never resolve as provider
/// names.
pub fn auth_routes(state: AuthState) -> Router {
    Router::new()
        .route("/auth/providers", get(providers::list_providers))
        .route("/auth/callback", get(callback::callback_handler))
        .route(
            "/auth/logout",
            post(logout::logout_handler).get(logout::logout_redirect_handler),
        )
        .route("/auth/mfa/setup", post(mfa::setup_handler))
        .route("/auth/mfa/verify", post(mfa::verify_handler))
        .route("/auth/mfa/challenge", post(mfa::challenge_handler))
        .route("/auth/mfa/disable", post(mfa::disable_handler))
        .route("/auth/mfa/status", get(mfa::status_handler))
        .route("/auth/{provider}", get(login::login_handler))
        .with_state(state)
}

/// 302 response toward `location`.
///
/// `axum::response::Redirect` only offers 303, 307, and 308; the login flow
/// answers with `302 Found`.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Derives session metadata from request headers.
#[must_use]
pub fn client_metadata(headers: &HeaderMap) -> SessionMetadata {
    let ip_address = client_ip(headers).unwrap_or_default();
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    SessionMetadata::new(ip_address, user_agent)
}

/// Pulls the session token from a request, `Authorization: Bearer` first,
/// then the configured session cookie.
pub(crate) fn request_token(
    headers: &HeaderMap,
    jar: &CookieJar,
    cookie_name: &str,
) -> Option<String> {
    if let Some(value) = headers.get(header::AUTHORIZATION)
        && let Ok(value) = value.to_str()
        && let Some(token) = value.strip_prefix("Bearer ")
    {
        return Some(token.to_string());
    }

    jar.get(cookie_name)
        .map(|cookie| cookie.value().to_string())
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    // x-forwarded-for can list several hops; the first entry is the client
    if let Some(forwarded) = headers.get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
        && let Some(client_ip) = value.split(',').next()
    {
        return Some(client_ip.trim().to_string());
    }

    if let Some(real_ip) = headers.get("x-real-ip")
        && let Ok(value) = real_ip.to_str()
    {
        return Some(value.to_string());
    }

    None
}
