//! Logout endpoints.
//!
//! `POST /auth/logout` answers JSON for API callers; `GET /auth/logout`
//! serves link-based logout with a redirect. Both are lenient: a missing,
//! expired, or already-revoked token still clears the auth cookie, because
//! the net effect the caller wants is identical.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use serde::Serialize;

use super::{AuthState, cookies, found, request_token};

/// Where link-based logout lands.
const POST_LOGOUT_REDIRECT: &str = "/";

/// Response from the POST logout endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    /// Whether the logout request succeeded.
    pub success: bool,
    /// Human-readable message.
    pub message: String,
    /// Where the client should navigate next.
    pub redirect_to: String,
}

/// POST /auth/logout handler.
pub async fn logout_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    let config = state.orchestrator.config();
    let token = request_token(&headers, &jar, &config.cookie.name);
    let outcome = state.orchestrator.logout(token.as_deref());

    let jar = jar.add(cookies::clear_session_cookie(&config.cookie));

    let response = LogoutResponse {
        success: true,
        message: if outcome.session_deleted {
            "Logged out successfully".to_string()
        } else {
            "No active session".to_string()
        },
        redirect_to: POST_LOGOUT_REDIRECT.to_string(),
    };

    (
        StatusCode::OK,
        [(header::CACHE_CONTROL, "no-store")],
        jar,
        Json(response),
    )
        .into_response()
}

/// GET /auth/logout handler for link-based logout.
pub async fn logout_redirect_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    let config = state.orchestrator.config();
    let token = request_token(&headers, &jar, &config.cookie.name);
    state.orchestrator.logout(token.as_deref());

    let jar = jar.add(cookies::clear_session_cookie(&config.cookie));
    (jar, found(POST_LOGOUT_REDIRECT)).into_response()
}
