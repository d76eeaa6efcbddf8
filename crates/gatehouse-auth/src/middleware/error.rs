//! Error response handling for the auth endpoints.
//!
//! Implements `IntoResponse` for [`AuthError`] so handlers and extractors
//! can bubble errors with `?`. Authentication failures collapse to one
//! uniform 401 body: the wire must not reveal whether a token failed
//! verification or referenced a revoked session.

use axum::Json;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::AuthError;

// =============================================================================
// IntoResponse Implementation
// =============================================================================

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = error_details(&self);

        let body = json!({
            "error": code,
            "message": message,
        });

        let mut headers = HeaderMap::new();
        if status == StatusCode::UNAUTHORIZED {
            let www_auth = build_www_authenticate_header(code, &message);
            if let Ok(value) = HeaderValue::from_str(&www_auth) {
                headers.insert(header::WWW_AUTHENTICATE, value);
            }
        }

        (status, headers, Json(body)).into_response()
    }
}

/// Extracts response details from an `AuthError`.
///
/// Returns (HTTP status, stable error code, client-facing message).
fn error_details(error: &AuthError) -> (StatusCode, &'static str, String) {
    match error {
        AuthError::UnknownProvider { .. } => {
            (StatusCode::BAD_REQUEST, "unknown_provider", error.to_string())
        }
        AuthError::ProviderMisconfigured { provider, .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "provider_misconfigured",
            // The configuration detail stays server-side
            format!("Provider '{provider}' is not configured"),
        ),
        AuthError::ProviderDenied { .. } => {
            (StatusCode::BAD_REQUEST, "provider_denied", error.to_string())
        }
        AuthError::MissingParameters { .. } => (
            StatusCode::BAD_REQUEST,
            "missing_parameters",
            error.to_string(),
        ),
        AuthError::StateMismatch => {
            (StatusCode::BAD_REQUEST, "state_mismatch", error.to_string())
        }
        AuthError::TokenExchangeFailed { .. } => (
            StatusCode::BAD_GATEWAY,
            "token_exchange_failed",
            error.to_string(),
        ),
        AuthError::UserFetchFailed { .. } => (
            StatusCode::BAD_GATEWAY,
            "user_fetch_failed",
            error.to_string(),
        ),
        // One body for both: the wire must not distinguish a bad token
        // from a revoked session
        AuthError::SessionNotFound | AuthError::InvalidToken { .. } => (
            StatusCode::UNAUTHORIZED,
            "not_authenticated",
            "Not authenticated".to_string(),
        ),
        AuthError::MfaVerificationFailed => (
            StatusCode::UNAUTHORIZED,
            "mfa_verification_failed",
            error.to_string(),
        ),
        AuthError::MfaNotConfigured => (
            StatusCode::BAD_REQUEST,
            "mfa_not_configured",
            error.to_string(),
        ),
    }
}

/// Builds the WWW-Authenticate header value for 401 responses.
///
/// Format: `Bearer realm="gatehouse", error="...", error_description="..."`
fn build_www_authenticate_header(error: &str, description: &str) -> String {
    let escaped_desc = description.replace('\"', "\\\"");
    format!(
        "Bearer realm=\"gatehouse\", error=\"{}\", error_description=\"{}\"",
        error, escaped_desc
    )
}
