//! Session authentication extractor.
//!
//! [`CurrentUser`] verifies the session token carried by a request and
//! confirms the referenced session is still live. Token verification alone
//! is not enough: logout deletes the session before the token expires, and
//! a deleted session must fail authentication immediately.
//!
//! # Example
//!
//! ```ignore
//! use gatehouse_auth::middleware::CurrentUser;
//!
//! async fn protected_handler(CurrentUser(auth): CurrentUser) -> String {
//!     format!("Hello, {}!", auth.claims.sub)
//! }
//! ```

use axum::extract::{FromRef, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use tracing::debug;

use crate::error::AuthError;
use crate::http::AuthState;
use crate::orchestrator::AuthenticatedRequest;

/// Axum extractor for the authenticated user behind a request.
///
/// Token sources, in order: `Authorization: Bearer <token>`, then the
/// configured session cookie.
///
/// # Errors
///
/// Rejects with a uniform 401 when the token is missing, does not verify,
/// or references a session that no longer exists.
pub struct CurrentUser(pub AuthenticatedRequest);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        let config = auth_state.orchestrator.config();

        let token = extract_token_from_header(&parts.headers)
            .or_else(|| extract_token_from_cookie(&parts.headers, &config.cookie.name))
            .ok_or_else(|| AuthError::invalid_token("No authentication token presented"))?;

        match auth_state.orchestrator.authenticate(&token) {
            Ok(authenticated) => Ok(CurrentUser(authenticated)),
            Err(e) => {
                debug!(error = %e, "Request authentication failed");
                Err(e)
            }
        }
    }
}

/// Extracts a Bearer token from the Authorization header.
fn extract_token_from_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .map(ToString::to_string)
}

/// Extracts the session token from the configured cookie.
fn extract_token_from_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let cookie_header = headers.get(COOKIE)?.to_str().ok()?;

    for cookie in cookie_header.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=')
            && name.trim() == cookie_name
        {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    None
}
