//! Second-factor endpoints.
//!
//! Enrollment (`setup` → `verify`) and removal (`disable`) operate on the
//! authenticated user. The `challenge` endpoint is different: it is called
//! mid-login, before any session exists, and authenticates with the
//! short-lived challenge token from the callback instead.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AuthState, client_metadata, cookies};
use crate::error::AuthError;
use crate::mfa::{Enrollment, MfaMethod};
use crate::middleware::CurrentUser;
use crate::oauth::sanitize_redirect;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Body carrying a single verification code.
#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    /// TOTP or backup code.
    pub code: String,
}

/// Body for the login challenge endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    /// TOTP or backup code.
    pub code: String,

    /// Challenge token from the callback. Falls back to the challenge
    /// cookie when omitted.
    pub challenge_token: Option<String>,

    /// Post-login redirect target.
    pub redirect: Option<String>,
}

/// Response from the setup endpoint.
#[derive(Debug, Serialize)]
pub struct SetupResponse {
    /// Always `true`; errors go through the error body instead.
    pub success: bool,

    /// The enrollment material to show the user once.
    #[serde(flatten)]
    pub enrollment: Enrollment,
}

/// Generic success acknowledgement.
#[derive(Debug, Serialize)]
pub struct AckResponse {
    /// Always `true`; errors go through the error body instead.
    pub success: bool,
    /// Human-readable message.
    pub message: String,
}

/// Response from a passed login challenge.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    /// Always `true`; errors go through the error body instead.
    pub success: bool,

    /// Where the client should navigate next.
    pub redirect_to: String,

    /// Which factor matched.
    pub method: MfaMethod,

    /// Unused backup codes left, when one was consumed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_codes_remaining: Option<usize>,
}

/// Response from the status endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Always `true`; errors go through the error body instead.
    pub success: bool,

    /// Whether any settings exist, pending or enabled.
    pub configured: bool,

    /// Whether enrollment has been confirmed.
    pub enabled: bool,

    /// Whether enrollment was started but not yet confirmed.
    pub pending: bool,

    /// Unused backup codes left.
    pub backup_codes_remaining: usize,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /auth/mfa/setup handler.
///
/// Generates a fresh secret, provisioning URI, and backup codes and stores
/// them as pending. Re-enrolling replaces any previous settings.
pub async fn setup_handler(
    State(state): State<AuthState>,
    CurrentUser(auth): CurrentUser,
) -> Result<Json<SetupResponse>, AuthError> {
    let enrollment = state
        .orchestrator
        .mfa()
        .begin_enrollment(&auth.claims.sub, &auth.claims.sub)?;

    Ok(Json(SetupResponse {
        success: true,
        enrollment,
    }))
}

/// POST /auth/mfa/verify handler.
///
/// Confirms a pending enrollment with a first authenticator code.
pub async fn verify_handler(
    State(state): State<AuthState>,
    CurrentUser(auth): CurrentUser,
    Json(body): Json<CodeRequest>,
) -> Result<Json<AckResponse>, AuthError> {
    state
        .orchestrator
        .mfa()
        .confirm_enrollment(&auth.claims.sub, &body.code)?;

    Ok(Json(AckResponse {
        success: true,
        message: "Two-factor authentication enabled".to_string(),
    }))
}

/// POST /auth/mfa/challenge handler.
///
/// Finishes a login that the callback held for a second factor. The caller
/// is not yet authenticated; the challenge token proves the completed first
/// factor. On success the session is created, its cookie set, and the
/// challenge cookie cleared.
pub async fn challenge_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(body): Json<ChallengeRequest>,
) -> Result<(CookieJar, Json<ChallengeResponse>), AuthError> {
    let challenge_token = body
        .challenge_token
        .filter(|token| !token.is_empty())
        .or_else(|| {
            jar.get(cookies::MFA_CHALLENGE_COOKIE)
                .map(|cookie| cookie.value().to_string())
        })
        .ok_or_else(|| AuthError::invalid_token("No challenge token presented"))?;

    let metadata = client_metadata(&headers);
    let login = state
        .orchestrator
        .complete_mfa(&challenge_token, &body.code, metadata)?;

    let config = state.orchestrator.config();
    let redirect_to = sanitize_redirect(
        body.redirect.as_deref().unwrap_or_default(),
        &config.post_login_redirect,
    );

    let jar = jar
        .add(cookies::session_cookie(
            &config.cookie,
            &login.token,
            config.token.ttl,
        ))
        .add(cookies::clear_challenge_cookie());

    Ok((
        jar,
        Json(ChallengeResponse {
            success: true,
            redirect_to,
            method: login.verification.method,
            backup_codes_remaining: login.verification.backup_codes_remaining,
        }),
    ))
}

/// POST /auth/mfa/disable handler.
///
/// Requires a currently valid code so a hijacked session cannot silently
/// strip the second factor.
pub async fn disable_handler(
    State(state): State<AuthState>,
    CurrentUser(auth): CurrentUser,
    Json(body): Json<CodeRequest>,
) -> Result<Json<AckResponse>, AuthError> {
    state
        .orchestrator
        .mfa()
        .verify_login(&auth.claims.sub, &body.code)?;
    state.orchestrator.mfa().disable(&auth.claims.sub);

    debug!(user = %auth.claims.sub, "MFA disabled");

    Ok(Json(AckResponse {
        success: true,
        message: "Two-factor authentication disabled".to_string(),
    }))
}

/// GET /auth/mfa/status handler.
pub async fn status_handler(
    State(state): State<AuthState>,
    CurrentUser(auth): CurrentUser,
) -> Json<StatusResponse> {
    let status = state.orchestrator.mfa().status(&auth.claims.sub);

    Json(StatusResponse {
        success: true,
        configured: status.configured,
        enabled: status.enabled,
        pending: status.configured && !status.enabled,
        backup_codes_remaining: status.backup_codes_remaining,
    })
}
