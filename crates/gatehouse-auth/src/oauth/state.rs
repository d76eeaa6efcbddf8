//! Transient login state carried through the OAuth redirect round trip.
//!
//! Nothing here is persisted server-side: the state token, provider name,
//! and post-login redirect target travel to the provider and back inside
//! short-lived client cookies. The coordinator only produces and checks the
//! triple; transport is the HTTP layer's concern.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;

use crate::error::AuthError;

/// CSRF state token for the OAuth authorization round trip.
///
/// 32 random bytes, base64url-encoded without padding (43 characters,
/// 256 bits of entropy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateToken(String);

impl StateToken {
    /// Generates a new random state token.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        // `gen` is a reserved keyword in Rust 2024, so we use r#gen
        let bytes: [u8; 32] = rng.r#gen();
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Wraps an already-encoded token value.
    #[must_use]
    pub fn from_value(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the token and returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for StateToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The triple round-tripped between `initiate` and `callback`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransientLoginState {
    /// CSRF state token.
    pub state: StateToken,

    /// Provider the flow was initiated against.
    pub provider: String,

    /// Post-login redirect target.
    pub redirect: String,
}

impl TransientLoginState {
    /// Creates a fresh state triple for a new login flow.
    #[must_use]
    pub fn new(provider: impl Into<String>, redirect: impl Into<String>) -> Self {
        Self {
            state: StateToken::generate(),
            provider: provider.into(),
            redirect: redirect.into(),
        }
    }

    /// Checks the state returned by the provider against the carried token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::StateMismatch`] on any inequality, including an
    /// empty carried token.
    pub fn validate_returned(&self, returned_state: &str) -> Result<(), AuthError> {
        if self.state.as_str().is_empty() || self.state.as_str() != returned_state {
            return Err(AuthError::StateMismatch);
        }
        Ok(())
    }
}

/// Normalizes a client-supplied redirect target to a local path.
///
/// Absolute URLs and protocol-relative values are rejected so a tampered
/// cookie or crafted login link can never bounce the user off-site.
#[must_use]
pub fn sanitize_redirect(target: &str, default: &str) -> String {
    if target.is_empty() {
        return default.to_string();
    }
    if target.starts_with('/') && !target.starts_with("//") && !target.starts_with("/\\") {
        return target.to_string();
    }
    default.to_string()
}
