//! Signed session tokens.
//!
//! Tokens are HS256-signed JWTs binding a user to a session id. Verification
//! is stateless (signature + expiry), but a valid token alone never
//! authenticates a request: [`TokenService::authenticate`] additionally
//! confirms the referenced session still exists, so logout revokes tokens
//! before their embedded expiry.
//!
//! # Example
//!
//! ```ignore
//! use gatehouse_auth::token::TokenService;
//!
//! let service = TokenService::new(&config);
//! let token = service.issue(&user.id, &session.id)?;
//! let (claims, session) = service.authenticate(&token, &sessions)?;
//! ```

use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::session::{Session, SessionStore};

/// Token verification and signing errors.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The token signature does not verify against the server secret.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token has passed its embedded expiry.
    #[error("Token expired")]
    Expired,

    /// The token is structurally invalid or carries unusable claims.
    #[error("Malformed token: {message}")]
    Malformed {
        /// Description of the defect.
        message: String,
    },

    /// Signing a new token failed.
    #[error("Token signing failed: {message}")]
    Signing {
        /// Description of the signing failure.
        message: String,
    },
}

impl TokenError {
    /// Creates a new `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            _ => Self::malformed(err.to_string()),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        Self::invalid_token(err.to_string())
    }
}

/// What an issued token is good for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    /// Full session credential.
    Session,
    /// Intermediate MFA challenge, not yet a session.
    Mfa,
}

/// Claims embedded in a signed token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject, the user id.
    pub sub: String,

    /// Bound session id. Empty for challenge tokens, which precede the
    /// session.
    #[serde(default)]
    pub sid: String,

    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,

    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,

    /// What this token is good for.
    pub purpose: TokenPurpose,
}

impl TokenClaims {
    /// Builds session-token claims expiring `ttl` from now.
    #[must_use]
    pub fn new_session(sub: impl Into<String>, sid: impl Into<String>, ttl: Duration) -> Self {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        Self {
            sub: sub.into(),
            sid: sid.into(),
            iat: now,
            exp: now + ttl.as_secs() as i64,
            purpose: TokenPurpose::Session,
        }
    }

    /// Builds MFA-challenge claims expiring `ttl` from now.
    #[must_use]
    pub fn new_challenge(sub: impl Into<String>, ttl: Duration) -> Self {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        Self {
            sub: sub.into(),
            sid: String::new(),
            iat: now,
            exp: now + ttl.as_secs() as i64,
            purpose: TokenPurpose::Mfa,
        }
    }
}

/// Issues and verifies HMAC-signed tokens.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    challenge_ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .field("challenge_ttl", &self.challenge_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Creates a token service from the signing secret and lifetimes in the
    /// given configuration.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.token.secret.as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl: config.token.ttl,
            challenge_ttl: config.mfa.challenge_ttl,
        }
    }

    /// Issues a session token binding the user to the session.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if encoding fails.
    pub fn issue(&self, user_id: &str, session_id: &str) -> Result<String, TokenError> {
        self.encode(&TokenClaims::new_session(user_id, session_id, self.ttl))
    }

    /// Issues a short-lived MFA challenge token for the given user.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if encoding fails.
    pub fn issue_challenge(&self, user_id: &str) -> Result<String, TokenError> {
        self.encode(&TokenClaims::new_challenge(user_id, self.challenge_ttl))
    }

    /// Encodes claims into a signed token string.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if encoding fails.
    pub fn encode(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        encode(&Header::default(), claims, &self.encoding_key).map_err(|e| TokenError::Signing {
            message: e.to_string(),
        })
    }

    /// Verifies a session token and returns its claims.
    ///
    /// Only checks signature, expiry, and purpose; see
    /// [`Self::authenticate`] for the mandatory session cross-check.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidSignature`], [`TokenError::Expired`], or
    /// [`TokenError::Malformed`].
    pub fn verify_session(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let claims = self.decode(token)?;
        if claims.purpose != TokenPurpose::Session {
            return Err(TokenError::malformed("unexpected token purpose"));
        }
        Ok(claims)
    }

    /// Verifies an MFA challenge token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidSignature`], [`TokenError::Expired`], or
    /// [`TokenError::Malformed`].
    pub fn verify_challenge(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let claims = self.decode(token)?;
        if claims.purpose != TokenPurpose::Mfa {
            return Err(TokenError::malformed("unexpected token purpose"));
        }
        Ok(claims)
    }

    fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false; // No audience claim in this token shape

        let data = decode::<TokenClaims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }

    /// Verifies a session token and confirms its session is still live.
    ///
    /// Signature validity alone is insufficient: a deleted session must
    /// invalidate every token referencing it, whatever the token's own
    /// expiry says.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] for any token defect and
    /// [`AuthError::SessionNotFound`] when the referenced session is gone.
    pub fn authenticate(
        &self,
        token: &str,
        sessions: &SessionStore,
    ) -> Result<(TokenClaims, Session), AuthError> {
        let claims = self.verify_session(token)?;
        let session = sessions.get(&claims.sid)?;
        Ok((claims, session))
    }
}
