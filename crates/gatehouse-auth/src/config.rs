//! Authentication configuration.
//!
//! All settings carry sensible defaults so a bare `AuthConfig::default()` is
//! usable in tests; production deployments override the token secret and
//! provider credentials.
//!
//! # Example
//!
//! ```ignore
//! use gatehouse_auth::config::AuthConfig;
//!
//! let mut config = AuthConfig::default();
//! config.token.secret = "a-long-random-secret-at-least-32-chars!!".to_string();
//! config.validate()?;
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required value is missing.
    #[error("Missing configuration value: {0}")]
    Missing(String),

    /// A value is present but invalid.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Top-level authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Public base URL of this deployment, used to build callback URLs.
    pub public_url: String,

    /// Default post-login redirect when the client did not request one.
    pub post_login_redirect: String,

    /// Session store settings.
    pub session: SessionConfig,

    /// Signed-token settings.
    pub token: TokenConfig,

    /// Transient login-state settings.
    pub state: StateConfig,

    /// Multi-factor authentication settings.
    pub mfa: MfaConfig,

    /// Session cookie settings.
    pub cookie: CookieConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            public_url: "http://localhost:8080".to_string(),
            post_login_redirect: "/".to_string(),
            session: SessionConfig::default(),
            token: TokenConfig::default(),
            state: StateConfig::default(),
            mfa: MfaConfig::default(),
            cookie: CookieConfig::default(),
        }
    }
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if required values are missing or out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.public_url.is_empty() {
            return Err(ConfigError::Missing("public_url".to_string()));
        }

        if self.token.secret.is_empty() {
            return Err(ConfigError::Missing("token.secret".to_string()));
        }

        if self.token.secret.len() < 32 {
            return Err(ConfigError::InvalidValue(
                "token.secret must be at least 32 bytes".to_string(),
            ));
        }

        if self.token.ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "token.ttl must be greater than zero".to_string(),
            ));
        }

        if self.session.ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "session.ttl must be greater than zero".to_string(),
            ));
        }

        if self.state.ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "state.ttl must be greater than zero".to_string(),
            ));
        }

        if self.mfa.window_steps > 10 {
            return Err(ConfigError::InvalidValue(
                "mfa.window_steps must be at most 10".to_string(),
            ));
        }

        if self.mfa.challenge_ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "mfa.challenge_ttl must be greater than zero".to_string(),
            ));
        }

        if self.cookie.name.is_empty() {
            return Err(ConfigError::Missing("cookie.name".to_string()));
        }

        Ok(())
    }
}

/// Session store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long a session lives after creation.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(86_400),
        }
    }
}

/// Signed-token settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// HMAC signing secret. Must be set and at least 32 bytes.
    pub secret: String,

    /// How long an issued session token is valid.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            ttl: Duration::from_secs(86_400),
        }
    }
}

/// Transient login-state settings.
///
/// The state parameter and its carrier cookies only need to survive one
/// round trip to the provider, so the lifetime is short.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Lifetime of the transient state cookies.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(600),
        }
    }
}

/// Multi-factor authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MfaConfig {
    /// Issuer name shown in authenticator apps.
    pub issuer: String,

    /// Number of adjacent 30-second steps accepted on either side of now.
    pub window_steps: u8,

    /// Lifetime of the intermediate challenge token issued after a
    /// password-equivalent login when MFA is still pending.
    #[serde(with = "humantime_serde")]
    pub challenge_ttl: Duration,

    /// Number of backup codes generated at enrollment.
    pub backup_code_count: usize,
}

impl Default for MfaConfig {
    fn default() -> Self {
        Self {
            issuer: "Gatehouse".to_string(),
            window_steps: 1,
            challenge_ttl: Duration::from_secs(300),
            backup_code_count: 10,
        }
    }
}

/// Session cookie settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieConfig {
    /// Cookie name.
    pub name: String,

    /// Whether to set the `Secure` attribute.
    pub secure: bool,

    /// Whether to set the `HttpOnly` attribute.
    pub http_only: bool,

    /// `SameSite` attribute value (`Strict`, `Lax`, or `None`).
    pub same_site: String,

    /// Cookie path.
    pub path: String,

    /// Optional cookie domain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "gatehouse_session".to_string(),
            secure: false,
            http_only: true,
            same_site: "Lax".to_string(),
            path: "/".to_string(),
            domain: None,
        }
    }
}
