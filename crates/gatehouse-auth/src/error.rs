//! Authentication error types.
//!
//! This module defines all error types that can occur during the OAuth login
//! flow, session handling, token verification, and MFA.

use std::fmt;

/// Errors that can occur during authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The requested provider is not registered.
    #[error("Unknown provider: {name}")]
    UnknownProvider {
        /// The provider name that was requested.
        name: String,
    },

    /// The provider is registered but its configuration is incomplete or invalid.
    #[error("Provider misconfigured: {provider} - {message}")]
    ProviderMisconfigured {
        /// The provider name.
        provider: String,
        /// Description of the configuration problem.
        message: String,
    },

    /// The provider redirected back with an error (e.g. the user denied access).
    #[error("Provider denied: {code}")]
    ProviderDenied {
        /// The raw error code reported by the provider.
        code: String,
    },

    /// The callback request lacks required parameters.
    #[error("Missing parameters: {message}")]
    MissingParameters {
        /// Description of what is missing.
        message: String,
    },

    /// The state returned by the provider does not match the carried state.
    #[error("State mismatch")]
    StateMismatch,

    /// Exchanging the authorization code for an access token failed.
    #[error("Token exchange failed: {message}")]
    TokenExchangeFailed {
        /// Description of the exchange failure.
        message: String,
    },

    /// Fetching the user profile from the provider failed.
    #[error("User fetch failed: {message}")]
    UserFetchFailed {
        /// Description of the fetch failure.
        message: String,
    },

    /// The session does not exist, has expired, or was deleted.
    #[error("Session not found")]
    SessionNotFound,

    /// The session token is invalid (bad signature, expired, or malformed).
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token is invalid.
        message: String,
    },

    /// The submitted MFA code did not verify.
    #[error("MFA verification failed")]
    MfaVerificationFailed,

    /// The user has no MFA settings to verify against.
    #[error("MFA not configured")]
    MfaNotConfigured,
}

impl AuthError {
    /// Creates a new `UnknownProvider` error.
    #[must_use]
    pub fn unknown_provider(name: impl Into<String>) -> Self {
        Self::UnknownProvider { name: name.into() }
    }

    /// Creates a new `ProviderMisconfigured` error.
    #[must_use]
    pub fn provider_misconfigured(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderMisconfigured {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ProviderDenied` error.
    #[must_use]
    pub fn provider_denied(code: impl Into<String>) -> Self {
        Self::ProviderDenied { code: code.into() }
    }

    /// Creates a new `MissingParameters` error.
    #[must_use]
    pub fn missing_parameters(message: impl Into<String>) -> Self {
        Self::MissingParameters {
            message: message.into(),
        }
    }

    /// Creates a new `TokenExchangeFailed` error.
    #[must_use]
    pub fn token_exchange_failed(message: impl Into<String>) -> Self {
        Self::TokenExchangeFailed {
            message: message.into(),
        }
    }

    /// Creates a new `UserFetchFailed` error.
    #[must_use]
    pub fn user_fetch_failed(message: impl Into<String>) -> Self {
        Self::UserFetchFailed {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Returns `true` if this error arose from the OAuth login flow itself.
    #[must_use]
    pub fn is_flow_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownProvider { .. }
                | Self::ProviderMisconfigured { .. }
                | Self::ProviderDenied { .. }
                | Self::MissingParameters { .. }
                | Self::StateMismatch
                | Self::TokenExchangeFailed { .. }
                | Self::UserFetchFailed { .. }
        )
    }

    /// Returns `true` if this error means the caller is not authenticated.
    ///
    /// Protected-resource checks treat token and session failures uniformly,
    /// so callers never learn whether a token expired or its session was
    /// revoked.
    #[must_use]
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::SessionNotFound | Self::InvalidToken { .. })
    }

    /// Returns `true` if this is an MFA-related error.
    #[must_use]
    pub fn is_mfa_error(&self) -> bool {
        matches!(self, Self::MfaVerificationFailed | Self::MfaNotConfigured)
    }

    /// Returns `true` if the failure originated on a third-party provider call.
    #[must_use]
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            Self::ProviderDenied { .. }
                | Self::TokenExchangeFailed { .. }
                | Self::UserFetchFailed { .. }
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownProvider { .. } | Self::ProviderMisconfigured { .. } => {
                ErrorCategory::Provider
            }
            Self::ProviderDenied { .. }
            | Self::MissingParameters { .. }
            | Self::StateMismatch
            | Self::TokenExchangeFailed { .. }
            | Self::UserFetchFailed { .. } => ErrorCategory::Flow,
            Self::SessionNotFound => ErrorCategory::Session,
            Self::InvalidToken { .. } => ErrorCategory::Token,
            Self::MfaVerificationFailed | Self::MfaNotConfigured => ErrorCategory::Mfa,
        }
    }

    /// Returns the redirect error code used at the callback boundary.
    ///
    /// Every flow failure turns into a `302` to `/?error=<code>`; this is the
    /// `<code>` value. Provider denials propagate the provider's own error
    /// code, everything else maps to a fixed, non-sensitive identifier.
    #[must_use]
    pub fn redirect_code(&self) -> &str {
        match self {
            Self::UnknownProvider { .. } => "missing_provider",
            Self::ProviderDenied { code } => code,
            Self::MissingParameters { .. } => "missing_parameters",
            Self::StateMismatch => "state_mismatch",
            Self::TokenExchangeFailed { .. } => "token_exchange_failed",
            Self::UserFetchFailed { .. } => "user_fetch_failed",
            Self::ProviderMisconfigured { .. }
            | Self::SessionNotFound
            | Self::InvalidToken { .. }
            | Self::MfaVerificationFailed
            | Self::MfaNotConfigured => "authentication_failed",
        }
    }
}

/// Categories of authentication errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Provider registry and configuration errors.
    Provider,
    /// OAuth flow errors (callback validation, provider round trip).
    Flow,
    /// Session lookup errors.
    Session,
    /// Token verification errors.
    Token,
    /// Multi-factor authentication errors.
    Mfa,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider => write!(f, "provider"),
            Self::Flow => write!(f, "flow"),
            Self::Session => write!(f, "session"),
            Self::Token => write!(f, "token"),
            Self::Mfa => write!(f, "mfa"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::unknown_provider("gitlab");
        assert_eq!(err.to_string(), "Unknown provider: gitlab");

        let err = AuthError::provider_misconfigured("github", "missing client secret");
        assert_eq!(
            err.to_string(),
            "Provider misconfigured: github - missing client secret"
        );

        let err = AuthError::StateMismatch;
        assert_eq!(err.to_string(), "State mismatch");

        let err = AuthError::provider_denied("access_denied");
        assert_eq!(err.to_string(), "Provider denied: access_denied");
    }

    #[test]
    fn test_error_predicates() {
        let err = AuthError::unknown_provider("gitlab");
        assert!(err.is_flow_error());
        assert!(!err.is_unauthenticated());

        let err = AuthError::SessionNotFound;
        assert!(err.is_unauthenticated());
        assert!(!err.is_flow_error());

        let err = AuthError::invalid_token("bad signature");
        assert!(err.is_unauthenticated());

        let err = AuthError::token_exchange_failed("HTTP 500");
        assert!(err.is_flow_error());
        assert!(err.is_provider_error());

        let err = AuthError::MfaVerificationFailed;
        assert!(err.is_mfa_error());
        assert!(!err.is_flow_error());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            AuthError::unknown_provider("x").category(),
            ErrorCategory::Provider
        );
        assert_eq!(AuthError::StateMismatch.category(), ErrorCategory::Flow);
        assert_eq!(
            AuthError::SessionNotFound.category(),
            ErrorCategory::Session
        );
        assert_eq!(
            AuthError::invalid_token("x").category(),
            ErrorCategory::Token
        );
        assert_eq!(
            AuthError::MfaNotConfigured.category(),
            ErrorCategory::Mfa
        );
    }

    #[test]
    fn test_redirect_codes() {
        assert_eq!(AuthError::StateMismatch.redirect_code(), "state_mismatch");
        assert_eq!(
            AuthError::missing_parameters("no code").redirect_code(),
            "missing_parameters"
        );
        assert_eq!(
            AuthError::unknown_provider("x").redirect_code(),
            "missing_provider"
        );
        assert_eq!(
            AuthError::token_exchange_failed("x").redirect_code(),
            "token_exchange_failed"
        );
        assert_eq!(
            AuthError::user_fetch_failed("x").redirect_code(),
            "user_fetch_failed"
        );
        // Provider denials propagate the raw provider code
        assert_eq!(
            AuthError::provider_denied("access_denied").redirect_code(),
            "access_denied"
        );
        // Internal details never leak through the redirect
        assert_eq!(
            AuthError::provider_misconfigured("github", "secret empty").redirect_code(),
            "authentication_failed"
        );
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Provider.to_string(), "provider");
        assert_eq!(ErrorCategory::Flow.to_string(), "flow");
        assert_eq!(ErrorCategory::Session.to_string(), "session");
        assert_eq!(ErrorCategory::Token.to_string(), "token");
        assert_eq!(ErrorCategory::Mfa.to_string(), "mfa");
    }
}
