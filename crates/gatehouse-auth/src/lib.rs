//! # gatehouse-auth
//!
//! Authentication and session subsystem for the Gatehouse server.
//!
//! This crate provides:
//! - Provider-agnostic OAuth 2.0 authorization-code login flow
//! - CSRF transient state carried in short-lived client cookies
//! - Concurrency-safe in-memory session store
//! - HMAC-signed session tokens with mandatory revocation cross-check
//! - TOTP multi-factor authentication with single-use backup codes
//!
//! ## Overview
//!
//! Logins run the standard authorization-code dance against any registered
//! provider. The callback validates the anti-forgery state, the issued token
//! is only honored while its session still exists, and an enabled second
//! factor holds the login until a code verifies.
//!
//! ## Modules
//!
//! - [`config`] - Subsystem configuration and validation
//! - [`error`] - The [`AuthError`] type shared by every layer
//! - [`provider`] - Provider descriptors and the registry
//! - [`oauth`] - Flow coordination: initiate, transient state, callback
//! - [`session`] - In-memory session store
//! - [`token`] - HMAC-signed session and challenge tokens
//! - [`mfa`] - TOTP enrollment, verification, and backup codes
//! - [`orchestrator`] - Composition layer the HTTP handlers talk to
//! - [`http`] - Axum handlers for the auth endpoints
//! - [`middleware`] - The [`CurrentUser`] request extractor

pub mod config;
pub mod error;
pub mod http;
pub mod mfa;
pub mod middleware;
pub mod oauth;
pub mod orchestrator;
pub mod provider;
pub mod session;
pub mod token;

pub use config::{AuthConfig, ConfigError, CookieConfig, MfaConfig};
pub use error::{AuthError, ErrorCategory};
pub use http::{AuthState, auth_routes, client_metadata};
pub use mfa::{Enrollment, MfaMethod, MfaService, MfaStatus, MfaVerification};
pub use middleware::CurrentUser;
pub use oauth::{
    CallbackOutcome, CallbackParams, InitiatedLogin, OAuthFlowCoordinator, StateToken,
    TransientLoginState, sanitize_redirect,
};
pub use orchestrator::{
    AuthOrchestrator, AuthenticatedRequest, LoginCompletion, LogoutOutcome, MfaLogin,
};
pub use provider::{AppUser, ProviderConfig, ProviderRegistry};
pub use session::{Session, SessionMetadata, SessionStore};
pub use token::{TokenClaims, TokenService};

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use gatehouse_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::http::{AuthState, auth_routes};
    pub use crate::middleware::CurrentUser;
    pub use crate::orchestrator::{AuthOrchestrator, AuthenticatedRequest, LoginCompletion};
    pub use crate::provider::{AppUser, ProviderConfig, ProviderRegistry};
    pub use crate::session::{Session, SessionMetadata, SessionStore};
}
