//! Composition layer over the flow coordinator, stores, and services.
//!
//! [`AuthOrchestrator`] is the single entry point the HTTP layer talks to:
//! it wires [`OAuthFlowCoordinator`], [`SessionStore`], [`TokenService`],
//! and [`MfaService`] into complete login, logout, and verification
//! operations.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::mfa::{MfaService, MfaVerification};
use crate::oauth::{CallbackParams, InitiatedLogin, OAuthFlowCoordinator, TransientLoginState};
use crate::provider::{AppUser, ProviderRegistry};
use crate::session::{Session, SessionMetadata, SessionStore};
use crate::token::{TokenClaims, TokenService};

/// Outcome of a completed OAuth callback.
#[derive(Debug, Clone)]
pub enum LoginCompletion {
    /// The user is fully signed in.
    SignedIn {
        /// The resolved user.
        user: AppUser,
        /// The freshly created session.
        session: Session,
        /// Signed session token for the auth cookie.
        token: String,
        /// Post-login redirect target.
        redirect_target: String,
    },

    /// The user's identity is proven but an enabled second factor is
    /// outstanding. No session exists yet.
    MfaRequired {
        /// The resolved user.
        user: AppUser,
        /// Short-lived challenge token to present with the MFA code.
        challenge_token: String,
        /// Post-login redirect target, for after the challenge.
        redirect_target: String,
    },
}

/// Outcome of a completed MFA challenge.
#[derive(Debug, Clone)]
pub struct MfaLogin {
    /// The user that passed the challenge.
    pub user_id: String,

    /// The freshly created session.
    pub session: Session,

    /// Signed session token for the auth cookie.
    pub token: String,

    /// Which factor matched.
    pub verification: MfaVerification,
}

/// Outcome of a logout request.
#[derive(Debug, Clone, Copy)]
pub struct LogoutOutcome {
    /// Whether a live session was actually deleted.
    pub session_deleted: bool,
}

/// A verified request identity: token claims plus the live session.
#[derive(Debug, Clone)]
pub struct AuthenticatedRequest {
    /// Verified token claims.
    pub claims: TokenClaims,

    /// The live session the token is bound to.
    pub session: Session,
}

/// Composes the authentication subsystem into caller-facing operations.
#[derive(Debug)]
pub struct AuthOrchestrator {
    config: AuthConfig,
    flow: OAuthFlowCoordinator,
    sessions: SessionStore,
    tokens: TokenService,
    mfa: MfaService,
}

impl AuthOrchestrator {
    /// Wires up the subsystem from configuration and a provider registry.
    #[must_use]
    pub fn new(config: AuthConfig, registry: ProviderRegistry) -> Self {
        let registry = Arc::new(registry);
        Self {
            flow: OAuthFlowCoordinator::new(Arc::clone(&registry), &config),
            sessions: SessionStore::new(config.session.ttl),
            tokens: TokenService::new(&config),
            mfa: MfaService::new(&config.mfa),
            config,
        }
    }

    /// Returns the configuration this orchestrator was built with.
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Returns the provider registry.
    #[must_use]
    pub fn providers(&self) -> &ProviderRegistry {
        self.flow.registry()
    }

    /// Returns the session store.
    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Returns the token service.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Returns the MFA service.
    #[must_use]
    pub fn mfa(&self) -> &MfaService {
        &self.mfa
    }

    /// Starts a login flow; see [`OAuthFlowCoordinator::initiate`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnknownProvider`] or
    /// [`AuthError::ProviderMisconfigured`].
    pub fn initiate(
        &self,
        provider: &str,
        redirect_target: &str,
    ) -> Result<InitiatedLogin, AuthError> {
        self.flow.initiate(provider, redirect_target)
    }

    /// Completes the OAuth callback and, unless a second factor is
    /// outstanding, creates the session and issues its token.
    ///
    /// When the resolved user has MFA enabled, no session is created;
    /// instead a short-lived challenge token is returned and the login
    /// finishes in [`Self::complete_mfa`].
    ///
    /// # Errors
    ///
    /// Propagates any callback state-machine failure; see
    /// [`OAuthFlowCoordinator::callback`].
    pub async fn complete_login(
        &self,
        params: &CallbackParams,
        carried: Option<&TransientLoginState>,
        metadata: SessionMetadata,
    ) -> Result<LoginCompletion, AuthError> {
        let outcome = self.flow.callback(params, carried).await?;

        if self.mfa.is_enabled(&outcome.user.id) {
            let challenge_token = self.tokens.issue_challenge(&outcome.user.id)?;
            info!(user = %outcome.user.id, "Login pending MFA challenge");
            return Ok(LoginCompletion::MfaRequired {
                user: outcome.user,
                challenge_token,
                redirect_target: outcome.redirect_target,
            });
        }

        let session = self.sessions.create(&outcome.user.id, metadata);
        let token = self.tokens.issue(&outcome.user.id, &session.id)?;

        info!(
            user = %outcome.user.id,
            provider = %outcome.user.provider,
            session = %session.id,
            "User signed in"
        );

        Ok(LoginCompletion::SignedIn {
            user: outcome.user,
            session,
            token,
            redirect_target: outcome.redirect_target,
        })
    }

    /// Finishes a login that was held for an MFA challenge.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] if the challenge token does not
    /// verify, [`AuthError::MfaNotConfigured`] if the user has no enabled
    /// factor, or [`AuthError::MfaVerificationFailed`] if the code is wrong.
    pub fn complete_mfa(
        &self,
        challenge_token: &str,
        code: &str,
        metadata: SessionMetadata,
    ) -> Result<MfaLogin, AuthError> {
        let claims = self.tokens.verify_challenge(challenge_token)?;
        let verification = self.mfa.verify_login(&claims.sub, code)?;

        let session = self.sessions.create(&claims.sub, metadata);
        let token = self.tokens.issue(&claims.sub, &session.id)?;

        info!(
            user = %claims.sub,
            session = %session.id,
            method = ?verification.method,
            "MFA challenge passed, user signed in"
        );

        Ok(MfaLogin {
            user_id: claims.sub,
            session,
            token,
            verification,
        })
    }

    /// Verifies a session token and confirms its session is still live.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] or [`AuthError::SessionNotFound`];
    /// both must surface to clients as a uniform "not authenticated".
    pub fn authenticate(&self, token: &str) -> Result<AuthenticatedRequest, AuthError> {
        let (claims, session) = self.tokens.authenticate(token, &self.sessions)?;
        Ok(AuthenticatedRequest { claims, session })
    }

    /// Logs out the session referenced by the given token, best effort.
    ///
    /// An invalid or already-revoked token is not an error: the net effect
    /// the caller observes is identical, so failures are logged and
    /// swallowed.
    pub fn logout(&self, token: Option<&str>) -> LogoutOutcome {
        let session_deleted = match token {
            Some(token) => match self.tokens.verify_session(token) {
                Ok(claims) => {
                    let deleted = self.sessions.delete(&claims.sid);
                    if deleted {
                        info!(user = %claims.sub, session = %claims.sid, "User logged out");
                    } else {
                        debug!(session = %claims.sid, "Logout for already-gone session");
                    }
                    deleted
                }
                Err(e) => {
                    debug!(error = %e, "Logout with unverifiable token");
                    false
                }
            },
            None => false,
        };

        LogoutOutcome { session_deleted }
    }

    /// Deletes every session belonging to a user. Returns the count removed.
    pub fn revoke_all_sessions(&self, user_id: &str) -> usize {
        self.sessions.delete_all_for_user(user_id)
    }
}
