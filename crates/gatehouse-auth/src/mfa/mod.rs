//! Multi-factor authentication.
//!
//! TOTP enrollment and verification with single-use backup codes. Settings
//! move `disabled → pending → enabled`: enrollment stores a pending secret,
//! the first successful verification enables it, and explicit removal
//! disables it again.

pub mod backup;
pub mod store;
pub mod totp;

use serde::Serialize;
use tracing::debug;

pub use backup::{BackupCodeCheck, generate_backup_codes, normalize_backup_code, verify_backup_code};
pub use store::{BackupCodeConsumption, MfaSettings, MfaSettingsStore};
pub use totp::TotpService;

use crate::config::MfaConfig;
use crate::error::AuthError;

/// Material handed to the user at enrollment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    /// Base32 TOTP secret for manual entry.
    pub secret: String,

    /// `otpauth://` URI for QR-code rendering.
    pub provisioning_uri: String,

    /// Single-use backup codes. Shown once, stored server-side.
    pub backup_codes: Vec<String>,
}

/// Current MFA state for a user.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MfaStatus {
    /// Whether any settings exist (pending or enabled).
    pub configured: bool,

    /// Whether enrollment has been confirmed.
    pub enabled: bool,

    /// Unused backup codes left.
    pub backup_codes_remaining: usize,
}

/// Which factor satisfied a verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MfaMethod {
    /// Time-based one-time code.
    Totp,
    /// Single-use backup code.
    BackupCode,
}

/// Successful login verification outcome.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MfaVerification {
    /// The factor that matched.
    pub method: MfaMethod,

    /// Backup codes left, when one was consumed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_codes_remaining: Option<usize>,
}

/// Orchestrates TOTP secrets, backup codes, and per-user settings.
#[derive(Debug)]
pub struct MfaService {
    totp: TotpService,
    settings: MfaSettingsStore,
    backup_code_count: usize,
}

impl MfaService {
    /// Creates an MFA service from the configuration.
    #[must_use]
    pub fn new(config: &MfaConfig) -> Self {
        Self {
            totp: TotpService::new(config),
            settings: MfaSettingsStore::new(),
            backup_code_count: config.backup_code_count,
        }
    }

    /// Starts enrollment for a user.
    ///
    /// Generates a fresh secret and backup codes and stores them as pending.
    /// Re-enrolling replaces any previous settings, pending or enabled.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MfaNotConfigured`] if the generated secret cannot
    /// be rendered into a provisioning URI, which indicates a broken random
    /// source rather than user error.
    pub fn begin_enrollment(
        &self,
        user_id: &str,
        account_label: &str,
    ) -> Result<Enrollment, AuthError> {
        let secret = self.totp.generate_secret();
        let provisioning_uri = self.totp.provisioning_uri(&secret, account_label)?;
        let backup_codes = generate_backup_codes(self.backup_code_count);

        self.settings.put(
            user_id,
            MfaSettings::pending(secret.clone(), backup_codes.clone()),
        );

        debug!(user = %user_id, "MFA enrollment started");

        Ok(Enrollment {
            secret,
            provisioning_uri,
            backup_codes,
        })
    }

    /// Confirms a pending enrollment with a first TOTP code.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MfaNotConfigured`] if no enrollment exists, or
    /// [`AuthError::MfaVerificationFailed`] if the code does not verify.
    pub fn confirm_enrollment(&self, user_id: &str, code: &str) -> Result<(), AuthError> {
        let settings = self
            .settings
            .get(user_id)
            .ok_or(AuthError::MfaNotConfigured)?;

        if !self.totp.verify(&settings.secret, code) {
            return Err(AuthError::MfaVerificationFailed);
        }

        self.settings.enable(user_id);
        self.settings.touch(user_id);
        Ok(())
    }

    /// Verifies a login challenge with either a TOTP code or a backup code.
    ///
    /// TOTP is tried first; on failure the value is checked against the
    /// user's backup codes and consumed on a match. Pending enrollments do
    /// not count: only an enabled factor can satisfy a login.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MfaNotConfigured`] if MFA is not enabled for the
    /// user, or [`AuthError::MfaVerificationFailed`] if neither factor
    /// matches.
    pub fn verify_login(&self, user_id: &str, code: &str) -> Result<MfaVerification, AuthError> {
        let settings = self
            .settings
            .get(user_id)
            .ok_or(AuthError::MfaNotConfigured)?;
        if !settings.enabled {
            return Err(AuthError::MfaNotConfigured);
        }

        if self.totp.verify(&settings.secret, code) {
            self.settings.touch(user_id);
            return Ok(MfaVerification {
                method: MfaMethod::Totp,
                backup_codes_remaining: None,
            });
        }

        if let Some(consumption) = self.settings.consume_backup_code(user_id, code)
            && consumption.valid
        {
            return Ok(MfaVerification {
                method: MfaMethod::BackupCode,
                backup_codes_remaining: Some(consumption.remaining),
            });
        }

        Err(AuthError::MfaVerificationFailed)
    }

    /// Removes a user's MFA settings.
    ///
    /// Returns `true` if settings existed.
    pub fn disable(&self, user_id: &str) -> bool {
        self.settings.delete(user_id)
    }

    /// Returns `true` if the user has a confirmed, enabled factor.
    #[must_use]
    pub fn is_enabled(&self, user_id: &str) -> bool {
        self.settings.is_enabled(user_id)
    }

    /// Returns the user's current MFA state.
    #[must_use]
    pub fn status(&self, user_id: &str) -> MfaStatus {
        match self.settings.get(user_id) {
            Some(settings) => MfaStatus {
                configured: true,
                enabled: settings.enabled,
                backup_codes_remaining: settings.backup_codes.len(),
            },
            None => MfaStatus {
                configured: false,
                enabled: false,
                backup_codes_remaining: 0,
            },
        }
    }
}
