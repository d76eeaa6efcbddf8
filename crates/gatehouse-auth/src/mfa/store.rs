//! Per-user MFA settings store.
//!
//! Pending and enabled enrollments share one stored shape, told apart by the
//! `enabled` flag. Backup-code consumption happens under the entry lock, so
//! two concurrent submissions of the same code yield exactly one success.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

use crate::mfa::backup::verify_backup_code;

/// Stored MFA settings for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MfaSettings {
    /// Base32-encoded TOTP secret.
    pub secret: String,

    /// `false` while enrollment is pending its first successful
    /// verification.
    pub enabled: bool,

    /// Unused backup codes.
    pub backup_codes: Vec<String>,

    /// Enrollment time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Last successful verification, if any.
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub last_used_at: Option<OffsetDateTime>,
}

impl MfaSettings {
    /// Creates pending settings for a fresh enrollment.
    #[must_use]
    pub fn pending(secret: impl Into<String>, backup_codes: Vec<String>) -> Self {
        Self {
            secret: secret.into(),
            enabled: false,
            backup_codes,
            created_at: OffsetDateTime::now_utc(),
            last_used_at: None,
        }
    }
}

/// Result of a backup-code consumption attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupCodeConsumption {
    /// Whether the submitted code matched and was consumed.
    pub valid: bool,

    /// Codes left after the attempt.
    pub remaining: usize,
}

/// Concurrency-safe in-memory MFA settings store, keyed by user id.
#[derive(Debug, Default)]
pub struct MfaSettingsStore {
    settings: DashMap<String, MfaSettings>,
}

impl MfaSettingsStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the settings for a user, if any exist.
    #[must_use]
    pub fn get(&self, user_id: &str) -> Option<MfaSettings> {
        self.settings.get(user_id).map(|entry| entry.clone())
    }

    /// Returns `true` if the user has completed enrollment.
    #[must_use]
    pub fn is_enabled(&self, user_id: &str) -> bool {
        self.settings
            .get(user_id)
            .is_some_and(|entry| entry.enabled)
    }

    /// Stores settings for a user, replacing any existing entry.
    pub fn put(&self, user_id: impl Into<String>, settings: MfaSettings) {
        self.settings.insert(user_id.into(), settings);
    }

    /// Marks a pending enrollment as enabled.
    ///
    /// Returns `false` if the user has no stored settings.
    pub fn enable(&self, user_id: &str) -> bool {
        match self.settings.get_mut(user_id) {
            Some(mut entry) => {
                entry.enabled = true;
                debug!(user = %user_id, "MFA enabled");
                true
            }
            None => false,
        }
    }

    /// Stamps the last successful verification time.
    ///
    /// Returns `false` if the user has no stored settings.
    pub fn touch(&self, user_id: &str) -> bool {
        match self.settings.get_mut(user_id) {
            Some(mut entry) => {
                entry.last_used_at = Some(OffsetDateTime::now_utc());
                true
            }
            None => false,
        }
    }

    /// Removes a user's settings entirely.
    ///
    /// Returns `true` if an entry existed.
    pub fn delete(&self, user_id: &str) -> bool {
        let removed = self.settings.remove(user_id).is_some();
        if removed {
            debug!(user = %user_id, "MFA disabled");
        }
        removed
    }

    /// Checks a submitted backup code and consumes it on a match.
    ///
    /// The whole check-and-replace runs under the entry lock: a concurrent
    /// attempt with the same code observes the already-shrunk set and fails.
    ///
    /// Returns `None` if the user has no stored settings.
    pub fn consume_backup_code(
        &self,
        user_id: &str,
        submitted: &str,
    ) -> Option<BackupCodeConsumption> {
        let mut entry = self.settings.get_mut(user_id)?;
        let check = verify_backup_code(&entry.backup_codes, submitted);
        let consumption = BackupCodeConsumption {
            valid: check.valid,
            remaining: check.remaining.len(),
        };
        if check.valid {
            entry.backup_codes = check.remaining;
            entry.last_used_at = Some(OffsetDateTime::now_utc());
            debug!(
                user = %user_id,
                remaining = consumption.remaining,
                "Backup code consumed"
            );
        }
        Some(consumption)
    }
}
