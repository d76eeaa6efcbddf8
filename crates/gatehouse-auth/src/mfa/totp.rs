//! TOTP generation and verification.
//!
//! RFC 6238 time-based codes: SHA-1, 6 digits, 30-second steps, with a
//! configurable skew window for client clock drift. Verification is fail
//! closed: malformed secrets or codes return `false`, never an error.

use totp_rs::{Algorithm, Secret, TOTP};

use crate::config::MfaConfig;
use crate::error::AuthError;

const DIGITS: usize = 6;
const STEP_SECONDS: u64 = 30;

/// Account label used when a TOTP instance is built only to check a code.
///
/// The label feeds the provisioning URI, not the code math, so any value
/// works here.
const VERIFY_ACCOUNT: &str = "user";

/// Issues secrets and verifies time-based one-time codes.
#[derive(Debug, Clone)]
pub struct TotpService {
    issuer: String,
    window_steps: u8,
}

impl TotpService {
    /// Creates a TOTP service from the MFA configuration.
    #[must_use]
    pub fn new(config: &MfaConfig) -> Self {
        Self {
            issuer: config.issuer.clone(),
            window_steps: config.window_steps,
        }
    }

    /// Generates a fresh base32-encoded shared secret.
    ///
    /// 160 bits of entropy, the classic TOTP secret size.
    #[must_use]
    pub fn generate_secret(&self) -> String {
        match Secret::generate_secret().to_encoded() {
            Secret::Encoded(value) => value,
            other => other.to_string(),
        }
    }

    /// Builds the `otpauth://` provisioning URI for authenticator apps.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MfaNotConfigured`] if the stored secret is not
    /// usable TOTP material.
    pub fn provisioning_uri(&self, secret: &str, account: &str) -> Result<String, AuthError> {
        self.build(secret, account)
            .map(|totp| totp.get_url())
            .ok_or(AuthError::MfaNotConfigured)
    }

    /// Checks a submitted code against the current time.
    ///
    /// Accepts codes from the current 30-second step and `window_steps`
    /// adjacent steps on either side. Returns `false` on any malformed
    /// input.
    #[must_use]
    pub fn verify(&self, secret: &str, code: &str) -> bool {
        self.build(secret, VERIFY_ACCOUNT)
            .map(|totp| totp.check_current(code).unwrap_or(false))
            .unwrap_or(false)
    }

    /// Checks a submitted code against an explicit Unix timestamp.
    #[must_use]
    pub fn verify_at(&self, secret: &str, code: &str, timestamp: u64) -> bool {
        self.build(secret, VERIFY_ACCOUNT)
            .map(|totp| totp.check(code, timestamp))
            .unwrap_or(false)
    }

    fn build(&self, secret: &str, account: &str) -> Option<TOTP> {
        let bytes = Secret::Encoded(secret.to_string()).to_bytes().ok()?;
        TOTP::new(
            Algorithm::SHA1,
            DIGITS,
            self.window_steps,
            STEP_SECONDS,
            bytes,
            Some(self.issuer.clone()),
            account.to_string(),
        )
        .ok()
    }
}
