//! Backup recovery codes.
//!
//! Each code is 5 random bytes, hex-encoded and uppercased: 10 characters of
//! hex. Verification normalizes the submitted value first, so users can type
//! codes with dashes, spaces, or lowercase letters.

use rand::RngCore;
use rand::rngs::OsRng;

const BACKUP_CODE_BYTES: usize = 5;

/// Outcome of checking a submitted code against a code set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupCodeCheck {
    /// Whether the submitted code matched.
    pub valid: bool,

    /// The code set after the check. On a match this is the original set
    /// minus the consumed entry; otherwise it is unchanged.
    pub remaining: Vec<String>,
}

/// Generates `count` fresh backup codes.
#[must_use]
pub fn generate_backup_codes(count: usize) -> Vec<String> {
    let mut rng = OsRng;
    (0..count)
        .map(|_| {
            let mut raw = [0u8; BACKUP_CODE_BYTES];
            rng.fill_bytes(&mut raw);
            hex::encode_upper(raw)
        })
        .collect()
}

/// Normalizes a submitted backup code: strips everything that is not a hex
/// digit and uppercases the rest.
#[must_use]
pub fn normalize_backup_code(input: &str) -> String {
    input
        .chars()
        .filter(char::is_ascii_hexdigit)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Checks a submitted code against the code set.
///
/// Pure function: the caller owns publishing `remaining` atomically so
/// concurrent readers never observe a half-consumed set.
#[must_use]
pub fn verify_backup_code(codes: &[String], submitted: &str) -> BackupCodeCheck {
    let normalized = normalize_backup_code(submitted);
    match codes.iter().position(|code| *code == normalized) {
        Some(index) => {
            let mut remaining = codes.to_vec();
            remaining.remove(index);
            BackupCodeCheck {
                valid: true,
                remaining,
            }
        }
        None => BackupCodeCheck {
            valid: false,
            remaining: codes.to_vec(),
        },
    }
}
