//! Password-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! The iteration count is deliberately expensive and travels with the
//! vault (see `vault::format::KdfParams`) so a rebuilt vault can raise
//! it without breaking readers.

use hmac::Hmac;
use rand::RngCore;
use sha2::Sha256;

use super::keys::{DerivedKey, KEY_LEN};
use crate::errors::{QueryVaultError, Result};

/// Length of the salt in bytes (128 bits).
pub const SALT_LEN: usize = 16;

/// Reference iteration count for new vaults.
pub const DEFAULT_ITERATIONS: u32 = 210_000;

/// Lowest iteration count the builder accepts.
pub const MIN_ITERATIONS: u32 = 1_000;

/// Derive a 32-byte key from a password and salt.
///
/// The same password + salt + iterations always produce the same key.
/// Fails on an empty password, a salt shorter than `SALT_LEN`, or zero
/// iterations; there is no data-dependent failure otherwise.
pub fn derive_key(password: &[u8], salt: &[u8], iterations: u32) -> Result<DerivedKey> {
    if password.is_empty() {
        return Err(QueryVaultError::KeyDerivationFailed(
            "password cannot be empty".into(),
        ));
    }
    if salt.len() < SALT_LEN {
        return Err(QueryVaultError::KeyDerivationFailed(format!(
            "salt must be at least {SALT_LEN} bytes (got {})",
            salt.len()
        )));
    }
    if iterations < 1 {
        return Err(QueryVaultError::KeyDerivationFailed(
            "iterations must be at least 1".into(),
        ));
    }

    let mut key = DerivedKey::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2::<Hmac<Sha256>>(password, salt, iterations, key.as_bytes_mut())
        .map_err(|e| QueryVaultError::KeyDerivationFailed(format!("PBKDF2 failed: {e}")))?;

    Ok(key)
}

/// Generate a cryptographically random 16-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}
