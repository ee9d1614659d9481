//! AES-256-GCM authenticated encryption with an explicit nonce.
//!
//! Unlike a nonce-prefixed blob, the vault stores each item's nonce in
//! its own `iv` field, so `seal` and `open` take the nonce as an
//! argument.  The returned ciphertext carries the 16-byte auth tag at
//! its end.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;

use super::keys::DerivedKey;
use crate::errors::{QueryVaultError, Result};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Encrypt `plaintext` under `key` and `nonce`.
///
/// Never call this twice with the same (key, nonce) pair.
pub fn seal(key: &DerivedKey, nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    if nonce.len() != NONCE_LEN {
        return Err(QueryVaultError::EncryptionFailed(format!(
            "nonce must be {NONCE_LEN} bytes (got {})",
            nonce.len()
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| QueryVaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| QueryVaultError::EncryptionFailed(format!("encryption error: {e}")))
}

/// Decrypt and authenticate a ciphertext produced by `seal`.
///
/// Fails closed: a wrong key, a wrong nonce, a bad nonce length or any
/// modified byte all yield `DecryptionFailed`, never garbled plaintext.
pub fn open(key: &DerivedKey, nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if nonce.len() != NONCE_LEN || ciphertext.len() < TAG_LEN {
        return Err(QueryVaultError::DecryptionFailed);
    }

    let cipher =
        Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| QueryVaultError::DecryptionFailed)?;

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| QueryVaultError::DecryptionFailed)
}

/// Generate a random 12-byte nonce.
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce);
    nonce
}
