//! The vault document: a versioned, self-describing JSON manifest.
//!
//! ```text
//! {
//!   "version": 1,
//!   "kdf": { "name": "PBKDF2", "hash": "SHA-256", "iterations": 210000 },
//!   "cipher": { "name": "AES-GCM", "ivLength": 12, "keyLength": 256 },
//!   "queries": [ { "name", "label", "salt", "iv", "data" }, ... ]
//! }
//! ```
//!
//! All binary fields are base64 text.  The document holds no key
//! material; its secrecy rests entirely on the build password.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::query::{QueryItem, QueryOption};
use crate::crypto::{KEY_LEN, NONCE_LEN, SALT_LEN};
use crate::errors::{QueryVaultError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Current manifest format version.
pub const CURRENT_VERSION: u32 = 1;

pub const KDF_NAME: &str = "PBKDF2";
pub const KDF_HASH: &str = "SHA-256";
pub const CIPHER_NAME: &str = "AES-GCM";

/// Key length as recorded in the manifest (bits).
pub const KEY_LENGTH_BITS: usize = KEY_LEN * 8;

// ---------------------------------------------------------------------------
// Parameter blocks
// ---------------------------------------------------------------------------

/// KDF parameters stored in the manifest so unlock re-derives with the
/// exact settings used at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub name: String,
    pub hash: String,
    pub iterations: u32,
}

impl KdfParams {
    pub fn pbkdf2_sha256(iterations: u32) -> Self {
        Self {
            name: KDF_NAME.to_string(),
            hash: KDF_HASH.to_string(),
            iterations,
        }
    }
}

/// Cipher parameters.  `ivLength` is in bytes, `keyLength` in bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CipherParams {
    pub name: String,
    pub iv_length: usize,
    pub key_length: usize,
}

impl Default for CipherParams {
    fn default() -> Self {
        Self {
            name: CIPHER_NAME.to_string(),
            iv_length: NONCE_LEN,
            key_length: KEY_LENGTH_BITS,
        }
    }
}

// ---------------------------------------------------------------------------
// VaultManifest
// ---------------------------------------------------------------------------

/// The complete vault document.  Built once, loaded once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultManifest {
    pub version: u32,
    pub kdf: KdfParams,
    pub cipher: CipherParams,
    /// Sorted by `name`.
    #[serde(rename = "queries")]
    pub items: Vec<QueryItem>,
}

impl VaultManifest {
    /// Assemble a manifest at the current version, sorting `items` by name.
    pub fn new(iterations: u32, mut items: Vec<QueryItem>) -> Self {
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            version: CURRENT_VERSION,
            kdf: KdfParams::pbkdf2_sha256(iterations),
            cipher: CipherParams::default(),
            items,
        }
    }

    /// Parse and validate a manifest from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let manifest: VaultManifest = serde_json::from_str(text)
            .map_err(|e| QueryVaultError::InvalidVaultFormat(format!("manifest JSON: {e}")))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Serialize as pretty-printed JSON with a trailing newline.
    pub fn to_json(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(self)
            .map_err(|e| QueryVaultError::SerializationError(format!("manifest: {e}")))?;
        text.push('\n');
        Ok(text)
    }

    /// Check that this manifest is one we know how to decrypt.
    ///
    /// Per-item nonce problems are left to `open`, which rejects them
    /// the same way it rejects a wrong key.
    pub fn validate(&self) -> Result<()> {
        if self.version != CURRENT_VERSION {
            return Err(QueryVaultError::InvalidVaultFormat(format!(
                "unsupported version {}, expected {CURRENT_VERSION}",
                self.version
            )));
        }
        if self.kdf.name != KDF_NAME || self.kdf.hash != KDF_HASH {
            return Err(QueryVaultError::InvalidVaultFormat(format!(
                "unsupported KDF {}/{}",
                self.kdf.name, self.kdf.hash
            )));
        }
        if self.kdf.iterations == 0 {
            return Err(QueryVaultError::InvalidVaultFormat(
                "KDF iterations must be positive".into(),
            ));
        }
        if self.cipher != CipherParams::default() {
            return Err(QueryVaultError::InvalidVaultFormat(format!(
                "unsupported cipher {} (iv {} bytes, key {} bits)",
                self.cipher.name, self.cipher.iv_length, self.cipher.key_length
            )));
        }

        let mut seen = std::collections::HashSet::with_capacity(self.items.len());
        for item in &self.items {
            if !seen.insert(item.name.as_str()) {
                return Err(QueryVaultError::InvalidVaultFormat(format!(
                    "duplicate query name '{}'",
                    item.name
                )));
            }
            if item.salt.len() < SALT_LEN {
                return Err(QueryVaultError::InvalidVaultFormat(format!(
                    "query '{}' has a {}-byte salt, expected {SALT_LEN}",
                    item.name,
                    item.salt.len()
                )));
            }
        }

        Ok(())
    }

    /// Look up an item by name.
    pub fn get(&self, name: &str) -> Option<&QueryItem> {
        self.items.iter().find(|item| item.name == name)
    }

    /// `(name, label)` pairs, available before any password is entered.
    pub fn query_options(&self) -> Vec<QueryOption> {
        self.items
            .iter()
            .map(|item| QueryOption {
                name: item.name.clone(),
                label: item.label.clone(),
            })
            .collect()
    }

    /// Number of queries in the vault.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the vault holds no queries.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Disk I/O
// ---------------------------------------------------------------------------

/// Write a manifest to disk **atomically**.
///
/// The document is written to a temp file in the same directory and
/// renamed over `path`, so readers never see a half-written vault.
pub fn write_manifest(path: &Path, manifest: &VaultManifest) -> Result<()> {
    let text = manifest.to_json()?;

    let parent = path.parent().unwrap_or(Path::new("."));
    if !parent.as_os_str().is_empty() && !parent.exists() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    fs::write(&tmp_path, text)?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    Ok(())
}

/// Read and validate a manifest from disk.
pub fn read_manifest(path: &Path) -> Result<VaultManifest> {
    if !path.exists() {
        return Err(QueryVaultError::VaultNotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    VaultManifest::from_json(&text)
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let encoded = BASE64.encode(data);
    serializer.serialize_str(&encoded)
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
