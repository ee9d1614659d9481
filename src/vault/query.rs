//! `QueryItem`: one encrypted query document inside a vault.

use serde::{Deserialize, Serialize};

// Re-use the base64 serde helpers from format.rs (no duplication).
use super::format::{base64_decode, base64_encode};

/// A single encrypted query stored in the vault.
///
/// Each item has its own salt and therefore its own key, so the same
/// nonce value appearing in two items never reuses a (key, nonce) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryItem {
    /// Original file name, e.g. "q1.rq".  Unique within a vault.
    pub name: String,

    /// Display name: `name` without its extension.
    pub label: String,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    /// AES-GCM nonce, called `iv` on the wire.
    #[serde(
        rename = "iv",
        serialize_with = "base64_encode",
        deserialize_with = "base64_decode"
    )]
    pub nonce: Vec<u8>,

    /// Sealed document text, auth tag included.
    #[serde(
        rename = "data",
        serialize_with = "base64_encode",
        deserialize_with = "base64_decode"
    )]
    pub ciphertext: Vec<u8>,
}

/// Name and label of a query, without any ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOption {
    pub name: String,
    pub label: String,
}

/// Derive a display label by stripping a trailing `.{extension}`
/// (case-insensitive).  Names without that extension are returned as-is.
pub fn label_for(name: &str, extension: &str) -> String {
    let suffix_len = extension.len() + 1;
    if name.len() > suffix_len && name.is_char_boundary(name.len() - suffix_len) {
        let (stem, suffix) = name.split_at(name.len() - suffix_len);
        if suffix.starts_with('.') && suffix[1..].eq_ignore_ascii_case(extension) {
            return stem.to_string();
        }
    }
    name.to_string()
}
