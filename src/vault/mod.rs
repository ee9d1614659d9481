//! Vault module — the encrypted query bundle.
//!
//! This module provides:
//! - The `QueryItem` record and label helper (`query`)
//! - The JSON manifest schema and atomic disk I/O (`format`)
//! - The offline `BundleBuilder` (`builder`)

pub mod builder;
pub mod format;
pub mod query;

// Re-export the most commonly used items.
pub use builder::{BundleBuilder, SourceDocument};
pub use format::{read_manifest, write_manifest, CipherParams, KdfParams, VaultManifest};
pub use query::{label_for, QueryItem, QueryOption};
