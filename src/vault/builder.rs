//! Offline bundle builder: plaintext query documents in, one vault out.
//!
//! Every document is sealed independently under a fresh salt (and so a
//! fresh key) and a fresh nonce.  Nothing is written until every
//! document has been sealed, so a failed build never leaves a partial
//! vault behind.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::format::{write_manifest, VaultManifest};
use super::query::{label_for, QueryItem};
use crate::crypto::{
    derive_key, generate_nonce, generate_salt, seal, DEFAULT_ITERATIONS, MIN_ITERATIONS,
};
use crate::errors::{QueryVaultError, Result};

/// Default extension of query documents.
pub const DEFAULT_EXTENSION: &str = "rq";

/// A plaintext query document read from the source directory.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub name: String,
    pub text: String,
}

/// Builds a `VaultManifest` from a directory of query documents.
#[derive(Debug, Clone)]
pub struct BundleBuilder {
    source_dir: PathBuf,
    extension: String,
    iterations: u32,
}

impl BundleBuilder {
    /// Builder for `source_dir` using the default extension and iterations.
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            extension: DEFAULT_EXTENSION.to_string(),
            iterations: DEFAULT_ITERATIONS,
        }
    }

    /// Only files ending in `.{extension}` are eligible.
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Read every eligible document, sorted by file name.
    ///
    /// Subdirectories are not descended.  Fails with `NoQueryDocuments`
    /// if nothing qualifies.
    pub fn collect_documents(&self) -> Result<Vec<SourceDocument>> {
        let mut documents = Vec::new();

        for entry in fs::read_dir(&self.source_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(name = ?raw, "Skipping query document with a non-UTF-8 file name");
                    continue;
                }
            };
            if !self.is_eligible(&name) {
                continue;
            }
            let text = fs::read_to_string(entry.path())?;
            documents.push(SourceDocument { name, text });
        }

        if documents.is_empty() {
            return Err(QueryVaultError::NoQueryDocuments(self.source_dir.clone()));
        }

        documents.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(documents)
    }

    /// Seal every eligible document into a manifest (nothing is written).
    pub fn build(&self, password: &[u8]) -> Result<VaultManifest> {
        if password.is_empty() {
            return Err(QueryVaultError::MissingPassword);
        }
        if self.iterations < MIN_ITERATIONS {
            return Err(QueryVaultError::KeyDerivationFailed(format!(
                "iterations must be at least {MIN_ITERATIONS} (got {})",
                self.iterations
            )));
        }

        let documents = self.collect_documents()?;
        self.seal_documents(&documents, password)
    }

    /// Build and atomically write the manifest to `output`.
    pub fn build_to(&self, password: &[u8], output: &Path) -> Result<VaultManifest> {
        let manifest = self.build(password)?;
        write_manifest(output, &manifest)?;
        info!(
            count = manifest.len(),
            output = %output.display(),
            "Vault written"
        );
        Ok(manifest)
    }

    /// Seal already-loaded documents.  Salts and nonces are re-rolled
    /// on the (astronomically unlikely) event of a repeat within a run.
    pub fn seal_documents(
        &self,
        documents: &[SourceDocument],
        password: &[u8],
    ) -> Result<VaultManifest> {
        if password.is_empty() {
            return Err(QueryVaultError::MissingPassword);
        }

        let mut names = HashSet::with_capacity(documents.len());
        let mut salts = HashSet::with_capacity(documents.len());
        let mut nonces = HashSet::with_capacity(documents.len());
        let mut items = Vec::with_capacity(documents.len());

        for doc in documents {
            if !names.insert(doc.name.as_str()) {
                return Err(QueryVaultError::DuplicateQuery(doc.name.clone()));
            }

            let mut salt = generate_salt();
            while !salts.insert(salt) {
                salt = generate_salt();
            }
            let mut nonce = generate_nonce();
            while !nonces.insert(nonce) {
                nonce = generate_nonce();
            }

            let key = derive_key(password, &salt, self.iterations)?;
            let ciphertext = seal(&key, &nonce, doc.text.as_bytes())?;
            debug!(name = %doc.name, size = doc.text.len(), "Query sealed");

            items.push(QueryItem {
                name: doc.name.clone(),
                label: label_for(&doc.name, &self.extension),
                salt: salt.to_vec(),
                nonce: nonce.to_vec(),
                ciphertext,
            });
        }

        Ok(VaultManifest::new(self.iterations, items))
    }

    fn is_eligible(&self, file_name: &str) -> bool {
        Path::new(file_name)
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(&self.extension))
    }
}
