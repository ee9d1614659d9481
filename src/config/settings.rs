use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::DEFAULT_ITERATIONS;
use crate::errors::{QueryVaultError, Result};
use crate::unlock::Verifier;
use crate::vault::builder::DEFAULT_EXTENSION;

/// Project-level configuration, loaded from `.queryvault.toml`.
///
/// Every field has a sensible default so QueryVault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory (relative to project root) holding plaintext query documents.
    #[serde(default = "default_source_dir")]
    pub source_dir: String,

    /// Where the vault document is written (relative to project root).
    #[serde(default = "default_output")]
    pub output: String,

    /// Extension of eligible query documents, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// PBKDF2 iteration count for new vaults.
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Name of the query the password is verified against.
    #[serde(default = "default_verifier_name")]
    pub verifier_name: String,

    /// Required first line of the verifier query.
    #[serde(default = "default_verifier_marker")]
    pub verifier_marker: String,

    /// Directory for local state such as the audit log.
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_source_dir() -> String {
    "src/queries".to_string()
}

fn default_output() -> String {
    "src/queries/queries.encrypted.json".to_string()
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

fn default_kdf_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

fn default_verifier_name() -> String {
    "CWD Requirements VS1 & VS2 B6.rq".to_string()
}

fn default_verifier_marker() -> String {
    "# Requirements VS1 & VS2 => 6 (CW&D)".to_string()
}

fn default_state_dir() -> String {
    ".queryvault".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            output: default_output(),
            extension: default_extension(),
            kdf_iterations: default_kdf_iterations(),
            verifier_name: default_verifier_name(),
            verifier_marker: default_verifier_marker(),
            state_dir: default_state_dir(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    const FILE_NAME: &'static str = ".queryvault.toml";

    /// Load settings from `<project_dir>/.queryvault.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            QueryVaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    pub fn source_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.source_dir)
    }

    pub fn output_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.output)
    }

    pub fn state_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.state_dir)
    }

    /// The verifier configured for unlock.
    pub fn verifier(&self) -> Verifier {
        Verifier::new(&self.verifier_name, &self.verifier_marker)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
