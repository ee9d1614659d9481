//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use clap::Parser;

use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{QueryVaultError, Result};

/// Environment variable holding the vault password.
pub const PASSWORD_ENV: &str = "QUERY_PASSWORD";

/// QueryVault CLI: password-gated bundles of encrypted SPARQL queries.
#[derive(Parser)]
#[command(
    name = "queryvault",
    about = "Encrypt query documents into a password-gated vault",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Encrypt every query document into a vault file (password from QUERY_PASSWORD)
    Build {
        /// Directory of plaintext query documents (default: src/queries)
        #[arg(short, long)]
        source: Option<String>,

        /// Vault file to write (default: src/queries/queries.encrypted.json)
        #[arg(short, long)]
        output: Option<String>,

        /// PBKDF2 iteration count (default: 210000)
        #[arg(long)]
        iterations: Option<u32>,
    },

    /// Show vault parameters and query names without a password
    Inspect {
        /// Vault file to read
        #[arg(long)]
        vault: Option<String>,
    },

    /// Verify the password and decrypt every query
    Unlock {
        /// Vault file to read
        #[arg(long)]
        vault: Option<String>,

        /// Query whose first line proves the password
        #[arg(long)]
        verifier: Option<String>,

        /// Required first line of the verifier query
        #[arg(long)]
        marker: Option<String>,

        /// Print the plaintext of this query instead of the summary table
        #[arg(long)]
        show: Option<String>,
    },

    /// Show the build and unlock history, one row per attempt
    Audit {
        /// Number of events to show
        #[arg(long, default_value = "50")]
        last: usize,

        /// Only events newer than this (e.g. 90s, 30m, 24h, 7d, 2w)
        #[arg(long)]
        since: Option<String>,

        /// Only one outcome: built, verified, wrong_password, manifest_corrupt, superseded
        #[arg(long)]
        outcome: Option<String>,

        /// Totals per outcome instead of individual events
        #[arg(long)]
        summary: bool,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Get the build password, trying in order:
/// 1. `QUERY_PASSWORD` env var (CI/CD)
/// 2. Interactive prompt with confirmation, if a terminal is attached
///
/// Never taken from a command-line argument.  Returns `Zeroizing<String>`
/// so the password is wiped from memory on drop.
pub fn build_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        return Ok(pw);
    }
    if !console::user_attended_stderr() {
        return Err(QueryVaultError::MissingPassword);
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Choose vault password")
        .with_confirmation("Confirm vault password", "Passwords do not match, try again")
        .interact()
        .map_err(|e| QueryVaultError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Get the unlock password from `QUERY_PASSWORD` or an interactive prompt.
pub fn unlock_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        return Ok(pw);
    }
    if !console::user_attended_stderr() {
        return Err(QueryVaultError::MissingPassword);
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter vault password")
        .allow_empty_password(true)
        .interact()
        .map_err(|e| QueryVaultError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

fn password_from_env() -> Option<Zeroizing<String>> {
    match std::env::var(PASSWORD_ENV) {
        Ok(pw) if !pw.is_empty() => Some(Zeroizing::new(pw)),
        _ => None,
    }
}

/// Resolve the vault path: explicit flag, else the configured output.
pub fn vault_path(cwd: &Path, settings: &Settings, flag: Option<&str>) -> PathBuf {
    match flag {
        Some(path) => cwd.join(path),
        None => settings.output_path(cwd),
    }
}

/// The project's audit log, if it can be opened.
#[cfg(feature = "audit-log")]
pub fn audit_log(settings: &Settings, cwd: &Path) -> Option<crate::audit::AuditLog> {
    crate::audit::AuditLog::open(&settings.state_path(cwd))
}
