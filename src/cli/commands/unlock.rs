//! `queryvault unlock` — verify the password and decrypt every query.

use crate::cli::output;
use crate::cli::{unlock_password, vault_path};
use crate::config::Settings;
use crate::errors::{QueryVaultError, Result};
use crate::unlock::{UnlockController, UnlockOutcome};
use crate::vault::read_manifest;

/// Execute the `unlock` command.
pub fn execute(
    vault: Option<&str>,
    verifier_name: Option<&str>,
    marker: Option<&str>,
    show: Option<&str>,
) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    let path = vault_path(&cwd, &settings, vault);

    // 1. Load the manifest and resolve the verifier.
    let manifest = read_manifest(&path)?;
    let mut verifier = settings.verifier();
    if let Some(name) = verifier_name {
        verifier.name = name.to_string();
    }
    if let Some(marker) = marker {
        verifier.marker = marker.to_string();
    }
    if manifest.get(&verifier.name).is_none() {
        output::warning(&format!(
            "'{}' is not in this vault; verifying against the first query instead.",
            verifier.name
        ));
    }

    // 2. Run a single attempt to completion.
    let password = unlock_password()?;
    let mut controller = UnlockController::new(manifest, verifier);
    let runtime = tokio::runtime::Runtime::new()?;
    let outcome = runtime.block_on(controller.submit_password(&password))?;

    // The record keeps what the user is not told: corrupt vs wrong password.
    #[cfg(feature = "audit-log")]
    if let (Some(audit), Some(record)) = (
        crate::cli::audit_log(&settings, &cwd),
        controller.last_record(),
    ) {
        audit.record_attempt(&path, record);
    }

    match outcome {
        UnlockOutcome::Unlocked { .. } => {}
        UnlockOutcome::Rejected(_) => return Err(QueryVaultError::PasswordIncorrect),
        // Nothing newer can exist with a single attempt.
        UnlockOutcome::Superseded => return Ok(()),
    }

    // 3. Print the requested query, or the summary.
    let set = controller
        .queries()
        .ok_or(QueryVaultError::PasswordIncorrect)?;

    match show {
        Some(name) => {
            let text = set
                .text(name)
                .ok_or_else(|| QueryVaultError::QueryNotFound(name.to_string()))?;
            print!("{text}");
            if !text.ends_with('\n') {
                println!();
            }
        }
        None => {
            output::success(&format!("Unlocked {} queries", set.len()));
            output::print_queries_table(&set);
            output::tip("Run `queryvault unlock --show <NAME>` to print a query.");
        }
    }

    Ok(())
}
