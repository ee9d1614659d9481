//! `queryvault build` — encrypt a directory of query documents into a vault.

use crate::cli::output;
use crate::cli::build_password;
use crate::config::Settings;
use crate::errors::Result;
use crate::vault::BundleBuilder;

/// Execute the `build` command.
pub fn execute(
    source: Option<&str>,
    output_flag: Option<&str>,
    iterations: Option<u32>,
) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;

    let source_dir = match source {
        Some(dir) => cwd.join(dir),
        None => settings.source_path(&cwd),
    };
    let output_path = crate::cli::vault_path(&cwd, &settings, output_flag);

    // 1. The password must come from the environment or a prompt.
    let password = build_password()?;

    // 2. Seal everything, then write once.
    let builder = BundleBuilder::new(&source_dir)
        .extension(&settings.extension)
        .iterations(iterations.unwrap_or(settings.kdf_iterations));
    let manifest = builder.build_to(password.as_bytes(), &output_path)?;

    // 3. Audit log.
    #[cfg(feature = "audit-log")]
    if let Some(audit) = crate::cli::audit_log(&settings, &cwd) {
        audit.record_build(&output_path, manifest.len());
    }

    output::success(&format!(
        "Wrote {} encrypted queries to {}",
        manifest.len(),
        output_path.display()
    ));
    output::tip("Run `queryvault inspect` to list the queries in the vault.");

    Ok(())
}
