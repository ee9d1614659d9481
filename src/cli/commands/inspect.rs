//! `queryvault inspect` — show vault parameters without a password.

use console::style;

use crate::cli::{output, vault_path};
use crate::config::Settings;
use crate::errors::Result;
use crate::vault::read_manifest;

/// Execute the `inspect` command.
pub fn execute(vault: Option<&str>) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    let path = vault_path(&cwd, &settings, vault);

    let manifest = read_manifest(&path)?;

    println!("{} {}", style("Vault:").bold(), path.display());
    println!(
        "{} {}/{} ({} iterations)",
        style("KDF:").bold(),
        manifest.kdf.name,
        manifest.kdf.hash,
        manifest.kdf.iterations
    );
    println!(
        "{} {} (iv {} bytes, key {} bits)",
        style("Cipher:").bold(),
        manifest.cipher.name,
        manifest.cipher.iv_length,
        manifest.cipher.key_length
    );

    output::info(&format!(
        "format v{} — {} quer{}",
        manifest.version,
        manifest.len(),
        if manifest.len() == 1 { "y" } else { "ies" }
    ));
    output::print_options_table(&manifest.query_options());

    Ok(())
}
