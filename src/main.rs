use clap::Parser;
use queryvault::cli::{Cli, Commands};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Build {
            ref source,
            ref output,
            iterations,
        } => queryvault::cli::commands::build::execute(
            source.as_deref(),
            output.as_deref(),
            iterations,
        ),
        Commands::Inspect { ref vault } => {
            queryvault::cli::commands::inspect::execute(vault.as_deref())
        }
        Commands::Unlock {
            ref vault,
            ref verifier,
            ref marker,
            ref show,
        } => queryvault::cli::commands::unlock::execute(
            vault.as_deref(),
            verifier.as_deref(),
            marker.as_deref(),
            show.as_deref(),
        ),
        #[cfg(feature = "audit-log")]
        Commands::Audit {
            last,
            ref since,
            ref outcome,
            summary,
        } => queryvault::cli::commands::audit_cmd::execute(
            last,
            since.as_deref(),
            outcome.as_deref(),
            summary,
        ),
        #[cfg(not(feature = "audit-log"))]
        Commands::Audit { .. } => Err(queryvault::errors::QueryVaultError::AuditError(
            "built without the audit-log feature".into(),
        )),
    };

    if let Err(e) = result {
        queryvault::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
