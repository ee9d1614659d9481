//! `queryvault audit`: the build and unlock history of this project.
//!
//! ```text
//! queryvault audit                            # last 50 events
//! queryvault audit --outcome manifest_corrupt # damaged-vault unlocks only
//! queryvault audit --since 7d --summary       # totals per outcome
//! ```

use chrono::{DateTime, TimeDelta, Utc};
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::audit::{AuditEvent, AuditLog, AuditOutcome, EventFilter, OutcomeCount};
use crate::cli::output;
use crate::config::Settings;
use crate::errors::{QueryVaultError, Result};

/// Execute the `audit` command.
pub fn execute(
    last: usize,
    since: Option<&str>,
    outcome: Option<&str>,
    summary: bool,
) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    let state_dir = settings.state_path(&cwd);

    let since = since.map(parse_since).transpose()?;
    let outcome = outcome.map(parse_outcome).transpose()?;

    if !AuditLog::path_in(&state_dir).exists() {
        output::info("Nothing recorded yet.");
        return Ok(());
    }
    let audit = AuditLog::open(&state_dir)
        .ok_or_else(|| QueryVaultError::AuditError("cannot open the audit database".into()))?;

    if summary {
        let counts = audit.summary(since)?;
        if counts.is_empty() {
            output::info("Nothing recorded in that period.");
            return Ok(());
        }
        print_summary(&counts);
        if let Some(id) = audit.last_attempt_with(AuditOutcome::ManifestCorrupt)? {
            output::warning(&format!(
                "Attempt {id} verified the password but hit an undecryptable query; \
                 rebuild the vault."
            ));
        }
        return Ok(());
    }

    let events = audit.events(&EventFilter {
        limit: last,
        since,
        outcome,
    })?;
    if events.is_empty() {
        output::info("No matching events.");
        return Ok(());
    }
    print_events(&events);
    Ok(())
}

/// Turn `90s`, `30m`, `24h`, `7d` or `2w` into the instant that long ago.
fn parse_since(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    let invalid = || {
        QueryVaultError::CommandFailed(format!(
            "cannot read '{input}' as a duration; try 90s, 30m, 24h, 7d or 2w"
        ))
    };

    let unit = input.chars().last().ok_or_else(invalid)?;
    let amount: i64 = input[..input.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| invalid())?;
    if amount < 0 {
        return Err(invalid());
    }

    let span = match unit {
        's' => TimeDelta::try_seconds(amount),
        'm' => TimeDelta::try_minutes(amount),
        'h' => TimeDelta::try_hours(amount),
        'd' => TimeDelta::try_days(amount),
        'w' => TimeDelta::try_weeks(amount),
        _ => None,
    }
    .ok_or_else(invalid)?;

    Utc::now().checked_sub_signed(span).ok_or_else(invalid)
}

fn parse_outcome(input: &str) -> Result<AuditOutcome> {
    AuditOutcome::parse(input).ok_or_else(|| {
        let known: Vec<_> = AuditOutcome::ALL.iter().map(|o| o.as_str()).collect();
        QueryVaultError::CommandFailed(format!(
            "unknown outcome '{input}'; expected one of {}",
            known.join(", ")
        ))
    })
}

fn print_events(events: &[AuditEvent]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Attempt", "Outcome", "Queries", "Item", "Vault"]);

    for event in events {
        table.add_row(vec![
            event.at.format("%Y-%m-%d %H:%M:%S").to_string(),
            event.attempt.map_or_else(|| "-".into(), |a| format!("#{a}")),
            paint(event.outcome),
            event.queries.map_or_else(|| "-".into(), |q| q.to_string()),
            event.item.clone().unwrap_or_else(|| "-".into()),
            event.vault.clone(),
        ]);
    }

    println!("{}", style(format!("{} events", events.len())).bold());
    println!("{table}");
}

fn print_summary(counts: &[OutcomeCount]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Outcome", "Count", "Last seen"]);

    for count in counts {
        table.add_row(vec![
            paint(count.outcome),
            count.count.to_string(),
            count.last_seen.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }
    println!("{table}");
}

fn paint(outcome: AuditOutcome) -> String {
    let label = style(outcome.as_str());
    let label = match outcome {
        AuditOutcome::Built => label.blue(),
        AuditOutcome::Verified => label.green(),
        AuditOutcome::WrongPassword => label.yellow(),
        AuditOutcome::Superseded => label.dim(),
        AuditOutcome::ManifestCorrupt => label.red(),
    };
    if outcome.is_alarming() {
        label.bold().to_string()
    } else {
        label.to_string()
    }
}
