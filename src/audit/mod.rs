//! Build and unlock history, kept in `<state_dir>/audit.db`.
//!
//! One row per vault build and one per unlock attempt the controller
//! resolved.  Attempts keep their controller id and the outcome class the
//! controller saw, so an operator can tell a mistyped password from a
//! damaged vault even though the person at the prompt was told the same
//! thing for both.  Passwords and plaintext never reach this table.
//!
//! The log is best effort.  `AuditLog::open` returns `None` when the
//! database is unusable and writers drop their rows silently.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::errors::{QueryVaultError, Result};
use crate::unlock::{AttemptClass, AttemptRecord};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS vault_events (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    at        TEXT    NOT NULL,
    vault     TEXT    NOT NULL,
    attempt   INTEGER,
    outcome   TEXT    NOT NULL,
    queries   INTEGER,
    item      TEXT
);
CREATE INDEX IF NOT EXISTS vault_events_outcome ON vault_events (outcome, at);
";

/// How a recorded event ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditOutcome {
    /// A vault was written by the builder.
    Built,
    Verified,
    WrongPassword,
    /// The verifier passed but another query did not decrypt.
    ManifestCorrupt,
    /// A newer attempt was started before this one resolved.
    Superseded,
}

impl AuditOutcome {
    pub const ALL: [AuditOutcome; 5] = [
        AuditOutcome::Built,
        AuditOutcome::Verified,
        AuditOutcome::WrongPassword,
        AuditOutcome::ManifestCorrupt,
        AuditOutcome::Superseded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AuditOutcome::Built => "built",
            AuditOutcome::Verified => "verified",
            AuditOutcome::WrongPassword => "wrong_password",
            AuditOutcome::ManifestCorrupt => "manifest_corrupt",
            AuditOutcome::Superseded => "superseded",
        }
    }

    /// Accepts the stored spelling, with `-` allowed in place of `_`.
    pub fn parse(text: &str) -> Option<Self> {
        let wanted = text.trim().replace('-', "_");
        Self::ALL.into_iter().find(|o| o.as_str() == wanted)
    }

    /// Outcomes that deserve an operator's attention.
    pub fn is_alarming(self) -> bool {
        matches!(self, AuditOutcome::ManifestCorrupt)
    }
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&AttemptClass> for AuditOutcome {
    fn from(class: &AttemptClass) -> Self {
        match class {
            AttemptClass::Verified { .. } => AuditOutcome::Verified,
            AttemptClass::WrongPassword => AuditOutcome::WrongPassword,
            AttemptClass::ManifestCorrupt { .. } => AuditOutcome::ManifestCorrupt,
            AttemptClass::Superseded => AuditOutcome::Superseded,
        }
    }
}

/// One stored event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    pub id: i64,
    pub at: DateTime<Utc>,
    pub vault: String,
    /// Controller attempt id; `None` for builds.
    pub attempt: Option<u64>,
    pub outcome: AuditOutcome,
    /// Queries written by a build or published by an unlock.
    pub queries: Option<usize>,
    /// The query that failed to decrypt, for `ManifestCorrupt`.
    pub item: Option<String>,
}

/// Which events `AuditLog::events` returns.
#[derive(Debug, Clone)]
pub struct EventFilter {
    pub limit: usize,
    pub since: Option<DateTime<Utc>>,
    pub outcome: Option<AuditOutcome>,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            limit: 50,
            since: None,
            outcome: None,
        }
    }
}

/// Per-outcome totals for `queryvault audit --summary`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeCount {
    pub outcome: AuditOutcome,
    pub count: u64,
    pub last_seen: DateTime<Utc>,
}

/// SQLite-backed event log.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    pub const FILE_NAME: &'static str = "audit.db";

    /// Location of the database under `state_dir`.
    pub fn path_in(state_dir: &Path) -> PathBuf {
        state_dir.join(Self::FILE_NAME)
    }

    /// Open or create the database, creating `state_dir` first.
    pub fn open(state_dir: &Path) -> Option<Self> {
        std::fs::create_dir_all(state_dir).ok()?;
        let path = Self::path_in(state_dir);
        let conn = match Connection::open(&path) {
            Ok(conn) => conn,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Audit log unavailable");
                return None;
            }
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600));
        }

        conn.execute_batch(SCHEMA).ok()?;
        Some(Self { conn })
    }

    /// Record a finished build.
    pub fn record_build(&self, vault: &Path, queries: usize) {
        self.insert(vault, None, AuditOutcome::Built, Some(queries), None);
    }

    /// Record a resolved unlock attempt, superseded ones included.
    pub fn record_attempt(&self, vault: &Path, record: &AttemptRecord) {
        let (queries, item) = match &record.class {
            AttemptClass::Verified { queries } => (Some(*queries), None),
            AttemptClass::ManifestCorrupt { item } => (None, Some(item.as_str())),
            AttemptClass::WrongPassword | AttemptClass::Superseded => (None, None),
        };
        self.insert(
            vault,
            Some(record.attempt),
            AuditOutcome::from(&record.class),
            queries,
            item,
        );
    }

    fn insert(
        &self,
        vault: &Path,
        attempt: Option<u64>,
        outcome: AuditOutcome,
        queries: Option<usize>,
        item: Option<&str>,
    ) {
        let result = self.conn.execute(
            "INSERT INTO vault_events (at, vault, attempt, outcome, queries, item)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                timestamp(Utc::now()),
                vault.display().to_string(),
                attempt.and_then(|a| i64::try_from(a).ok()),
                outcome.as_str(),
                queries.and_then(|q| i64::try_from(q).ok()),
                item,
            ],
        );
        if let Err(e) = result {
            debug!(error = %e, outcome = %outcome, "Audit event dropped");
        }
    }

    /// Most recent events first.
    pub fn events(&self, filter: &EventFilter) -> Result<Vec<AuditEvent>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, at, vault, attempt, outcome, queries, item
                 FROM vault_events
                 WHERE (?1 IS NULL OR at >= ?1) AND (?2 IS NULL OR outcome = ?2)
                 ORDER BY id DESC
                 LIMIT ?3",
            )
            .map_err(audit_error)?;

        let rows = stmt
            .query_map(
                params![
                    filter.since.map(timestamp),
                    filter.outcome.map(AuditOutcome::as_str),
                    i64::try_from(filter.limit).unwrap_or(i64::MAX),
                ],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<i64>>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Option<i64>>(5)?,
                        row.get::<_, Option<String>>(6)?,
                    ))
                },
            )
            .map_err(audit_error)?;

        let mut events = Vec::new();
        for row in rows {
            let (id, at, vault, attempt, outcome, queries, item) = row.map_err(audit_error)?;
            let outcome = AuditOutcome::parse(&outcome).ok_or_else(|| {
                QueryVaultError::AuditError(format!("unknown outcome '{outcome}' in row {id}"))
            })?;
            events.push(AuditEvent {
                id,
                at: parse_timestamp(&at)?,
                vault,
                attempt: attempt.and_then(|a| u64::try_from(a).ok()),
                outcome,
                queries: queries.and_then(|q| usize::try_from(q).ok()),
                item,
            });
        }
        Ok(events)
    }

    /// Count events per outcome, most frequent first.
    pub fn summary(&self, since: Option<DateTime<Utc>>) -> Result<Vec<OutcomeCount>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT outcome, COUNT(*), MAX(at)
                 FROM vault_events
                 WHERE ?1 IS NULL OR at >= ?1
                 GROUP BY outcome
                 ORDER BY COUNT(*) DESC, outcome",
            )
            .map_err(audit_error)?;

        let rows = stmt
            .query_map(params![since.map(timestamp)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(audit_error)?;

        let mut counts = Vec::new();
        for row in rows {
            let (outcome, count, last_seen) = row.map_err(audit_error)?;
            let Some(outcome) = AuditOutcome::parse(&outcome) else {
                continue;
            };
            counts.push(OutcomeCount {
                outcome,
                count: u64::try_from(count).unwrap_or_default(),
                last_seen: parse_timestamp(&last_seen)?,
            });
        }
        Ok(counts)
    }

    /// Attempt id of the most recent event with `outcome`, if any.
    pub fn last_attempt_with(&self, outcome: AuditOutcome) -> Result<Option<u64>> {
        let attempt: Option<Option<i64>> = self
            .conn
            .query_row(
                "SELECT attempt FROM vault_events WHERE outcome = ?1 ORDER BY id DESC LIMIT 1",
                params![outcome.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(audit_error)?;
        Ok(attempt.flatten().and_then(|a| u64::try_from(a).ok()))
    }
}

/// Fixed-width UTC so that text comparison orders by time.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| QueryVaultError::AuditError(format!("bad timestamp '{text}': {e}")))
}

fn audit_error(e: rusqlite::Error) -> QueryVaultError {
    QueryVaultError::AuditError(e.to_string())
}
