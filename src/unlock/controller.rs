//! The unlock state machine.
//!
//! ```text
//! Locked --submit--> Verifying --verified, latest--> Unlocked
//!    ^                   |                               |
//!    |                   +--rejected--> (previous state) |
//!    +------------------------lock-----------------------+
//! ```
//!
//! Attempts are numbered in submission order.  An attempt's result is
//! only published if its id is still the latest one issued when it is
//! handed back to `finish`; anything older is dropped silently.  That
//! comparison is the only guard against a slow early attempt overwriting
//! a fast later one, so the controller needs no locks: `begin` and
//! `finish` take `&mut self` and never await.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::attempt::{AttemptResult, ResolvedAttempt, UnlockAttempt, Verifier};
use super::query_set::{DecryptedQuery, DecryptedQuerySet};
use crate::errors::{QueryVaultError, Result};
use crate::vault::VaultManifest;

/// Where the controller currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockState {
    /// No plaintext published.
    Locked,
    /// The latest attempt has not resolved yet.
    Verifying { attempt: u64 },
    /// A full plaintext set is published.
    Unlocked,
}

/// Why an attempt was rejected, as shown to the user.
///
/// There is one variant on purpose: a wrong password and a damaged
/// vault must look the same from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    PasswordIncorrect,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::PasswordIncorrect => f.write_str("password incorrect"),
        }
    }
}

/// Result of handing a resolved attempt back to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockOutcome {
    /// The attempt verified and its query set is now published.
    Unlocked { queries: usize },
    Rejected(RejectReason),
    /// A newer attempt was started; this result was discarded.
    Superseded,
}

/// What the controller actually saw for one attempt.
///
/// Finer than `UnlockOutcome`: a wrong password and a corrupt vault stay
/// apart here.  Meant for operator records, never for the password prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptClass {
    Verified { queries: usize },
    WrongPassword,
    ManifestCorrupt { item: String },
    Superseded,
}

/// The most recent attempt handed to `finish`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub attempt: u64,
    pub class: AttemptClass,
}

/// Gatekeeper between a `VaultManifest` and its plaintext queries.
pub struct UnlockController {
    manifest: Arc<VaultManifest>,
    verifier: Arc<Verifier>,
    latest_attempt: u64,
    in_flight: Option<u64>,
    published: Option<Arc<DecryptedQuerySet>>,
    last_record: Option<AttemptRecord>,
}

impl UnlockController {
    /// Create a locked controller for `manifest`.
    pub fn new(manifest: impl Into<Arc<VaultManifest>>, verifier: Verifier) -> Self {
        Self {
            manifest: manifest.into(),
            verifier: Arc::new(verifier),
            latest_attempt: 0,
            in_flight: None,
            published: None,
            last_record: None,
        }
    }

    // ------------------------------------------------------------------
    // Attempt lifecycle
    // ------------------------------------------------------------------

    /// Verify `candidate` and, if it is correct, publish every query.
    ///
    /// Equivalent to `begin`, `UnlockAttempt::resolve`, then `finish`.
    pub async fn submit_password(&mut self, candidate: &str) -> Result<UnlockOutcome> {
        let attempt = self.begin(candidate)?;
        let resolved = attempt.resolve().await;
        Ok(self.finish(resolved))
    }

    /// Start a new attempt.  It supersedes every attempt started before it.
    ///
    /// The candidate is trimmed; an empty candidate does not consume an
    /// attempt id.  A submission against an empty vault does, so it still
    /// supersedes whatever was in flight before failing with `NoQueries`.
    pub fn begin(&mut self, candidate: &str) -> Result<UnlockAttempt> {
        let trimmed = candidate.trim();
        if trimmed.is_empty() {
            return Err(QueryVaultError::EmptyPassword);
        }

        self.latest_attempt += 1;
        if self.manifest.is_empty() {
            self.in_flight = None;
            return Err(QueryVaultError::NoQueries);
        }
        self.in_flight = Some(self.latest_attempt);
        debug!(attempt = self.latest_attempt, "Unlock attempt started");

        Ok(UnlockAttempt::new(
            self.latest_attempt,
            Zeroizing::new(trimmed.to_string()),
            Arc::clone(&self.manifest),
            Arc::clone(&self.verifier),
        ))
    }

    /// Apply a resolved attempt, unless a newer one has been started.
    pub fn finish(&mut self, resolved: ResolvedAttempt) -> UnlockOutcome {
        let attempt = resolved.id;
        if attempt != self.latest_attempt {
            debug!(
                attempt,
                latest = self.latest_attempt,
                "Stale unlock attempt discarded"
            );
            self.last_record = Some(AttemptRecord {
                attempt,
                class: AttemptClass::Superseded,
            });
            return UnlockOutcome::Superseded;
        }
        self.in_flight = None;

        let (class, outcome) = match resolved.result {
            AttemptResult::Verified(set) => {
                let queries = set.len();
                self.published = Some(Arc::new(set));
                info!(attempt, queries, "Vault unlocked");
                (
                    AttemptClass::Verified { queries },
                    UnlockOutcome::Unlocked { queries },
                )
            }
            AttemptResult::WrongPassword => {
                info!(attempt, "Unlock rejected");
                (
                    AttemptClass::WrongPassword,
                    UnlockOutcome::Rejected(RejectReason::PasswordIncorrect),
                )
            }
            AttemptResult::ManifestCorrupt { item } => {
                warn!(
                    attempt,
                    item = %item,
                    "Password verified but a query failed to decrypt; vault may be corrupt"
                );
                (
                    AttemptClass::ManifestCorrupt { item },
                    UnlockOutcome::Rejected(RejectReason::PasswordIncorrect),
                )
            }
        };

        self.last_record = Some(AttemptRecord { attempt, class });
        outcome
    }

    /// Clear the published queries and return to `Locked`.
    ///
    /// Attempts still in flight are superseded, so they cannot unlock
    /// the controller again after the fact.
    pub fn lock(&mut self) {
        if self.in_flight.take().is_some() {
            self.latest_attempt += 1;
        }
        if self.published.take().is_some() {
            info!("Vault locked");
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn state(&self) -> UnlockState {
        match (self.in_flight, &self.published) {
            (Some(attempt), _) => UnlockState::Verifying { attempt },
            (None, Some(_)) => UnlockState::Unlocked,
            (None, None) => UnlockState::Locked,
        }
    }

    /// Returns `true` while a query set is published.
    ///
    /// Still `true` during a follow-up attempt: the previous set stays
    /// active until a newer one replaces it or `lock` clears it.
    pub fn is_unlocked(&self) -> bool {
        self.published.is_some()
    }

    /// The published query set, if any.
    pub fn queries(&self) -> Option<Arc<DecryptedQuerySet>> {
        self.published.clone()
    }

    /// A single published query by name.
    pub fn query(&self, name: &str) -> Option<&DecryptedQuery> {
        self.published.as_deref().and_then(|set| set.get(name))
    }

    pub fn manifest(&self) -> &VaultManifest {
        &self.manifest
    }

    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    /// How the last attempt passed to `finish` actually ended.
    pub fn last_record(&self) -> Option<&AttemptRecord> {
        self.last_record.as_ref()
    }

    /// Id of the most recently started attempt (0 before the first).
    pub fn latest_attempt(&self) -> u64 {
        self.latest_attempt
    }
}
