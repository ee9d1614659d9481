//! Unlock module — password verification and bulk decryption.
//!
//! This module provides:
//! - `UnlockController`, the Locked / Verifying / Unlocked state machine (`controller`)
//! - `UnlockAttempt` and the `Verifier` marker check (`attempt`)
//! - `DecryptedQuerySet`, the published plaintext (`query_set`)

pub mod attempt;
pub mod controller;
pub mod query_set;

pub use attempt::{ResolvedAttempt, UnlockAttempt, Verifier};
pub use controller::{
    AttemptClass, AttemptRecord, RejectReason, UnlockController, UnlockOutcome, UnlockState,
};
pub use query_set::{DecryptedQuery, DecryptedQuerySet};
