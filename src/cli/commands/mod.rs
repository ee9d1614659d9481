//! One module per subcommand.

#[cfg(feature = "audit-log")]
pub mod audit_cmd;
pub mod build;
pub mod inspect;
pub mod unlock;
