use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in QueryVault.
#[derive(Debug, Error)]
pub enum QueryVaultError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — wrong password or corrupted data")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Build errors ---
    #[error("No password given — set QUERY_PASSWORD")]
    MissingPassword,

    #[error("No eligible query documents found in {0}")]
    NoQueryDocuments(PathBuf),

    #[error("Duplicate query name '{0}'")]
    DuplicateQuery(String),

    // --- Vault errors ---
    #[error("Vault not found at {0}")]
    VaultNotFound(PathBuf),

    #[error("Invalid vault format: {0}")]
    InvalidVaultFormat(String),

    #[error("Vault contains no queries to decrypt")]
    NoQueries,

    #[error("Query '{0}' not found")]
    QueryNotFound(String),

    // --- Unlock errors ---
    #[error("Enter a password")]
    EmptyPassword,

    #[error("Password incorrect")]
    PasswordIncorrect,

    #[error("Unlock task failed: {0}")]
    UnlockTaskFailed(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Audit error: {0}")]
    AuditError(String),
}

/// Convenience type alias for QueryVault results.
pub type Result<T> = std::result::Result<T, QueryVaultError>;
