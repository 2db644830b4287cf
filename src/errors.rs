use std::path::PathBuf;
use thiserror::Error;

use crate::vault::EntryId;

/// All errors that can occur in PqVault.
#[derive(Debug, Error)]
pub enum PqVaultError {
    // --- Entropy ---
    #[error("Entropy source unavailable: {0}")]
    EntropySourceUnavailable(String),

    // --- Format errors ---
    #[error("Truncated entry: needed {needed} bytes, {available} available")]
    TruncatedEntry { needed: usize, available: usize },

    #[error("Entry record is followed by {extra} unexpected trailing bytes")]
    TrailingEntryBytes { extra: usize },

    #[error("Malformed entry: {0}")]
    MalformedEntry(String),

    #[error("Truncated vault container: {0}")]
    TruncatedContainer(String),

    #[error("Unsupported vault format version {0}")]
    UnsupportedVersion(u8),

    #[error("Unsupported KDF parameter format version {0}")]
    UnsupportedKdfVersion(u8),

    #[error("Entry field '{field}' is {len} bytes, larger than the 16-bit length prefix allows")]
    EntryTooLarge { field: &'static str, len: usize },

    #[error("Encrypted payload is {0} bytes, larger than the 32-bit length prefix allows")]
    PayloadTooLarge(usize),

    // --- Crypto errors ---
    /// Deliberately covers both a wrong password and a tampered file.
    #[error("Wrong password or corrupted vault")]
    IntegrityViolation,

    #[error("Vault payload failed to decrypt after its integrity tag verified")]
    DecryptionFailed,

    #[error("Entry {0} could not be decrypted")]
    EntryDecryptionFailed(EntryId),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Invalid KDF parameters: {0}")]
    InvalidKdfParams(String),

    #[error("KEM error: {0}")]
    Kem(String),

    // --- Keypair errors ---
    #[error("Keypair error: {0}")]
    KeypairError(String),

    // --- Vault / session errors ---
    #[error("Vault not found at {0}")]
    VaultNotFound(PathBuf),

    #[error("Vault already exists at {0}")]
    VaultAlreadyExists(PathBuf),

    #[error("Vault is locked")]
    VaultLocked,

    #[error("Secret {0} not found")]
    SecretNotFound(EntryId),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,
}

/// Convenience type alias for PqVault results.
pub type Result<T> = std::result::Result<T, PqVaultError>;
