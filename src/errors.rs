use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in PassGen.
#[derive(Debug, Error)]
pub enum PassGenError {
    // --- Authentication errors ---
    /// Wrong secret or failed verifier check. Deliberately indistinguishable
    /// from a corrupt header so the message cannot be used as an oracle.
    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Authentication cancelled")]
    AuthenticationCancelled,

    // --- Crypto errors ---
    #[error("Integrity check failed: the vault file is corrupted or was tampered with")]
    IntegrityError,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Vault errors ---
    #[error("Vault not found at {0}")]
    VaultNotFound(PathBuf),

    #[error("Vault already exists at {0}")]
    VaultAlreadyExists(PathBuf),

    #[error("Invalid vault format: {0}")]
    FormatError(String),

    #[error("Vault at {0} is locked by another process, try again shortly")]
    Busy(PathBuf),

    #[error("Invalid selection {position} (valid range: 1-{len})")]
    InvalidSelection { position: usize, len: usize },

    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    // --- Capability errors ---
    #[error("Key escrow error: {0}")]
    EscrowError(String),

    #[error("Clipboard error: {0}")]
    ClipboardError(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration: {0}")]
    ConfigValidationError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

impl PassGenError {
    /// Process exit code for this error.
    ///
    /// Authentication failures get their own code so scripts can tell a
    /// wrong password apart from a damaged or busy vault.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AuthenticationFailed | Self::AuthenticationCancelled => 2,
            Self::FormatError(_) | Self::Busy(_) | Self::IntegrityError => 3,
            Self::VaultNotFound(_) | Self::InvalidSelection { .. } => 4,
            Self::ConfigError(_) | Self::ConfigValidationError(_) => 5,
            _ => 1,
        }
    }
}

/// Convenience type alias for PassGen results.
pub type Result<T> = std::result::Result<T, PassGenError>;
