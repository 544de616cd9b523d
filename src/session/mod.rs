//! Session management: obtaining and caching the master secret.
//!
//! This module provides:
//! - `MasterSecret`, the zeroizing secret type (`secret`)
//! - Biometric, escrow and prompt capabilities (`capability`)
//! - Time sources for expiry (`clock`)
//! - The `SessionManager` state machine (`manager`)
//! - An OS keyring escrow behind the `keyring-store` feature (`keyring_escrow`)

pub mod capability;
pub mod clock;
pub mod manager;
pub mod secret;

#[cfg(feature = "keyring-store")]
pub mod keyring_escrow;

use std::path::Path;

pub use capability::{
    BiometricCapability, BiometricOutcome, KeyEscrowCapability, MemoryEscrow, NoBiometric,
    NoEscrow, OneShotPassphrase, PassphraseInput, PassphrasePrompt,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use manager::{
    SecretVerifier, SessionConfig, SessionManager, SessionPhase, SessionStatus, UnlockMethod,
};
pub use secret::MasterSecret;

/// Escrow key for the vault at `vault_path`: `passgen:<canonical path>`.
///
/// Only the parent directory is canonicalized, so the id is the same
/// before and after the vault file is created.
pub fn app_id_for(vault_path: &Path) -> String {
    let canonical = match (vault_path.parent(), vault_path.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|dir| dir.join(name))
            .unwrap_or_else(|_| vault_path.to_path_buf()),
        _ => vault_path.to_path_buf(),
    };
    format!("passgen:{}", canonical.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn app_id_is_stable_across_creation() {
        let dir = TempDir::new().unwrap();
        let vault = dir.path().join("vault.db");

        let before = app_id_for(&vault);
        std::fs::write(&vault, b"x").unwrap();
        assert_eq!(before, app_id_for(&vault));
        assert!(before.starts_with("passgen:"));
    }
}
