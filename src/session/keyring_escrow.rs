//! OS keyring as a key escrow.
//!
//! Stores the master secret in the operating system's credential store:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring / KDE Wallet)
//!
//! All operations fail gracefully: errors are returned and the session
//! logs them and moves on to the next source.

use super::capability::KeyEscrowCapability;
use super::secret::MasterSecret;
use crate::errors::{PassGenError, Result};

/// Service name used in the OS keyring.
const SERVICE_NAME: &str = "passgen";

/// Escrow backed by the platform keyring.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyringEscrow;

fn entry(app_id: &str) -> Result<keyring::Entry> {
    keyring::Entry::new(SERVICE_NAME, app_id)
        .map_err(|e| PassGenError::EscrowError(format!("failed to create keyring entry: {e}")))
}

impl KeyEscrowCapability for KeyringEscrow {
    fn store(&mut self, app_id: &str, secret: &MasterSecret) -> Result<()> {
        let text = secret.as_str().ok_or_else(|| {
            PassGenError::EscrowError("master secret is not valid UTF-8".into())
        })?;

        entry(app_id)?.set_password(text).map_err(|e| {
            PassGenError::EscrowError(format!("failed to store secret in keyring: {e}"))
        })
    }

    fn retrieve(&mut self, app_id: &str) -> Result<Option<MasterSecret>> {
        match entry(app_id)?.get_password() {
            Ok(password) => Ok(Some(MasterSecret::from_string(password))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(PassGenError::EscrowError(format!(
                "failed to read from keyring: {e}"
            ))),
        }
    }

    fn erase(&mut self, app_id: &str) -> Result<()> {
        match entry(app_id)?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()), // Already gone, that's fine.
            Err(e) => Err(PassGenError::EscrowError(format!(
                "failed to delete from keyring: {e}"
            ))),
        }
    }
}
