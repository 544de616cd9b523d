//! Header verifier: a fixed label sealed under the vault key.
//!
//! Opening the verifier is a single AEAD operation, so a wrong secret is
//! rejected after one key derivation and before any entry is touched.

use subtle::ConstantTimeEq;

use super::encryption::{decrypt, encrypt, Sealed};
use super::keys::VaultKey;
use crate::errors::Result;

/// The known plaintext sealed into every vault header.
const VERIFIER_LABEL: &[u8] = b"passgen/verifier/v2";

/// Associated data for the verifier, distinct from any entry slot.
const VERIFIER_AAD: &[u8] = b"passgen/header";

/// Seal the verifier label under `key`.
pub fn compute_verifier(key: &VaultKey) -> Result<Sealed> {
    let verifier_key = key.verifier_key()?;
    encrypt(&verifier_key[..], VERIFIER_LABEL, VERIFIER_AAD)
}

/// Returns `true` if `sealed` opens under `key` and holds the expected label.
pub fn check_verifier(key: &VaultKey, sealed: &Sealed) -> bool {
    let Ok(verifier_key) = key.verifier_key() else {
        return false;
    };

    match decrypt(&verifier_key[..], sealed, VERIFIER_AAD) {
        Ok(label) => label.as_slice().ct_eq(VERIFIER_LABEL).into(),
        Err(_) => false,
    }
}
