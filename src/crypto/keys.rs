//! The vault key and its HKDF-SHA256 sub-keys.
//!
//! From the PBKDF2 output we expand two independent sub-keys:
//! - an **entry** key that encrypts every stored password;
//! - a **verifier** key that seals the fixed header label.
//!
//! Keeping them apart means the verifier never shares a key with
//! entry ciphertexts.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::errors::{PassGenError, Result};

/// Length of the vault key and its sub-keys (256 bits).
pub const KEY_LEN: usize = 32;

const ENTRY_INFO: &[u8] = b"passgen-entry-key";
const VERIFIER_INFO: &[u8] = b"passgen-verifier-key";

/// A 32-byte derived key that zeroes its memory when dropped.
///
/// Never serialized and never printed.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct VaultKey {
    bytes: [u8; KEY_LEN],
}

impl VaultKey {
    /// Create a new `VaultKey` from raw bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Sub-key used to encrypt entry passwords.
    pub fn entry_key(&self) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        hkdf_expand(&self.bytes, ENTRY_INFO)
    }

    /// Sub-key used to seal and check the header verifier.
    pub fn verifier_key(&self) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        hkdf_expand(&self.bytes, VERIFIER_INFO)
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VaultKey(<redacted>)")
    }
}

/// Run HKDF-SHA256 expand with the given `info`.
///
/// The extract step uses no salt: the input is already a uniformly
/// random PBKDF2 output.
fn hkdf_expand(ikm: &[u8], info: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = Zeroizing::new([0u8; KEY_LEN]);
    hk.expand(info, &mut okm[..])
        .map_err(|e| PassGenError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_keys_differ_from_each_other_and_the_root() {
        let key = VaultKey::new([0x5Au8; KEY_LEN]);
        let entry = key.entry_key().unwrap();
        let verifier = key.verifier_key().unwrap();

        assert_ne!(*entry, *verifier);
        assert_ne!(&*entry, key.as_bytes());
    }

    #[test]
    fn sub_keys_are_deterministic() {
        let a = VaultKey::new([0x01u8; KEY_LEN]);
        let b = VaultKey::new([0x01u8; KEY_LEN]);
        assert_eq!(*a.entry_key().unwrap(), *b.entry_key().unwrap());
    }

    #[test]
    fn debug_output_is_redacted() {
        let key = VaultKey::new([0xFFu8; KEY_LEN]);
        assert_eq!(format!("{key:?}"), "VaultKey(<redacted>)");
    }
}
