//! Password-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! The salt and iteration count are stored in the vault header rather
//! than hard-coded, so the cost can be raised for new vaults without
//! breaking older ones.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

use super::keys::{VaultKey, KEY_LEN};
use crate::errors::{PassGenError, Result};

/// Length of the salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Iteration count used for new vaults unless configured otherwise.
pub const DEFAULT_ITERATIONS: u32 = 600_000;

/// Lowest iteration count accepted when deriving a key.
pub const MIN_ITERATIONS: u32 = 10_000;

/// Shortest salt accepted from a vault header.
const MIN_SALT_LEN: usize = 16;

/// Derive the 32-byte vault key from a secret, salt and iteration count.
///
/// The same inputs always produce the same key.
pub fn derive_key(secret: &[u8], salt: &[u8], iterations: u32) -> Result<VaultKey> {
    if iterations < MIN_ITERATIONS {
        return Err(PassGenError::KeyDerivationFailed(format!(
            "PBKDF2 iterations must be at least {MIN_ITERATIONS} (got {iterations})"
        )));
    }
    if salt.len() < MIN_SALT_LEN {
        return Err(PassGenError::KeyDerivationFailed(format!(
            "salt must be at least {MIN_SALT_LEN} bytes (got {})",
            salt.len()
        )));
    }

    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(secret, salt, iterations, &mut key);

    let vault_key = VaultKey::new(key);
    key.zeroize();
    Ok(vault_key)
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_iterations_below_floor() {
        let salt = generate_salt();
        let result = derive_key(b"pw", &salt, MIN_ITERATIONS - 1);
        assert!(matches!(result, Err(PassGenError::KeyDerivationFailed(_))));
    }

    #[test]
    fn rejects_short_salt() {
        let result = derive_key(b"pw", &[0u8; 8], MIN_ITERATIONS);
        assert!(matches!(result, Err(PassGenError::KeyDerivationFailed(_))));
    }

    #[test]
    fn iteration_count_changes_the_key() {
        let salt = [0x11u8; SALT_LEN];
        let a = derive_key(b"pw", &salt, MIN_ITERATIONS).unwrap();
        let b = derive_key(b"pw", &salt, MIN_ITERATIONS + 1).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn salts_are_random() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
