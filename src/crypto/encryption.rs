//! AES-256-GCM authenticated encryption with associated data.
//!
//! Each call to `encrypt` generates a fresh random 12-byte nonce.  The
//! result is returned as a `Sealed` value with the nonce, ciphertext and
//! 16-byte authentication tag kept apart, which is how they are stored in
//! the vault file.
//!
//! The associated data is authenticated but not encrypted.  Callers use it
//! to bind a ciphertext to the slot it was written for, so a ciphertext
//! copied into another record fails to decrypt.

use aes_gcm::aead::{AeadInPlace, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce, Tag};
use serde::{Deserialize, Serialize};

use super::encoding::{base64_decode, base64_encode};
use crate::errors::{PassGenError, Result};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the AES-256-GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Output of one authenticated encryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sealed {
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub nonce: Vec<u8>,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub ciphertext: Vec<u8>,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub tag: Vec<u8>,
}

/// Encrypt `plaintext` with a 32-byte `key`, authenticating `aad` alongside.
pub fn encrypt(key: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Sealed> {
    // Build the cipher from the raw key bytes.
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| PassGenError::EncryptionFailed(format!("invalid key length: {e}")))?;

    // Fresh nonce from the OS CSPRNG on every call.
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    // Encrypt in place; the tag is returned separately.
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(&nonce, aad, &mut buffer)
        .map_err(|e| PassGenError::EncryptionFailed(format!("encryption error: {e}")))?;

    Ok(Sealed {
        nonce: nonce.to_vec(),
        ciphertext: buffer,
        tag: tag.to_vec(),
    })
}

/// Decrypt a `Sealed` value produced by `encrypt` under the same `key` and `aad`.
///
/// Any failure (wrong key, modified nonce/ciphertext/tag, different `aad`,
/// malformed lengths) yields `IntegrityError` without saying which.
pub fn decrypt(key: &[u8], sealed: &Sealed, aad: &[u8]) -> Result<Vec<u8>> {
    if sealed.nonce.len() != NONCE_LEN || sealed.tag.len() != TAG_LEN {
        return Err(PassGenError::IntegrityError);
    }

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| PassGenError::IntegrityError)?;

    let nonce = Nonce::from_slice(&sealed.nonce);
    let tag = Tag::from_slice(&sealed.tag);

    let mut buffer = sealed.ciphertext.clone();
    cipher
        .decrypt_in_place_detached(nonce, aad, &mut buffer, tag)
        .map_err(|_| PassGenError::IntegrityError)?;

    Ok(buffer)
}
