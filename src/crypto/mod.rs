//! Cryptographic primitives for PassGen.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption with detached tags (`encryption`)
//! - PBKDF2-HMAC-SHA256 password-based key derivation (`kdf`)
//! - The zeroizing vault key and its HKDF sub-keys (`keys`)
//! - The header verifier used to test a candidate secret (`verifier`)

pub mod encoding;
pub mod encryption;
pub mod kdf;
pub mod keys;
pub mod verifier;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, derive_key, ...};
pub use encryption::{decrypt, encrypt, Sealed};
pub use kdf::{derive_key, generate_salt, DEFAULT_ITERATIONS, MIN_ITERATIONS};
pub use keys::VaultKey;
pub use verifier::{check_verifier, compute_verifier};
