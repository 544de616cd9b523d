//! Vault module: encrypted credential storage.
//!
//! This module provides:
//! - Entry types, drafts, patches and listing rows (`entry`)
//! - Binary vault file format and atomic writes (`format`)
//! - The cross-process write lock (`lock`)
//! - `VaultStore`, `VaultHandle` and `OpenVault` for working with vaults (`store`)

pub mod entry;
pub mod format;
pub mod lock;
pub mod store;

// Re-export the most commonly used items.
pub use entry::{Entry, EntryDraft, EntryId, EntryPatch, Listed};
pub use format::{StagedWrite, VaultHeader};
pub use lock::VaultLock;
pub use store::{OpenVault, VaultHandle, VaultStore};
