//! High-level vault operations.
//!
//! Opening a vault is split in two so the secret can be checked before
//! any entry is touched:
//!
//! 1. `VaultStore::load` reads the file and parses the header only.
//! 2. `VaultHandle::open` derives the key, checks the header verifier,
//!    and only then decrypts the entries into an `OpenVault`.
//!
//! An `OpenVault` holds the decrypted entries in memory.  Changes stay
//! in memory until `persist` re-encrypts everything and atomically
//! replaces the file, which requires holding the vault's `VaultLock`.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::{
    check_verifier, compute_verifier, decrypt, derive_key, encrypt, generate_salt, VaultKey,
    MIN_ITERATIONS,
};
use crate::errors::{PassGenError, Result};

use super::entry::{Entry, EntryDraft, EntryId, EntryPatch, Listed, VaultEntry};
use super::format::{self, StagedWrite, VaultHeader, CURRENT_VERSION};
use super::lock::VaultLock;

/// Entry points for creating, loading and locking vault files.
pub struct VaultStore;

impl VaultStore {
    /// Create a brand-new vault file at `path` and return it open.
    ///
    /// Generates a random salt, derives the key with `iterations` rounds,
    /// seals the verifier, and writes an empty entry set.  The caller
    /// must hold the lock for `path`.
    pub fn create(
        path: &Path,
        secret: &[u8],
        iterations: u32,
        lock: &VaultLock,
    ) -> Result<OpenVault> {
        if path.exists() {
            return Err(PassGenError::VaultAlreadyExists(path.to_path_buf()));
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let salt = generate_salt();
        let key = derive_key(secret, &salt, iterations)?;
        let header = VaultHeader {
            format_version: CURRENT_VERSION,
            kdf_salt: salt.to_vec(),
            kdf_iterations: iterations,
            verifier: compute_verifier(&key)?,
            created_at: Utc::now(),
        };

        let vault = OpenVault {
            path: path.to_path_buf(),
            header,
            key,
            records: Vec::new(),
            next_id: 0,
        };
        vault.persist(lock)?;

        tracing::info!(path = %path.display(), iterations, "vault created");
        Ok(vault)
    }

    /// Read the vault at `path` and parse its header.
    ///
    /// No key derivation happens here; entries stay encrypted.
    pub fn load(path: &Path) -> Result<VaultHandle> {
        let raw = format::read_vault(path)?;

        if raw.header.kdf_iterations < MIN_ITERATIONS {
            return Err(PassGenError::FormatError(format!(
                "KDF iteration count {} is below the minimum of {MIN_ITERATIONS}",
                raw.header.kdf_iterations
            )));
        }

        tracing::debug!(path = %path.display(), "vault header loaded");
        Ok(VaultHandle {
            path: path.to_path_buf(),
            header: raw.header,
            entries_bytes: raw.entries_bytes,
            verified: RefCell::new(None),
        })
    }

    /// Take the exclusive write lock for `path`, waiting at most `wait`.
    pub fn lock(path: &Path, wait: Duration) -> Result<VaultLock> {
        VaultLock::acquire(path, wait)
    }
}

// ---------------------------------------------------------------------------
// VaultHandle
// ---------------------------------------------------------------------------

/// A loaded vault whose entries are still encrypted.
pub struct VaultHandle {
    path: PathBuf,
    header: VaultHeader,
    entries_bytes: Vec<u8>,
    /// Key from the last successful `verify_secret`, consumed by `open`.
    verified: RefCell<Option<VerifiedKey>>,
}

struct VerifiedKey {
    secret: Zeroizing<Vec<u8>>,
    key: VaultKey,
}

impl VaultHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &VaultHeader {
        &self.header
    }

    /// Number of stored entries, without decrypting any.
    pub fn entry_count(&self) -> Result<usize> {
        Ok(format::decode_entries(&self.entries_bytes)?.len())
    }

    /// Derive the key for `secret` and check it against the header.
    ///
    /// Any failure (derivation error, verifier mismatch) is reported as
    /// `AuthenticationFailed`.
    fn unlock_key(&self, secret: &[u8]) -> Result<VaultKey> {
        let key = derive_key(secret, &self.header.kdf_salt, self.header.kdf_iterations)
            .map_err(|_| PassGenError::AuthenticationFailed)?;

        if !check_verifier(&key, &self.header.verifier) {
            return Err(PassGenError::AuthenticationFailed);
        }
        Ok(key)
    }

    /// Returns `true` if `secret` opens this vault.  Touches no entry.
    ///
    /// The derived key is kept so a following `open` with the same
    /// secret skips the second derivation.
    pub fn verify_secret(&self, secret: &[u8]) -> bool {
        match self.unlock_key(secret) {
            Ok(key) => {
                *self.verified.borrow_mut() = Some(VerifiedKey {
                    secret: Zeroizing::new(secret.to_vec()),
                    key,
                });
                true
            }
            Err(_) => false,
        }
    }

    /// The key for `secret`: the one `verify_secret` kept if it was
    /// derived from the same secret, else a fresh derivation.
    fn key_for(&self, secret: &[u8]) -> Result<VaultKey> {
        if let Some(kept) = self.verified.borrow_mut().take() {
            if bool::from(kept.secret.as_slice().ct_eq(secret)) {
                return Ok(kept.key);
            }
        }
        self.unlock_key(secret)
    }

    /// Check `secret` and decrypt every entry.
    ///
    /// A wrong secret fails with `AuthenticationFailed` before any entry
    /// ciphertext is read.  An entry that fails to decrypt after the
    /// verifier passed means the file was modified: `IntegrityError`.
    pub fn open(&self, secret: &[u8]) -> Result<OpenVault> {
        let key = self.key_for(secret)?;

        let stored = format::decode_entries(&self.entries_bytes)?;
        let entry_key = key.entry_key()?;

        let mut records = Vec::with_capacity(stored.len());
        for (index, stored_entry) in stored.into_iter().enumerate() {
            let aad = stored_entry.aad(index)?;
            let mut plaintext = decrypt(&entry_key[..], &stored_entry.secret, &aad)?;

            let password = match String::from_utf8(std::mem::take(&mut plaintext)) {
                Ok(s) => Zeroizing::new(s),
                Err(e) => {
                    let mut bad_bytes = e.into_bytes();
                    bad_bytes.zeroize();
                    return Err(PassGenError::IntegrityError);
                }
            };

            records.push(Record {
                id: EntryId(index as u64),
                entry: Entry::from_stored(stored_entry, password),
            });
        }

        tracing::debug!(path = %self.path.display(), entries = records.len(), "vault opened");

        let next_id = records.len() as u64;
        Ok(OpenVault {
            path: self.path.clone(),
            header: self.header.clone(),
            key,
            records,
            next_id,
        })
    }
}

// ---------------------------------------------------------------------------
// OpenVault
// ---------------------------------------------------------------------------

struct Record {
    id: EntryId,
    entry: Entry,
}

/// A decrypted vault.  Entries are kept in persisted order.
pub struct OpenVault {
    path: PathBuf,
    header: VaultHeader,
    key: VaultKey,
    records: Vec<Record>,
    next_id: u64,
}

impl OpenVault {
    // ------------------------------------------------------------------
    // Listing
    // ------------------------------------------------------------------

    /// Every entry in persisted order, numbered from 1.
    pub fn list(&self) -> Vec<Listed> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| Listed::of(i + 1, r.id, &r.entry))
            .collect()
    }

    /// Entries whose site, username, tags or notes contain `query`,
    /// ignoring case.  Numbered from 1 over the matches.
    pub fn search(&self, query: &str) -> Vec<Listed> {
        let needle = query.to_lowercase();
        self.records
            .iter()
            .filter(|r| r.entry.matches(&needle))
            .enumerate()
            .map(|(i, r)| Listed::of(i + 1, r.id, &r.entry))
            .collect()
    }

    /// The entry at a 1-based `position` in `list()` order.
    pub fn get(&self, position: usize) -> Result<&Entry> {
        let index = self.index_of(position)?;
        Ok(&self.records[index].entry)
    }

    /// The decrypted password at a 1-based `position` in `list()` order.
    pub fn reveal(&self, position: usize) -> Result<Zeroizing<String>> {
        Ok(self.get(position)?.password.clone())
    }

    /// The decrypted password of a row from an earlier `list` or `search`.
    pub fn reveal_listed(&self, listed: &Listed) -> Result<Zeroizing<String>> {
        self.records
            .iter()
            .find(|r| r.id == listed.id)
            .map(|r| r.entry.password.clone())
            .ok_or(PassGenError::InvalidSelection {
                position: listed.position,
                len: self.records.len(),
            })
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Validate `draft` and append it.
    pub fn add(&mut self, draft: EntryDraft) -> Result<EntryId> {
        let entry = draft.into_entry(Utc::now())?;

        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.records.push(Record { id, entry });

        tracing::debug!(entries = self.records.len(), "entry added");
        Ok(id)
    }

    /// Apply `patch` to the entry at `position`.
    pub fn update(&mut self, position: usize, patch: EntryPatch) -> Result<()> {
        let index = self.index_of(position)?;
        patch.validate()?;
        patch.apply(&mut self.records[index].entry, Utc::now());

        tracing::debug!(position, "entry updated");
        Ok(())
    }

    /// Remove the entry at `position`; later entries move up by one.
    pub fn delete(&mut self, position: usize) -> Result<Entry> {
        let index = self.index_of(position)?;
        let removed = self.records.remove(index);

        tracing::debug!(position, entries = self.records.len(), "entry deleted");
        Ok(removed.entry)
    }

    /// Switch to a new secret: fresh salt, `iterations` rounds, new verifier.
    ///
    /// Entries are re-encrypted under the new key on the next `persist`.
    pub fn rekey(&mut self, new_secret: &[u8], iterations: u32) -> Result<()> {
        let salt = generate_salt();
        let key = derive_key(new_secret, &salt, iterations)?;

        self.header.verifier = compute_verifier(&key)?;
        self.header.kdf_salt = salt.to_vec();
        self.header.kdf_iterations = iterations;
        self.key = key;

        tracing::info!(path = %self.path.display(), iterations, "vault re-keyed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Re-encrypt every entry with fresh nonces and write the result to a
    /// temp file beside the vault.  Nothing visible changes until the
    /// returned `StagedWrite` is committed.
    pub fn stage(&self, lock: &VaultLock) -> Result<StagedWrite> {
        if !lock.guards(&self.path) {
            return Err(PassGenError::CommandFailed(format!(
                "lock for {} does not cover {}",
                lock.target().display(),
                self.path.display()
            )));
        }

        let entry_key = self.key.entry_key()?;
        let mut stored: Vec<VaultEntry> = Vec::with_capacity(self.records.len());
        for (index, record) in self.records.iter().enumerate() {
            let aad = record.entry.aad(index)?;
            let sealed = encrypt(&entry_key[..], record.entry.password.as_bytes(), &aad)?;
            stored.push(record.entry.to_stored(sealed));
        }

        let bytes = format::encode_vault(&self.header, &stored)?;
        format::stage_write(&self.path, &bytes)
    }

    /// Stage and commit: atomically replace the vault file.
    pub fn persist(&self, lock: &VaultLock) -> Result<()> {
        self.stage(lock)?.commit()?;
        tracing::debug!(path = %self.path.display(), entries = self.records.len(), "vault persisted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &VaultHeader {
        &self.header
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Map a 1-based position to an index, or `InvalidSelection`.
    fn index_of(&self, position: usize) -> Result<usize> {
        if position == 0 || position > self.records.len() {
            return Err(PassGenError::InvalidSelection {
                position,
                len: self.records.len(),
            });
        }
        Ok(position - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lock_for(path: &Path) -> VaultLock {
        VaultStore::lock(path, Duration::from_secs(1)).unwrap()
    }

    fn draft(site: &str, username: &str, password: &str) -> EntryDraft {
        EntryDraft {
            site: site.into(),
            username: username.into(),
            password: Zeroizing::new(password.into()),
            ..Default::default()
        }
    }

    fn sites(listed: &[Listed]) -> Vec<(usize, String)> {
        listed.iter().map(|l| (l.position, l.site.clone())).collect()
    }

    #[test]
    fn create_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.db");
        let lock = lock_for(&path);

        VaultStore::create(&path, b"pw", MIN_ITERATIONS, &lock).unwrap();
        let again = VaultStore::create(&path, b"pw", MIN_ITERATIONS, &lock);
        assert!(matches!(again, Err(PassGenError::VaultAlreadyExists(_))));
    }

    #[test]
    fn wrong_secret_fails_verifier() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.db");
        let lock = lock_for(&path);
        VaultStore::create(&path, b"right", MIN_ITERATIONS, &lock).unwrap();

        let handle = VaultStore::load(&path).unwrap();
        assert!(handle.verify_secret(b"right"));
        assert!(!handle.verify_secret(b"wrong"));
        assert!(matches!(
            handle.open(b"wrong"),
            Err(PassGenError::AuthenticationFailed)
        ));
    }

    #[test]
    fn delete_renumbers_later_positions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.db");
        let lock = lock_for(&path);
        let mut vault = VaultStore::create(&path, b"pw", MIN_ITERATIONS, &lock).unwrap();

        vault.add(draft("A", "u", "1")).unwrap();
        vault.add(draft("B", "u", "2")).unwrap();
        vault.add(draft("C", "u", "3")).unwrap();

        let removed = vault.delete(2).unwrap();
        assert_eq!(removed.site, "B");
        assert_eq!(
            sites(&vault.list()),
            vec![(1, "A".to_string()), (2, "C".to_string())]
        );
    }

    #[test]
    fn out_of_range_positions_are_invalid_selection() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.db");
        let lock = lock_for(&path);
        let mut vault = VaultStore::create(&path, b"pw", MIN_ITERATIONS, &lock).unwrap();
        vault.add(draft("A", "u", "1")).unwrap();

        assert!(matches!(
            vault.delete(0),
            Err(PassGenError::InvalidSelection { position: 0, len: 1 })
        ));
        assert!(matches!(
            vault.reveal(2),
            Err(PassGenError::InvalidSelection { position: 2, len: 1 })
        ));
        assert!(matches!(
            vault.update(5, EntryPatch::default()),
            Err(PassGenError::InvalidSelection { .. })
        ));
    }

    #[test]
    fn search_numbers_matches_in_persisted_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.db");
        let lock = lock_for(&path);
        let mut vault = VaultStore::create(&path, b"pw", MIN_ITERATIONS, &lock).unwrap();

        vault.add(draft("github.com", "alice", "1")).unwrap();
        vault.add(draft("example.com", "bob", "2")).unwrap();
        vault.add(draft("GitLab.com", "carol", "3")).unwrap();

        let hits = vault.search("GIT");
        assert_eq!(
            sites(&hits),
            vec![(1, "github.com".to_string()), (2, "GitLab.com".to_string())]
        );
        assert_eq!(vault.reveal_listed(&hits[1]).unwrap().as_str(), "3");
    }

    #[test]
    fn search_query_is_matched_as_given() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.db");
        let lock = lock_for(&path);
        let mut vault = VaultStore::create(&path, b"pw", MIN_ITERATIONS, &lock).unwrap();

        vault.add(draft("github.com", "alice", "1")).unwrap();
        vault.add(draft("my bank", "bob", "2")).unwrap();

        assert_eq!(sites(&vault.search(" ")), vec![(1, "my bank".to_string())]);
        assert!(vault.search(" github").is_empty());
        assert_eq!(vault.search("").len(), 2);
    }

    #[test]
    fn verified_key_is_reused_once_for_the_same_secret() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.db");
        let lock = lock_for(&path);
        VaultStore::create(&path, b"right", MIN_ITERATIONS, &lock).unwrap();

        let handle = VaultStore::load(&path).unwrap();
        assert!(handle.verified.borrow().is_none());

        assert!(handle.verify_secret(b"right"));
        assert!(handle.verified.borrow().is_some());
        handle.open(b"right").unwrap();
        assert!(handle.verified.borrow().is_none());

        // A kept key never opens the vault for a different secret.
        assert!(handle.verify_secret(b"right"));
        assert!(matches!(
            handle.open(b"wrong"),
            Err(PassGenError::AuthenticationFailed)
        ));
        handle.open(b"right").unwrap();
    }

    #[test]
    fn failed_verification_keeps_no_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.db");
        let lock = lock_for(&path);
        VaultStore::create(&path, b"right", MIN_ITERATIONS, &lock).unwrap();

        let handle = VaultStore::load(&path).unwrap();
        assert!(!handle.verify_secret(b"wrong"));
        assert!(handle.verified.borrow().is_none());
    }

    #[test]
    fn update_keeps_position_and_changes_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.db");
        let lock = lock_for(&path);
        let mut vault = VaultStore::create(&path, b"pw", MIN_ITERATIONS, &lock).unwrap();
        vault.add(draft("A", "u", "old")).unwrap();

        vault
            .update(
                1,
                EntryPatch {
                    password: Some(Zeroizing::new("new".into())),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(vault.reveal(1).unwrap().as_str(), "new");
        assert_eq!(vault.get(1).unwrap().site, "A");
    }

    #[test]
    fn invalid_patch_leaves_entry_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.db");
        let lock = lock_for(&path);
        let mut vault = VaultStore::create(&path, b"pw", MIN_ITERATIONS, &lock).unwrap();
        vault.add(draft("A", "u", "pw")).unwrap();

        let result = vault.update(
            1,
            EntryPatch {
                username: Some("changed".into()),
                site: Some(String::new()),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(PassGenError::InvalidEntry(_))));
        assert_eq!(vault.get(1).unwrap().username, "u");
    }

    #[test]
    fn persist_requires_the_matching_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.db");
        let lock = lock_for(&path);
        let vault = VaultStore::create(&path, b"pw", MIN_ITERATIONS, &lock).unwrap();

        let other = lock_for(&dir.path().join("other.db"));
        assert!(matches!(
            vault.persist(&other),
            Err(PassGenError::CommandFailed(_))
        ));
    }

    #[test]
    fn rekey_changes_the_accepted_secret() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.db");
        let lock = lock_for(&path);
        let mut vault = VaultStore::create(&path, b"old", MIN_ITERATIONS, &lock).unwrap();
        vault.add(draft("A", "u", "pw")).unwrap();
        let old_salt = vault.header().kdf_salt.clone();

        vault.rekey(b"new", MIN_ITERATIONS + 1).unwrap();
        vault.persist(&lock).unwrap();
        assert_ne!(vault.header().kdf_salt, old_salt);

        let handle = VaultStore::load(&path).unwrap();
        assert!(!handle.verify_secret(b"old"));
        assert_eq!(handle.header().kdf_iterations, MIN_ITERATIONS + 1);
        let reopened = handle.open(b"new").unwrap();
        assert_eq!(reopened.reveal(1).unwrap().as_str(), "pw");
    }

    #[test]
    fn load_rejects_header_below_iteration_floor() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.db");
        let lock = lock_for(&path);
        let vault = VaultStore::create(&path, b"pw", MIN_ITERATIONS, &lock).unwrap();

        let mut header = vault.header().clone();
        header.kdf_iterations = 1;
        format::write_vault(&path, &header, &[]).unwrap();

        assert!(matches!(
            VaultStore::load(&path),
            Err(PassGenError::FormatError(_))
        ));
    }
}
