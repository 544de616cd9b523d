//! `VaultService`: the operations callers use.
//!
//! Reads follow load → authenticate → open → project.  Writes take the
//! vault lock first and hold it across load → authenticate → open →
//! mutate → persist, so two processes never interleave a write cycle.
//! Plaintext is only reachable through a session the `SessionManager`
//! has validated.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{PassGenError, Result};
use crate::session::{MasterSecret, SessionManager, SessionStatus};
use crate::vault::{EntryDraft, EntryPatch, Listed, OpenVault, VaultHandle, VaultLock, VaultStore};

/// What `VaultService::status` reports.
#[derive(Debug, Clone)]
pub struct ServiceStatus {
    pub vault_path: PathBuf,
    pub vault_exists: bool,
    pub entry_count: Option<usize>,
    pub kdf_iterations: Option<u32>,
    pub created_at: Option<DateTime<Utc>>,
    pub session: SessionStatus,
}

pub struct VaultService {
    path: PathBuf,
    settings: Settings,
    session: SessionManager,
}

impl VaultService {
    pub fn new(path: impl Into<PathBuf>, settings: Settings, session: SessionManager) -> Self {
        Self {
            path: path.into(),
            settings,
            session,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Create the vault with `secret` and start a session with it.
    pub fn init(&mut self, secret: MasterSecret) -> Result<()> {
        if secret.is_empty() {
            return Err(PassGenError::InvalidEntry(
                "master password cannot be empty".into(),
            ));
        }

        let lock = self.write_lock()?;
        VaultStore::create(
            &self.path,
            secret.expose(),
            self.settings.kdf_iterations,
            &lock,
        )?;
        drop(lock);

        self.session.establish(secret);
        Ok(())
    }

    /// Re-encrypt everything under `new_secret` with a fresh salt.
    pub fn change_secret(&mut self, new_secret: MasterSecret) -> Result<()> {
        self.change_secret_with(|| Ok(new_secret))
    }

    /// Like `change_secret`, but asks `new_secret` for the password only
    /// once the current one has unlocked the vault.  The vault stays
    /// locked against other writers for the whole exchange.
    pub fn change_secret_with<F>(&mut self, new_secret: F) -> Result<()>
    where
        F: FnOnce() -> Result<MasterSecret>,
    {
        let lock = self.write_lock()?;
        let mut vault = self.open_current()?;

        let new_secret = new_secret()?;
        if new_secret.is_empty() {
            return Err(PassGenError::InvalidEntry(
                "master password cannot be empty".into(),
            ));
        }

        vault.rekey(new_secret.expose(), self.settings.kdf_iterations)?;
        vault.persist(&lock)?;
        drop(lock);

        self.session.establish(new_secret);
        tracing::info!("master secret changed");
        Ok(())
    }

    /// Delete the vault file and forget the secret everywhere.
    pub fn destroy(&mut self) -> Result<()> {
        let lock = self.write_lock()?;
        if !self.path.exists() {
            return Err(PassGenError::VaultNotFound(self.path.clone()));
        }
        std::fs::remove_file(&self.path)?;
        drop(lock);

        tracing::info!(path = %self.path.display(), "vault destroyed");
        self.session.lock_everywhere()
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn list(&mut self) -> Result<Vec<Listed>> {
        Ok(self.open_current()?.list())
    }

    pub fn search(&mut self, query: &str) -> Result<Vec<Listed>> {
        Ok(self.open_current()?.search(query))
    }

    /// The password at `position` in `list()` order.
    pub fn reveal(&mut self, position: usize) -> Result<Zeroizing<String>> {
        Ok(self.reveal_selected(None, position)?.1)
    }

    /// The row and password at `position` within the listing for `query`
    /// (all entries when `query` is `None`).
    pub fn reveal_selected(
        &mut self,
        query: Option<&str>,
        position: usize,
    ) -> Result<(Listed, Zeroizing<String>)> {
        let vault = self.open_current()?;
        let rows = match query {
            Some(q) => vault.search(q),
            None => vault.list(),
        };

        let row = position
            .checked_sub(1)
            .and_then(|i| rows.get(i))
            .ok_or(PassGenError::InvalidSelection {
                position,
                len: rows.len(),
            })?;
        let password = vault.reveal_listed(row)?;
        Ok((row.clone(), password))
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Add an entry.  Returns its position.
    pub fn add(&mut self, draft: EntryDraft) -> Result<usize> {
        let lock = self.write_lock()?;
        let mut vault = self.open_current()?;
        vault.add(draft)?;
        vault.persist(&lock)?;
        Ok(vault.len())
    }

    /// Change the entry at `position`.  Returns the updated row.
    pub fn update(&mut self, position: usize, patch: EntryPatch) -> Result<Listed> {
        let lock = self.write_lock()?;
        let mut vault = self.open_current()?;
        vault.update(position, patch)?;
        vault.persist(&lock)?;
        row_at(&vault, position)
    }

    /// Remove the entry at `position`.  Returns the removed row.
    pub fn delete(&mut self, position: usize) -> Result<Listed> {
        self.delete_with(position, |_| Ok(true))?
            .ok_or(PassGenError::InvalidSelection { position, len: 0 })
    }

    /// Delete the entry at `position` if `confirm` accepts its row.
    ///
    /// Returns `None` when `confirm` declines; the vault is left as is.
    pub fn delete_with<F>(&mut self, position: usize, confirm: F) -> Result<Option<Listed>>
    where
        F: FnOnce(&Listed) -> Result<bool>,
    {
        let lock = self.write_lock()?;
        let mut vault = self.open_current()?;
        let row = row_at(&vault, position)?;
        if !confirm(&row)? {
            return Ok(None);
        }
        vault.delete(position)?;
        vault.persist(&lock)?;
        Ok(Some(row))
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Vault and session state.  Never prompts.
    pub fn status(&mut self) -> Result<ServiceStatus> {
        let session = self.session.status();

        let handle = match VaultStore::load(&self.path) {
            Ok(handle) => Some(handle),
            Err(PassGenError::VaultNotFound(_)) => None,
            Err(e) => return Err(e),
        };

        Ok(ServiceStatus {
            vault_path: self.path.clone(),
            vault_exists: handle.is_some(),
            entry_count: handle.as_ref().map(VaultHandle::entry_count).transpose()?,
            kdf_iterations: handle.as_ref().map(|h| h.header().kdf_iterations),
            created_at: handle.as_ref().map(|h| h.header().created_at),
            session,
        })
    }

    pub fn lock(&mut self) {
        self.session.lock();
    }

    pub fn lock_everywhere(&mut self) -> Result<()> {
        self.session.lock_everywhere()
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn write_lock(&self) -> Result<VaultLock> {
        VaultStore::lock(&self.path, Duration::from_millis(self.settings.lock_wait_ms))
    }

    /// Load, authenticate, open.
    ///
    /// If a cached secret no longer opens the vault (it was re-keyed by
    /// another process), the session is locked and the chain runs again.
    fn open_current(&mut self) -> Result<OpenVault> {
        let handle = VaultStore::load(&self.path)?;

        let secret = self.session.authenticate(&handle)?;
        match handle.open(secret.expose()) {
            Err(PassGenError::AuthenticationFailed) => {
                tracing::debug!("cached secret rejected; re-authenticating");
                self.session.lock();
                let secret = self.session.authenticate(&handle)?;
                handle.open(secret.expose())
            }
            result => result,
        }
    }
}

impl Drop for VaultService {
    fn drop(&mut self) {
        self.session.lock();
    }
}

fn row_at(vault: &OpenVault, position: usize) -> Result<Listed> {
    vault
        .list()
        .into_iter()
        .nth(position.wrapping_sub(1))
        .ok_or(PassGenError::InvalidSelection {
            position,
            len: vault.len(),
        })
}
