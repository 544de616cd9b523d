//! Entry types: the persisted record, the decrypted entry, and the
//! drafts and patches used to create and change them.
//!
//! Only the password is encrypted.  Site, username, tags, notes and
//! timestamps are stored in the clear but are bound into each entry's
//! associated data, so editing any of them on disk breaks the tag.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::Sealed;
use crate::errors::{PassGenError, Result};

/// Longest accepted site name, in characters.
pub const MAX_SITE_LEN: usize = 200;

/// Longest accepted notes field, in characters.
pub const MAX_NOTES_LEN: usize = 1000;

/// Domain prefix for entry associated data.
const ENTRY_AAD_PREFIX: &[u8] = b"passgen/entry/v2";

/// A single entry as written to the vault file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultEntry {
    pub site: String,
    pub username: String,

    /// The encrypted password.
    pub secret: Sealed,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    #[serde(default)]
    pub notes: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The metadata fields covered by an entry's associated data.
#[derive(Serialize)]
struct EntryBinding<'a> {
    index: usize,
    site: &'a str,
    username: &'a str,
    tags: &'a BTreeSet<String>,
    notes: &'a str,
    created_at: &'a DateTime<Utc>,
    updated_at: &'a DateTime<Utc>,
}

/// Associated data for an entry stored at `index`.
///
/// Tags are a `BTreeSet`, so their order is canonical.
fn binding_aad(binding: &EntryBinding<'_>) -> Result<Vec<u8>> {
    let mut aad = ENTRY_AAD_PREFIX.to_vec();
    serde_json::to_writer(&mut aad, binding)
        .map_err(|e| PassGenError::SerializationError(format!("entry binding: {e}")))?;
    Ok(aad)
}

impl VaultEntry {
    /// Associated data this record must have been sealed with at `index`.
    pub(crate) fn aad(&self, index: usize) -> Result<Vec<u8>> {
        binding_aad(&EntryBinding {
            index,
            site: &self.site,
            username: &self.username,
            tags: &self.tags,
            notes: &self.notes,
            created_at: &self.created_at,
            updated_at: &self.updated_at,
        })
    }
}

/// A decrypted entry held in memory while the vault is open.
#[derive(Clone)]
pub struct Entry {
    pub site: String,
    pub username: String,
    pub password: Zeroizing<String>,
    pub tags: BTreeSet<String>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("site", &self.site)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("tags", &self.tags)
            .field("notes", &self.notes)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl Entry {
    /// Rebuild a decrypted entry from its persisted form and plaintext.
    pub(crate) fn from_stored(stored: VaultEntry, password: Zeroizing<String>) -> Self {
        Self {
            site: stored.site,
            username: stored.username,
            password,
            tags: stored.tags,
            notes: stored.notes,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        }
    }

    /// Associated data for sealing this entry's password at `index`.
    pub(crate) fn aad(&self, index: usize) -> Result<Vec<u8>> {
        binding_aad(&EntryBinding {
            index,
            site: &self.site,
            username: &self.username,
            tags: &self.tags,
            notes: &self.notes,
            created_at: &self.created_at,
            updated_at: &self.updated_at,
        })
    }

    /// Persisted form with the given sealed password.
    pub(crate) fn to_stored(&self, secret: Sealed) -> VaultEntry {
        VaultEntry {
            site: self.site.clone(),
            username: self.username.clone(),
            secret,
            tags: self.tags.clone(),
            notes: self.notes.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Case-insensitive substring match over site, username, tags and notes.
    ///
    /// `needle` must already be lowercased.  The empty needle matches.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        self.site.to_lowercase().contains(needle)
            || self.username.to_lowercase().contains(needle)
            || self.notes.to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}

/// Fields for a new entry.
#[derive(Clone, Default)]
pub struct EntryDraft {
    pub site: String,
    pub username: String,
    pub password: Zeroizing<String>,
    pub tags: BTreeSet<String>,
    pub notes: String,
}

impl EntryDraft {
    /// Check field constraints and turn the draft into an entry stamped `now`.
    pub(crate) fn into_entry(self, now: DateTime<Utc>) -> Result<Entry> {
        let site = self.site.trim().to_string();
        validate_site(&site)?;
        validate_password(&self.password)?;
        validate_notes(&self.notes)?;

        Ok(Entry {
            site,
            username: self.username.trim().to_string(),
            password: self.password,
            tags: normalize_tags(self.tags),
            notes: self.notes,
            created_at: now,
            updated_at: now,
        })
    }
}

/// A partial change to an existing entry.  `None` leaves the field as is.
#[derive(Clone, Default)]
pub struct EntryPatch {
    pub site: Option<String>,
    pub username: Option<String>,
    pub password: Option<Zeroizing<String>>,
    pub tags: Option<BTreeSet<String>>,
    pub notes: Option<String>,
}

impl EntryPatch {
    /// True when the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.site.is_none()
            && self.username.is_none()
            && self.password.is_none()
            && self.tags.is_none()
            && self.notes.is_none()
    }

    /// Validate every provided field before anything is applied.
    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(site) = &self.site {
            validate_site(site.trim())?;
        }
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        if let Some(notes) = &self.notes {
            validate_notes(notes)?;
        }
        Ok(())
    }

    /// Apply the patch, bumping `updated_at` to `now`.  Call `validate` first.
    pub(crate) fn apply(self, entry: &mut Entry, now: DateTime<Utc>) {
        if let Some(site) = self.site {
            entry.site = site.trim().to_string();
        }
        if let Some(username) = self.username {
            entry.username = username.trim().to_string();
        }
        if let Some(password) = self.password {
            entry.password = password;
        }
        if let Some(tags) = self.tags {
            entry.tags = normalize_tags(tags);
        }
        if let Some(notes) = self.notes {
            entry.notes = notes;
        }
        entry.updated_at = now;
    }
}

/// In-memory identity of an entry while a vault is open.
///
/// Assigned from a counter when the vault is opened or an entry is added.
/// Never persisted and never shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(pub(crate) u64);

/// What listings and searches return: everything but the password.
#[derive(Debug, Clone)]
pub struct Listed {
    /// 1-based position within the listing that produced this row.
    pub position: usize,
    pub id: EntryId,
    pub site: String,
    pub username: String,
    pub tags: BTreeSet<String>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listed {
    pub(crate) fn of(position: usize, id: EntryId, entry: &Entry) -> Self {
        Self {
            position,
            id,
            site: entry.site.clone(),
            username: entry.username.clone(),
            tags: entry.tags.clone(),
            notes: entry.notes.clone(),
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_site(site: &str) -> Result<()> {
    if site.is_empty() {
        return Err(PassGenError::InvalidEntry("site cannot be empty".into()));
    }
    if site.chars().count() > MAX_SITE_LEN {
        return Err(PassGenError::InvalidEntry(format!(
            "site is longer than {MAX_SITE_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(PassGenError::InvalidEntry("password cannot be empty".into()));
    }
    Ok(())
}

fn validate_notes(notes: &str) -> Result<()> {
    if notes.chars().count() > MAX_NOTES_LEN {
        return Err(PassGenError::InvalidEntry(format!(
            "notes are longer than {MAX_NOTES_LEN} characters"
        )));
    }
    Ok(())
}

/// Trim tags and drop empty ones.
fn normalize_tags(tags: BTreeSet<String>) -> BTreeSet<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}
