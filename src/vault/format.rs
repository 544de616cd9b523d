//! Binary vault file format and crash-safe writes.
//!
//! A vault file has this layout:
//!
//! ```text
//! [PGv2: 4 bytes][version: 1 byte][header_len: 4 bytes LE][header JSON][entries JSON]
//! ```
//!
//! - **Magic** (`PGv2`): identifies the file as a PassGen vault.
//! - **Version**: format version (currently `2`).
//! - **Header length**: little-endian u32 telling us where the header
//!   JSON ends and the entries JSON begins.
//! - **Header JSON**: serialized `VaultHeader` (salt, KDF cost, verifier).
//! - **Entries JSON**: serialized `Vec<VaultEntry>`.
//!
//! Integrity comes from the AEAD tags: the verifier authenticates the
//! secret and each entry's tag authenticates its ciphertext and metadata.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entry::VaultEntry;
use crate::crypto::encoding::{base64_decode, base64_encode};
use crate::crypto::Sealed;
use crate::errors::{PassGenError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of every vault file.
const MAGIC: &[u8; 4] = b"PGv2";

/// Current binary format version.
pub const CURRENT_VERSION: u8 = 2;

/// Fixed-size prefix: 4 (magic) + 1 (version) + 4 (header_len).
const PREFIX_LEN: usize = 9;

// ---------------------------------------------------------------------------
// VaultHeader
// ---------------------------------------------------------------------------

/// Metadata stored at the beginning of a vault file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultHeader {
    /// Format version, repeated from the binary prefix.
    pub format_version: u8,

    /// The salt used for PBKDF2 key derivation (base64 in JSON).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub kdf_salt: Vec<u8>,

    /// PBKDF2 iteration count fixed when the vault was created.
    pub kdf_iterations: u32,

    /// The verifier label sealed under the derived key.
    pub verifier: Sealed,

    /// When this vault was first created.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Serialize a header and entry list into the binary envelope.
pub fn encode_vault(header: &VaultHeader, entries: &[VaultEntry]) -> Result<Vec<u8>> {
    let header_bytes = serde_json::to_vec(header)
        .map_err(|e| PassGenError::SerializationError(format!("header: {e}")))?;
    let entries_bytes = serde_json::to_vec(entries)
        .map_err(|e| PassGenError::SerializationError(format!("entries: {e}")))?;

    let header_len = u32::try_from(header_bytes.len()).map_err(|_| {
        PassGenError::SerializationError(format!(
            "header length {} exceeds u32::MAX",
            header_bytes.len()
        ))
    })?;

    let mut buf = Vec::with_capacity(PREFIX_LEN + header_bytes.len() + entries_bytes.len());
    buf.extend_from_slice(MAGIC); // 4 bytes
    buf.push(CURRENT_VERSION); // 1 byte
    buf.extend_from_slice(&header_len.to_le_bytes()); // 4 bytes LE
    buf.extend_from_slice(&header_bytes); // header JSON
    buf.extend_from_slice(&entries_bytes); // entries JSON
    Ok(buf)
}

/// A vault file with its header parsed and its entries still raw.
pub struct RawVault {
    pub header: VaultHeader,
    /// The entries JSON exactly as stored on disk.
    pub entries_bytes: Vec<u8>,
}

/// Read a vault file and parse its header only.
pub fn read_vault(path: &Path) -> Result<RawVault> {
    if !path.exists() {
        return Err(PassGenError::VaultNotFound(path.to_path_buf()));
    }

    let data = fs::read(path)?;
    decode_vault(&data)
}

/// Split a binary envelope into header and raw entries.
pub fn decode_vault(data: &[u8]) -> Result<RawVault> {
    if data.len() < PREFIX_LEN {
        return Err(PassGenError::FormatError(
            "file too small to be a valid vault".into(),
        ));
    }

    if &data[0..4] != MAGIC {
        return Err(PassGenError::FormatError("missing PGv2 magic bytes".into()));
    }

    let version = data[4];
    if version != CURRENT_VERSION {
        return Err(PassGenError::FormatError(format!(
            "unsupported version {version}, expected {CURRENT_VERSION}"
        )));
    }

    let header_len_u32 = u32::from_le_bytes(
        data[5..9]
            .try_into()
            .map_err(|_| PassGenError::FormatError("bad header length".into()))?,
    );
    let header_len = usize::try_from(header_len_u32).map_err(|_| {
        PassGenError::FormatError(format!(
            "header length {header_len_u32} exceeds platform address space"
        ))
    })?;

    let header_end = PREFIX_LEN
        .checked_add(header_len)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| PassGenError::FormatError("header length exceeds file size".into()))?;

    let header: VaultHeader = serde_json::from_slice(&data[PREFIX_LEN..header_end])
        .map_err(|e| PassGenError::FormatError(format!("header JSON: {e}")))?;

    if header.format_version != version {
        return Err(PassGenError::FormatError(format!(
            "header version {} does not match file version {version}",
            header.format_version
        )));
    }
    if header.kdf_salt.len() < 16 {
        return Err(PassGenError::FormatError("KDF salt is too short".into()));
    }

    Ok(RawVault {
        header,
        entries_bytes: data[header_end..].to_vec(),
    })
}

/// Parse the entries section of a vault file.
pub fn decode_entries(entries_bytes: &[u8]) -> Result<Vec<VaultEntry>> {
    serde_json::from_slice(entries_bytes)
        .map_err(|e| PassGenError::FormatError(format!("entries JSON: {e}")))
}

// ---------------------------------------------------------------------------
// Atomic writes
// ---------------------------------------------------------------------------

/// Bytes written and flushed to a temp file next to the target, not yet
/// renamed into place.
///
/// Dropping a `StagedWrite` without calling `commit` removes the temp
/// file and leaves the target untouched.
#[derive(Debug)]
pub struct StagedWrite {
    tmp_path: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedWrite {
    /// Path of the temp file holding the staged bytes.
    pub fn tmp_path(&self) -> &Path {
        &self.tmp_path
    }

    /// Atomically replace the target with the staged file.
    ///
    /// Renames the temp file over the target, syncs the directory entry,
    /// and re-applies owner-only permissions.
    pub fn commit(mut self) -> Result<()> {
        fs::rename(&self.tmp_path, &self.target)?;
        self.committed = true;

        sync_parent_dir(&self.target)?;
        set_owner_only(&self.target)?;
        Ok(())
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}

/// Write `bytes` to a temp file in the same directory as `target` and
/// flush it to durable storage.
///
/// The temp file is in the same directory so the later rename stays on
/// one filesystem and is atomic.
pub fn stage_write(target: &Path, bytes: &[u8]) -> Result<StagedWrite> {
    let parent = parent_dir(target);
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        target.file_name().unwrap_or_default().to_string_lossy()
    ));

    let staged = StagedWrite {
        tmp_path,
        target: target.to_path_buf(),
        committed: false,
    };

    let mut file = open_owner_only(&staged.tmp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;

    Ok(staged)
}

/// Stage and commit in one step.
pub fn write_vault(target: &Path, header: &VaultHeader, entries: &[VaultEntry]) -> Result<()> {
    let bytes = encode_vault(header, entries)?;
    stage_write(target, &bytes)?.commit()
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Create (or truncate a stale) temp file with mode 0600 from the start.
fn open_owner_only(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    Ok(options.open(path)?)
}

/// Restrict a file to owner read/write.
pub fn set_owner_only(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}

/// Flush the directory entry so the rename itself survives a crash.
fn sync_parent_dir(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        File::open(parent_dir(path))?.sync_all()?;
    }

    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{compute_verifier, derive_key, generate_salt, MIN_ITERATIONS};
    use tempfile::TempDir;

    fn sample_header() -> VaultHeader {
        let salt = generate_salt();
        let key = derive_key(b"pw", &salt, MIN_ITERATIONS).unwrap();
        VaultHeader {
            format_version: CURRENT_VERSION,
            kdf_salt: salt.to_vec(),
            kdf_iterations: MIN_ITERATIONS,
            verifier: compute_verifier(&key).unwrap(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn encoded_vault_starts_with_magic_and_version() {
        let bytes = encode_vault(&sample_header(), &[]).unwrap();
        assert_eq!(&bytes[0..4], b"PGv2");
        assert_eq!(bytes[4], CURRENT_VERSION);
    }

    #[test]
    fn decode_recovers_header_and_entries() {
        let header = sample_header();
        let bytes = encode_vault(&header, &[]).unwrap();

        let raw = decode_vault(&bytes).unwrap();
        assert_eq!(raw.header.kdf_salt, header.kdf_salt);
        assert_eq!(raw.header.kdf_iterations, MIN_ITERATIONS);
        assert_eq!(raw.header.verifier, header.verifier);
        assert!(decode_entries(&raw.entries_bytes).unwrap().is_empty());
    }

    #[test]
    fn decode_rejects_wrong_magic() {
        let mut bytes = encode_vault(&sample_header(), &[]).unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            decode_vault(&bytes),
            Err(PassGenError::FormatError(_))
        ));
    }

    #[test]
    fn decode_rejects_unsupported_version() {
        let mut bytes = encode_vault(&sample_header(), &[]).unwrap();
        bytes[4] = 1;
        assert!(matches!(
            decode_vault(&bytes),
            Err(PassGenError::FormatError(_))
        ));
    }

    #[test]
    fn decode_rejects_oversized_header_length() {
        let mut bytes = encode_vault(&sample_header(), &[]).unwrap();
        bytes[5..9].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            decode_vault(&bytes),
            Err(PassGenError::FormatError(_))
        ));
    }

    #[test]
    fn read_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let result = read_vault(&dir.path().join("absent.db"));
        assert!(matches!(result, Err(PassGenError::VaultNotFound(_))));
    }

    #[test]
    fn dropped_stage_leaves_target_unchanged() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("vault.db");
        fs::write(&target, b"original").unwrap();

        let staged = stage_write(&target, b"replacement").unwrap();
        let tmp = staged.tmp_path().to_path_buf();
        assert!(tmp.exists());
        drop(staged);

        assert!(!tmp.exists(), "temp file should be cleaned up");
        assert_eq!(fs::read(&target).unwrap(), b"original");
    }

    #[test]
    fn commit_replaces_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("vault.db");
        fs::write(&target, b"original").unwrap();

        stage_write(&target, b"replacement").unwrap().commit().unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"replacement");
    }

    #[cfg(unix)]
    #[test]
    fn committed_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("vault.db");
        fs::write(&target, b"original").unwrap();
        fs::set_permissions(&target, fs::Permissions::from_mode(0o644)).unwrap();

        stage_write(&target, b"replacement").unwrap().commit().unwrap();

        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
