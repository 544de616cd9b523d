//! Cross-process exclusion for vault writes.
//!
//! Every write cycle (load, modify, persist) holds a `VaultLock`: an
//! exclusive advisory lock on a sidecar `.<vault>.lock` file.  The OS
//! drops the lock when the holder exits, so a crashed process never
//! leaves the vault stuck.
//!
//! Acquisition polls until a bounded deadline and then fails with
//! `Busy` instead of blocking forever.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs4::fs_std::FileExt;

use crate::errors::{PassGenError, Result};

/// How long to sleep between acquisition attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// An exclusive lock over one vault file.  Released on drop.
#[derive(Debug)]
pub struct VaultLock {
    target: PathBuf,
    file: File,
}

impl VaultLock {
    /// Take the lock for `target`, waiting at most `wait`.
    ///
    /// Creates the vault's parent directory if needed so the sidecar
    /// file has somewhere to live.
    pub fn acquire(target: &Path, wait: Duration) -> Result<Self> {
        let lock_path = lock_path_for(target);
        if let Some(parent) = lock_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = open_lock_file(&lock_path)?;
        let deadline = Instant::now() + wait;
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => {
                    tracing::debug!(path = %target.display(), "vault lock acquired");
                    return Ok(Self {
                        target: target.to_path_buf(),
                        file,
                    });
                }
                Err(e) if is_contended(&e) => {}
                Err(e) => return Err(e.into()),
            }

            if Instant::now() >= deadline {
                tracing::warn!(path = %target.display(), "timed out waiting for vault lock");
                return Err(PassGenError::Busy(target.to_path_buf()));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// The vault file this lock guards.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Whether this lock covers `path`.
    pub fn guards(&self, path: &Path) -> bool {
        self.target == path
    }
}

impl Drop for VaultLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(error = %e, "could not release vault lock");
        }
        tracing::debug!(path = %self.target.display(), "vault lock released");
    }
}

/// `.<name>.lock` next to the vault file.
fn lock_path_for(target: &Path) -> PathBuf {
    let name = target.file_name().unwrap_or_default().to_string_lossy();
    target.with_file_name(format!(".{name}.lock"))
}

fn open_lock_file(lock_path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true).truncate(false);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    Ok(options.open(lock_path)?)
}

/// Whether a failed `try_lock_exclusive` means someone else holds the lock.
fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs4::lock_contended_error().raw_os_error()
}
