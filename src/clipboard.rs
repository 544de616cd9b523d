//! Copying passwords to the system clipboard.
//!
//! `SystemClipboard` sets the text and, when asked to clear it later,
//! spawns a detached `passgen __clear-clipboard` helper.  The helper is
//! handed only the SHA-256 digest of the copied text (over stdin), sleeps,
//! and clears the clipboard if it still holds that text.

use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::errors::{PassGenError, Result};

/// Name of the hidden subcommand that performs a delayed clear.
pub const CLEAR_HELPER_COMMAND: &str = "__clear-clipboard";

/// Somewhere a revealed password can be sent.
pub trait ClipboardSink {
    /// Place `text` on the clipboard.  A non-zero `clear_after` schedules
    /// it to be removed again.
    fn copy(&mut self, text: &str, clear_after: Duration) -> Result<()>;
}

/// The desktop clipboard, via `arboard`.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl ClipboardSink for SystemClipboard {
    fn copy(&mut self, text: &str, clear_after: Duration) -> Result<()> {
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|e| PassGenError::ClipboardError(format!("clipboard unavailable: {e}")))?;
        clipboard
            .set_text(text.to_owned())
            .map_err(|e| PassGenError::ClipboardError(format!("failed to copy: {e}")))?;

        if !clear_after.is_zero() {
            spawn_clear_helper(&digest_hex(text), clear_after)?;
        }
        Ok(())
    }
}

/// Lowercase hex SHA-256 of `text`.
pub fn digest_hex(text: &str) -> String {
    Sha256::digest(text.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Start `passgen __clear-clipboard --after <secs>` with the digest on stdin.
fn spawn_clear_helper(digest: &str, after: Duration) -> Result<()> {
    let exe = std::env::current_exe()
        .map_err(|e| PassGenError::ClipboardError(format!("cannot locate executable: {e}")))?;

    let mut child = Command::new(exe)
        .arg(CLEAR_HELPER_COMMAND)
        .arg("--after")
        .arg(after.as_secs().to_string())
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| PassGenError::ClipboardError(format!("failed to start clear helper: {e}")))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(digest.as_bytes())?;
    }

    tracing::debug!(seconds = after.as_secs(), "clipboard clear scheduled");
    Ok(())
}

/// Body of the hidden helper: wait, then clear if the clipboard still
/// holds the text whose digest is `expected_digest`.
///
/// Returns whether the clipboard was cleared.
pub fn clear_if_unchanged(expected_digest: &str, after: Duration) -> Result<bool> {
    std::thread::sleep(after);

    let mut clipboard = arboard::Clipboard::new()
        .map_err(|e| PassGenError::ClipboardError(format!("clipboard unavailable: {e}")))?;

    let current = match clipboard.get_text() {
        Ok(text) => text,
        Err(_) => return Ok(false),
    };

    if !digest_matches(&digest_hex(&current), expected_digest) {
        return Ok(false);
    }

    clipboard
        .clear()
        .map_err(|e| PassGenError::ClipboardError(format!("failed to clear: {e}")))?;
    Ok(true)
}

fn digest_matches(actual: &str, expected: &str) -> bool {
    actual.as_bytes().ct_eq(expected.trim().as_bytes()).into()
}

/// In-memory sink that records what was copied.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    pub copies: Vec<(String, Duration)>,
}

impl ClipboardSink for MemoryClipboard {
    fn copy(&mut self, text: &str, clear_after: Duration) -> Result<()> {
        self.copies.push((text.to_owned(), clear_after));
        Ok(())
    }
}
