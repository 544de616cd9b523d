//! Hidden `passgen __clear-clipboard` helper spawned after a copy.

use std::io::Read;
use std::time::Duration;

use crate::clipboard::clear_if_unchanged;
use crate::errors::Result;

/// Read the expected digest from stdin, wait, and clear if unchanged.
pub fn execute(after: u64) -> Result<()> {
    let mut digest = String::new();
    std::io::stdin().read_to_string(&mut digest)?;

    let cleared = clear_if_unchanged(&digest, Duration::from_secs(after))?;
    tracing::debug!(cleared, "clipboard helper finished");
    Ok(())
}
