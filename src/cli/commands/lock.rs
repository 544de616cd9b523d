//! `passgen lock`: forget the master password everywhere it is cached.

use crate::cli::output;
use crate::cli::{build_service, Cli};
use crate::errors::Result;

/// Execute the `lock` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let mut service = build_service(cli)?;
    service.lock_everywhere()?;
    output::success("Vault locked.");
    Ok(())
}
