//! `passgen passwd`: change the master password.

use crate::cli::output;
use crate::cli::{build_service, new_master_secret, Cli, NEW_PASSWORD_ENV};
use crate::errors::Result;

/// Execute the `passwd` command.
///
/// The current password is checked first so a typo is caught before
/// the new one is asked for.
pub fn execute(cli: &Cli) -> Result<()> {
    let mut service = build_service(cli)?;

    service.change_secret_with(|| new_master_secret(NEW_PASSWORD_ENV))?;

    output::success("Master password changed.");
    output::tip("Every entry was re-encrypted with a fresh salt.");

    Ok(())
}
