//! `passgen init`: create a new vault.

use crate::cli::output;
use crate::cli::{build_service, new_master_secret, Cli, PASSWORD_ENV};
use crate::errors::{PassGenError, Result};

/// Execute the `init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let mut service = build_service(cli)?;

    if service.path().exists() {
        output::tip("Use `passgen add` to add entries to the existing vault.");
        return Err(PassGenError::VaultAlreadyExists(service.path().to_path_buf()));
    }

    let secret = new_master_secret(PASSWORD_ENV)?;
    service.init(secret)?;

    output::success(&format!("Vault created at {}", service.path().display()));
    output::tip("Run `passgen add` to save your first password.");
    output::tip("Run `passgen generate` to create a strong password.");

    Ok(())
}
