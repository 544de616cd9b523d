//! `passgen reset`: delete the vault and restore default settings.

use crate::cli::{output, prompt};
use crate::cli::{service_for, Cli};
use crate::config::{resolve_home, Settings};
use crate::errors::{PassGenError, Result};

/// Execute the `reset` command.
pub fn execute(cli: &Cli, config_only: bool, force: bool) -> Result<()> {
    let home = resolve_home(cli.home.as_deref())?;

    let question = if config_only {
        "Restore default configuration?"
    } else {
        "Delete the vault and every saved password? This cannot be undone"
    };
    if !force && !prompt::confirm(question)? {
        output::info("Cancelled.");
        return Ok(());
    }

    if !config_only {
        // A broken config file must not block deleting the vault.
        let settings = Settings::load(&home).unwrap_or_default();
        let mut service = service_for(&home, settings);

        match service.destroy() {
            Ok(()) => output::success("Vault deleted."),
            Err(PassGenError::VaultNotFound(_)) => {
                output::info("No vault to delete.");
                service.lock_everywhere()?;
            }
            Err(e) => return Err(e),
        }
    }

    Settings::reset(&home)?;
    output::success("Configuration restored to defaults.");

    if !config_only {
        output::tip("Run `passgen init` to start a new vault.");
    }

    Ok(())
}
