//! `passgen delete`: remove an entry by its position.

use crate::cli::{build_service, Cli};
use crate::cli::{output, prompt};
use crate::errors::Result;

/// Execute the `delete` command.
pub fn execute(cli: &Cli, position: usize, force: bool) -> Result<()> {
    let mut service = build_service(cli)?;

    // Unless --force is set, show the entry and ask before deleting.
    let deleted = service.delete_with(position, |row| {
        if force {
            return Ok(true);
        }
        prompt::confirm(&format!(
            "Delete #{} {} ({})?",
            row.position, row.site, row.username
        ))
    })?;

    let Some(row) = deleted else {
        output::info("Cancelled.");
        return Ok(());
    };

    output::success(&format!("Deleted {} ({})", row.site, row.username));
    output::tip("Positions after it have moved up by one.");

    Ok(())
}
