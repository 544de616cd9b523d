//! `passgen list`: show saved entries in a table.

use crate::cli::output;
use crate::cli::{build_service, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli, query: Option<&str>, copy: Option<usize>) -> Result<()> {
    let mut service = build_service(cli)?;

    if let Some(position) = copy {
        return super::copy_selected(&mut service, query, position);
    }

    let rows = match query {
        Some(q) => service.search(q)?,
        None => service.list()?,
    };

    if rows.is_empty() {
        match query {
            Some(q) => output::info(&format!("No entries match '{q}'.")),
            None => {
                output::info("No entries in this vault yet.");
                output::tip("Run `passgen add` to save your first password.");
            }
        }
        return Ok(());
    }

    output::info(&format!("{} entr{}", rows.len(), if rows.len() == 1 { "y" } else { "ies" }));
    output::print_entries_table(&rows);
    output::tip("Run `passgen list --copy <#>` to copy a password.");

    Ok(())
}
