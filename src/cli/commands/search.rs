//! `passgen search`: find entries by site, username, tag or notes.

use crate::cli::Cli;
use crate::errors::Result;

/// Execute the `search` command.
///
/// Positions refer to the search results, so `--copy 2` copies the
/// second match.
pub fn execute(cli: &Cli, query: &str, copy: Option<usize>) -> Result<()> {
    super::list::execute(cli, Some(query), copy)
}
