//! `passgen completions`: print a shell completion script.
//!
//!   passgen completions bash > ~/.local/share/bash-completion/completions/passgen
//!   passgen completions zsh > "${fpath[1]}/_passgen"

use std::io;

use clap::{CommandFactory, ValueEnum};
use clap_complete::{generate, Shell};

use crate::cli::Cli;
use crate::errors::{PassGenError, Result};

/// Execute the `completions` command.
pub fn execute(shell: &str) -> Result<()> {
    let shell = parse_shell(shell)?;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
    Ok(())
}

/// Accepts any `clap_complete` shell name, case-insensitively, plus `ps`.
fn parse_shell(name: &str) -> Result<Shell> {
    let name = match name.trim() {
        "ps" | "PS" => "powershell",
        other => other,
    };

    Shell::from_str(name, true).map_err(|_| {
        let known: Vec<String> = Shell::value_variants()
            .iter()
            .filter_map(|s| s.to_possible_value())
            .map(|v| v.get_name().to_string())
            .collect();
        PassGenError::CommandFailed(format!(
            "unknown shell '{name}' (supported: {})",
            known.join(", ")
        ))
    })
}
