//! Terminal prompts.

use std::io;

use dialoguer::{Confirm, Password};

use crate::errors::{PassGenError, Result};
use crate::session::{MasterSecret, PassphraseInput, PassphrasePrompt};

use super::output;

/// Asks for the master password on the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl PassphrasePrompt for TerminalPrompt {
    fn ask(&mut self, attempt: u32, max_attempts: u32) -> Result<PassphraseInput> {
        if !console::Term::stderr().features().is_attended() {
            return Ok(PassphraseInput::Exhausted);
        }

        if attempt > 1 {
            let left = max_attempts - attempt + 1;
            output::warning(&format!("Wrong password, {left} attempt(s) left."));
        }

        match Password::new().with_prompt("Master password").interact() {
            Ok(pw) => Ok(PassphraseInput::Entered(MasterSecret::from_string(pw))),
            Err(dialoguer::Error::IO(e)) if e.kind() == io::ErrorKind::Interrupted => {
                Ok(PassphraseInput::Cancelled)
            }
            Err(e) => Err(PassGenError::CommandFailed(format!("password prompt: {e}"))),
        }
    }
}

/// Prompt for a new master password with confirmation.
pub fn new_password() -> Result<String> {
    Password::new()
        .with_prompt("Choose master password")
        .with_confirmation(
            "Confirm master password",
            "Passwords do not match, try again",
        )
        .interact()
        .map_err(|e| PassGenError::CommandFailed(format!("password prompt: {e}")))
}

/// Prompt for an entry password with confirmation.
pub fn entry_password() -> Result<String> {
    Password::new()
        .with_prompt("Password")
        .with_confirmation("Confirm password", "Passwords do not match, try again")
        .interact()
        .map_err(|e| PassGenError::CommandFailed(format!("password prompt: {e}")))
}

/// Prompt for a line of text.  `allow_empty` permits a blank answer.
pub fn text(prompt: &str, allow_empty: bool) -> Result<String> {
    dialoguer::Input::<String>::new()
        .with_prompt(prompt)
        .allow_empty(allow_empty)
        .interact_text()
        .map_err(|e| PassGenError::CommandFailed(format!("input prompt: {e}")))
}

/// Yes/no question defaulting to "no".
pub fn confirm(prompt: &str) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| PassGenError::CommandFailed(format!("confirm prompt: {e}")))
}

/// Read one password line from stdin, without the trailing newline.
pub fn password_from_stdin() -> Result<String> {
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let trimmed_len = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed_len);
    Ok(line)
}
