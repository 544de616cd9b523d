//! `passgen edit`: change fields of an existing entry.
//!
//! Only the fields given on the command line change.  The password is
//! replaced only with `--generate`, `--password-stdin` or
//! `--prompt-password`.

use crate::cli::output;
use crate::cli::{build_service, parse_tags, Cli};
use crate::errors::{PassGenError, Result};
use crate::vault::EntryPatch;

use super::PasswordSource;

/// Options collected from the command line.
pub struct EditArgs<'a> {
    pub position: usize,
    pub site: Option<&'a str>,
    pub username: Option<&'a str>,
    pub generate: bool,
    pub length: Option<usize>,
    pub password_stdin: bool,
    pub prompt_password: bool,
    pub tags: Option<&'a str>,
    pub notes: Option<&'a str>,
}

/// Execute the `edit` command.
pub fn execute(cli: &Cli, args: EditArgs<'_>) -> Result<()> {
    let mut service = build_service(cli)?;

    let source = if args.generate {
        Some(PasswordSource::Generate(args.length))
    } else if args.password_stdin {
        Some(PasswordSource::Stdin)
    } else if args.prompt_password {
        Some(PasswordSource::Prompt)
    } else {
        None
    };

    let password = source
        .map(|s| super::obtain_password(service.settings(), s))
        .transpose()?;

    let patch = EntryPatch {
        site: args.site.map(str::to_string),
        username: args.username.map(str::to_string),
        password,
        tags: args.tags.map(parse_tags),
        notes: args.notes.map(str::to_string),
    };

    if patch.is_empty() {
        output::tip("Pass --site, --username, --tags, --notes or a password flag.");
        return Err(PassGenError::InvalidEntry("nothing to change".into()));
    }

    let row = service.update(args.position, patch)?;
    output::success(&format!(
        "Updated #{} {} ({})",
        row.position, row.site, row.username
    ));

    if args.generate {
        output::tip(&format!("Run `passgen list --copy {}` to copy it.", row.position));
    }

    Ok(())
}
