//! `passgen add`: save a new entry.

use crate::cli::{build_service, parse_tags, Cli};
use crate::cli::{output, prompt};
use crate::clipboard::SystemClipboard;
use crate::errors::{PassGenError, Result};
use crate::vault::EntryDraft;

use super::PasswordSource;

/// Options collected from the command line.
pub struct AddArgs<'a> {
    pub site: Option<&'a str>,
    pub username: Option<&'a str>,
    pub generate: bool,
    pub length: Option<usize>,
    pub password_stdin: bool,
    pub tags: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub copy: bool,
}

/// Execute the `add` command.
pub fn execute(cli: &Cli, args: AddArgs<'_>) -> Result<()> {
    let mut service = build_service(cli)?;

    // Fail before asking for anything if there is nowhere to save it.
    if !service.path().exists() {
        output::tip("Run `passgen init` first.");
        return Err(PassGenError::VaultNotFound(service.path().to_path_buf()));
    }

    // 1. Fill in whatever was not given as a flag.
    let site = match args.site {
        Some(s) => s.to_string(),
        None => prompt::text("Site", false)?,
    };
    let username = match args.username {
        Some(u) => u.to_string(),
        None => prompt::text("Username", true)?,
    };

    // 2. Work out the password.
    let source = if args.generate {
        PasswordSource::Generate(args.length)
    } else if args.password_stdin {
        PasswordSource::Stdin
    } else {
        PasswordSource::Prompt
    };
    let password = super::obtain_password(service.settings(), source)?;

    // 3. Save it.
    let draft = EntryDraft {
        site,
        username,
        password: password.clone(),
        tags: args.tags.map(parse_tags).unwrap_or_default(),
        notes: args.notes.unwrap_or_default().to_string(),
    };
    let display = format!("{} ({})", draft.site.trim(), draft.username.trim());
    let position = service.add(draft)?;

    output::success(&format!("Saved {display} as #{position}"));

    if args.copy {
        super::copy_to_clipboard(&mut SystemClipboard, service.settings(), &password)?;
    } else if args.generate {
        output::tip(&format!("Run `passgen list --copy {position}` to copy it."));
    }

    Ok(())
}
