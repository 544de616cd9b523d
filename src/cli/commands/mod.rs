//! Command implementations, one module per subcommand.

pub mod add;
pub mod clear_clipboard;
pub mod completions;
pub mod config;
pub mod delete;
pub mod edit;
pub mod generate;
pub mod init;
pub mod list;
pub mod lock;
pub mod passwd;
pub mod reset;
pub mod search;
pub mod status;

use std::time::Duration;

use zeroize::Zeroizing;

use crate::cli::{output, prompt};
use crate::clipboard::{ClipboardSink, SystemClipboard};
use crate::config::Settings;
use crate::errors::Result;
use crate::generator;
use crate::service::VaultService;

/// Copy the password at `position` of the listing for `query`.
pub(crate) fn copy_selected(
    service: &mut VaultService,
    query: Option<&str>,
    position: usize,
) -> Result<()> {
    let (row, password) = service.reveal_selected(query, position)?;
    copy_to_clipboard(&mut SystemClipboard, service.settings(), &password)?;

    if row.username.is_empty() {
        output::success(&format!("Copied password for {}", row.site));
    } else {
        output::success(&format!(
            "Copied password for {} ({})",
            row.site, row.username
        ));
    }
    Ok(())
}

/// Put `text` on the clipboard, clearing it after the configured delay.
pub(crate) fn copy_to_clipboard(
    sink: &mut dyn ClipboardSink,
    settings: &Settings,
    text: &str,
) -> Result<()> {
    let seconds = settings.auto_clear_clipboard_seconds;
    sink.copy(text, Duration::from_secs(seconds))?;

    if seconds > 0 {
        output::info(&format!("Clipboard will be cleared in {seconds} seconds."));
    }
    Ok(())
}

/// Where a new password comes from.
pub(crate) enum PasswordSource {
    Generate(Option<usize>),
    Stdin,
    Prompt,
}

pub(crate) fn obtain_password(
    settings: &Settings,
    source: PasswordSource,
) -> Result<Zeroizing<String>> {
    match source {
        PasswordSource::Generate(length) => {
            let mut policy = settings.password_policy();
            if let Some(length) = length {
                policy.length = length;
            }
            generator::generate(&policy)
        }
        PasswordSource::Stdin => Ok(Zeroizing::new(prompt::password_from_stdin()?)),
        PasswordSource::Prompt => Ok(Zeroizing::new(prompt::entry_password()?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;

    #[test]
    fn copy_uses_the_configured_clear_delay() {
        let settings = Settings {
            auto_clear_clipboard_seconds: 12,
            ..Settings::default()
        };
        let mut sink = MemoryClipboard::default();

        copy_to_clipboard(&mut sink, &settings, "hunter2").unwrap();
        assert_eq!(
            sink.copies,
            vec![("hunter2".to_string(), Duration::from_secs(12))]
        );
    }

    #[test]
    fn generated_password_uses_the_requested_length() {
        let settings = Settings::default();
        let password = obtain_password(&settings, PasswordSource::Generate(Some(31))).unwrap();
        assert_eq!(password.chars().count(), 31);

        let password = obtain_password(&settings, PasswordSource::Generate(None)).unwrap();
        assert_eq!(password.chars().count(), settings.default_password_length);
    }
}
