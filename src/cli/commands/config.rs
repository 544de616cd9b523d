//! `passgen config`: show or change settings.

use comfy_table::{ContentArrangement, Table};

use crate::cli::output;
use crate::cli::Cli;
use crate::config::{resolve_home, Settings};
use crate::errors::Result;

/// Setters collected from the command line.
#[derive(Default)]
pub struct ConfigArgs<'a> {
    pub reset: bool,
    pub session_timeout: Option<u64>,
    pub clipboard_timeout: Option<u64>,
    pub password_length: Option<usize>,
    pub symbols: Option<&'a str>,
    pub exclude: Option<&'a str>,
}

impl ConfigArgs<'_> {
    fn has_changes(&self) -> bool {
        self.session_timeout.is_some()
            || self.clipboard_timeout.is_some()
            || self.password_length.is_some()
            || self.symbols.is_some()
            || self.exclude.is_some()
    }
}

/// Execute the `config` command.
///
/// With no setters (or with `--show`) the current settings are printed.
pub fn execute(cli: &Cli, args: ConfigArgs<'_>) -> Result<()> {
    let home = resolve_home(cli.home.as_deref())?;

    // Resetting must work even when the file on disk no longer parses.
    if args.reset {
        let settings = Settings::reset(&home)?;
        output::success("Configuration restored to defaults.");
        print_settings(&settings);
        return Ok(());
    }

    let mut settings = Settings::load(&home)?;

    if args.has_changes() {
        if let Some(v) = args.session_timeout {
            settings.session_timeout_seconds = v;
        }
        if let Some(v) = args.clipboard_timeout {
            settings.auto_clear_clipboard_seconds = v;
        }
        if let Some(v) = args.password_length {
            settings.default_password_length = v;
        }
        if let Some(v) = args.symbols {
            settings.default_symbols = v.to_string();
        }
        if let Some(v) = args.exclude {
            settings.default_exclude = v.to_string();
        }

        settings.save(&home)?;
        output::success("Configuration saved.");
    }

    print_settings(&settings);
    Ok(())
}

fn print_settings(settings: &Settings) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Setting", "Value"]);

    let on_off = |b: bool| if b { "on" } else { "off" }.to_string();
    let rows = [
        ("session_timeout_seconds", settings.session_timeout_seconds.to_string()),
        (
            "auto_clear_clipboard_seconds",
            settings.auto_clear_clipboard_seconds.to_string(),
        ),
        ("max_auth_attempts", settings.max_auth_attempts.to_string()),
        ("kdf_iterations", settings.kdf_iterations.to_string()),
        ("lock_wait_ms", settings.lock_wait_ms.to_string()),
        ("escrow_fallback", on_off(settings.escrow_fallback)),
        ("default_password_length", settings.default_password_length.to_string()),
        ("default_use_uppercase", on_off(settings.default_use_uppercase)),
        ("default_use_lowercase", on_off(settings.default_use_lowercase)),
        ("default_use_digits", on_off(settings.default_use_digits)),
        ("default_use_symbols", on_off(settings.default_use_symbols)),
        ("default_symbols", settings.default_symbols.clone()),
        ("default_exclude", settings.default_exclude.clone()),
    ];

    for (name, value) in rows {
        table.add_row(vec![name.to_string(), value]);
    }

    println!("{table}");
}
