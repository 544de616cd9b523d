//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;
pub mod prompt;

use std::path::PathBuf;

use clap::Parser;

use crate::config::{resolve_home, Settings};
use crate::errors::{PassGenError, Result};
use crate::service::VaultService;
use crate::session::{
    app_id_for, KeyEscrowCapability, MasterSecret, NoBiometric, OneShotPassphrase,
    PassphrasePrompt, SessionConfig, SessionManager,
};

/// Minimum master password length to prevent trivially weak passwords.
const MIN_PASSWORD_LEN: usize = 8;

/// Environment variable holding the master password for scripted use.
pub const PASSWORD_ENV: &str = "PASSGEN_PASSWORD";

/// Environment variable holding the new master password for `passwd`.
pub const NEW_PASSWORD_ENV: &str = "PASSGEN_NEW_PASSWORD";

/// PassGen CLI: local encrypted password vault.
#[derive(Parser)]
#[command(
    name = "passgen",
    about = "Local encrypted password vault and generator",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// PassGen home directory (default: ~/.passgen)
    #[arg(long, env = "PASSGEN_HOME", global = true)]
    pub home: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new vault
    Init,

    /// List saved entries
    List {
        /// Only show entries matching this text
        #[arg(short, long)]
        query: Option<String>,

        /// Copy the password at this position to the clipboard
        #[arg(short, long)]
        copy: Option<usize>,
    },

    /// Search entries by site, username, tag or notes
    Search {
        /// Text to look for (case-insensitive)
        query: String,

        /// Copy the password at this position in the results
        #[arg(short, long)]
        copy: Option<usize>,
    },

    /// Add an entry
    Add {
        /// Site or service name
        #[arg(short, long)]
        site: Option<String>,

        /// Username or email
        #[arg(short, long)]
        username: Option<String>,

        /// Generate the password instead of typing it
        #[arg(short, long, conflicts_with = "password_stdin")]
        generate: bool,

        /// Length of the generated password
        #[arg(short, long, requires = "generate")]
        length: Option<usize>,

        /// Read the password from stdin
        #[arg(long)]
        password_stdin: bool,

        /// Comma-separated tags
        #[arg(short, long)]
        tags: Option<String>,

        /// Free-form notes
        #[arg(short, long)]
        notes: Option<String>,

        /// Copy the password to the clipboard after saving
        #[arg(short, long)]
        copy: bool,
    },

    /// Edit the entry at a position from `list`
    Edit {
        /// Position shown by `list`
        position: usize,

        /// New site name
        #[arg(short, long)]
        site: Option<String>,

        /// New username
        #[arg(short, long)]
        username: Option<String>,

        /// Replace the password with a generated one
        #[arg(short, long, conflicts_with = "password_stdin")]
        generate: bool,

        /// Length of the generated password
        #[arg(short, long, requires = "generate")]
        length: Option<usize>,

        /// Read the new password from stdin
        #[arg(long, conflicts_with = "prompt_password")]
        password_stdin: bool,

        /// Type a new password at a prompt
        #[arg(short, long, conflicts_with = "generate")]
        prompt_password: bool,

        /// Replace tags (comma-separated, empty to clear)
        #[arg(short, long)]
        tags: Option<String>,

        /// Replace notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Delete the entry at a position from `list`
    Delete {
        /// Position shown by `list`
        position: usize,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Show vault and session status
    Status,

    /// Show or change configuration
    Config {
        /// Print the current configuration
        #[arg(long)]
        show: bool,

        /// Restore all defaults
        #[arg(long, conflicts_with_all = ["session_timeout", "clipboard_timeout", "password_length", "symbols", "exclude"])]
        reset: bool,

        /// Session timeout in seconds (0 disables caching)
        #[arg(long)]
        session_timeout: Option<u64>,

        /// Clipboard auto-clear in seconds (0 never clears)
        #[arg(long)]
        clipboard_timeout: Option<u64>,

        /// Default generated password length
        #[arg(long)]
        password_length: Option<usize>,

        /// Symbol alphabet for generated passwords
        #[arg(long)]
        symbols: Option<String>,

        /// Characters never used in generated passwords
        #[arg(long)]
        exclude: Option<String>,
    },

    /// Delete the vault (and configuration)
    Reset {
        /// Only restore default configuration, keep the vault
        #[arg(long)]
        config_only: bool,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Change the master password
    Passwd,

    /// Forget the cached master password
    Lock,

    /// Generate a password without saving it
    Generate {
        /// Password length
        #[arg(short, long)]
        length: Option<usize>,

        /// Leave out uppercase letters
        #[arg(long)]
        no_uppercase: bool,

        /// Leave out lowercase letters
        #[arg(long)]
        no_lowercase: bool,

        /// Leave out digits
        #[arg(long)]
        no_digits: bool,

        /// Leave out symbols
        #[arg(long)]
        no_symbols: bool,

        /// Symbol alphabet to use
        #[arg(long)]
        symbols: Option<String>,

        /// Characters to leave out
        #[arg(short, long)]
        exclude: Option<String>,

        /// How many passwords to generate
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,

        /// Copy to the clipboard instead of printing (single password only)
        #[arg(short, long, conflicts_with = "count")]
        copy: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        shell: String,
    },

    /// Clear the clipboard after a delay if it is unchanged
    #[command(name = "__clear-clipboard", hide = true)]
    ClearClipboard {
        /// Seconds to wait
        #[arg(long)]
        after: u64,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// The home directory and settings for this invocation.
pub fn load_context(cli: &Cli) -> Result<(PathBuf, Settings)> {
    let home = resolve_home(cli.home.as_deref())?;
    let settings = Settings::load(&home)?;
    Ok((home, settings))
}

/// Build a `VaultService` for the vault under the resolved home.
pub fn build_service(cli: &Cli) -> Result<VaultService> {
    let (home, settings) = load_context(cli)?;
    Ok(service_for(&home, settings))
}

/// Build a `VaultService` for the vault under `home` with `settings`.
pub fn service_for(home: &std::path::Path, settings: Settings) -> VaultService {
    let path = Settings::vault_path(home);

    let session = SessionManager::new(
        app_id_for(&path),
        SessionConfig::from(&settings),
        Box::new(NoBiometric),
        escrow(),
        passphrase_source(),
    );
    VaultService::new(path, settings, session)
}

/// The escrow this build supports.
fn escrow() -> Box<dyn KeyEscrowCapability> {
    #[cfg(feature = "keyring-store")]
    {
        Box::new(crate::session::keyring_escrow::KeyringEscrow)
    }

    #[cfg(not(feature = "keyring-store"))]
    {
        Box::new(crate::session::NoEscrow)
    }
}

/// `PASSGEN_PASSWORD` if set (CI/scripts), otherwise the terminal.
fn passphrase_source() -> Box<dyn PassphrasePrompt> {
    match env_secret(PASSWORD_ENV) {
        Some(secret) => Box::new(OneShotPassphrase::new(Some(secret))),
        None => Box::new(prompt::TerminalPrompt),
    }
}

fn env_secret(var: &str) -> Option<MasterSecret> {
    std::env::var(var)
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(MasterSecret::from_string)
}

/// Get a new master password: from `var` if set, else prompt with
/// confirmation.  Enforces a minimum length.
pub fn new_master_secret(var: &str) -> Result<MasterSecret> {
    if let Some(secret) = env_secret(var) {
        if secret.expose().len() < MIN_PASSWORD_LEN {
            return Err(PassGenError::InvalidEntry(format!(
                "master password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        return Ok(secret);
    }

    loop {
        let password = prompt::new_password()?;
        if password.len() < MIN_PASSWORD_LEN {
            output::warning(&format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters. Try again."
            ));
            continue;
        }
        return Ok(MasterSecret::from_string(password));
    }
}

/// Split a comma-separated tag list.  Blank items are dropped.
pub fn parse_tags(raw: &str) -> std::collections::BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
