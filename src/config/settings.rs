use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::MIN_ITERATIONS;
use crate::errors::{PassGenError, Result};

/// User configuration, loaded from `<home>/config.toml`.
///
/// Every field has a sensible default so PassGen works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// How long an unlocked session stays cached, in seconds.  `0` disables
    /// the in-process cache.
    #[serde(default = "default_session_timeout_seconds")]
    pub session_timeout_seconds: u64,

    /// Seconds after a copy before the clipboard is cleared.  `0` never clears.
    #[serde(default = "default_auto_clear_clipboard_seconds")]
    pub auto_clear_clipboard_seconds: u64,

    /// Interactive passphrase tries before giving up.
    #[serde(default = "default_max_auth_attempts")]
    pub max_auth_attempts: u32,

    /// PBKDF2 iterations for new vaults and re-keying.
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// How long to wait for another process's write lock, in milliseconds.
    #[serde(default = "default_lock_wait_ms")]
    pub lock_wait_ms: u64,

    /// Try the escrowed secret when biometric unlock is unavailable.
    #[serde(default = "default_true")]
    pub escrow_fallback: bool,

    #[serde(default = "default_password_length")]
    pub default_password_length: usize,

    #[serde(default = "default_true")]
    pub default_use_uppercase: bool,

    #[serde(default = "default_true")]
    pub default_use_lowercase: bool,

    #[serde(default = "default_true")]
    pub default_use_digits: bool,

    #[serde(default = "default_true")]
    pub default_use_symbols: bool,

    #[serde(default = "default_symbols")]
    pub default_symbols: String,

    /// Characters never emitted by the generator.
    #[serde(default)]
    pub default_exclude: String,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_session_timeout_seconds() -> u64 {
    300
}

fn default_auto_clear_clipboard_seconds() -> u64 {
    30
}

fn default_max_auth_attempts() -> u32 {
    3
}

fn default_kdf_iterations() -> u32 {
    crate::crypto::DEFAULT_ITERATIONS
}

fn default_lock_wait_ms() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

fn default_password_length() -> usize {
    16
}

fn default_symbols() -> String {
    "!@#$%^&*()_+-=[]{}|;:,.<>?".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            session_timeout_seconds: default_session_timeout_seconds(),
            auto_clear_clipboard_seconds: default_auto_clear_clipboard_seconds(),
            max_auth_attempts: default_max_auth_attempts(),
            kdf_iterations: default_kdf_iterations(),
            lock_wait_ms: default_lock_wait_ms(),
            escrow_fallback: default_true(),
            default_password_length: default_password_length(),
            default_use_uppercase: default_true(),
            default_use_lowercase: default_true(),
            default_use_digits: default_true(),
            default_use_symbols: default_true(),
            default_symbols: default_symbols(),
            default_exclude: String::new(),
        }
    }
}

impl Settings {
    /// Name of the config file inside the PassGen home directory.
    const FILE_NAME: &'static str = "config.toml";

    /// Name of the vault file inside the PassGen home directory.
    const VAULT_FILE: &'static str = "vault.db";

    /// Path of the config file under `home`.
    pub fn config_path(home: &Path) -> PathBuf {
        home.join(Self::FILE_NAME)
    }

    /// Path of the vault file under `home`.
    pub fn vault_path(home: &Path) -> PathBuf {
        home.join(Self::VAULT_FILE)
    }

    /// Load settings from `<home>/config.toml`.
    ///
    /// If the file does not exist, defaults are returned.  If it exists
    /// but cannot be parsed or holds out-of-range values, an error is
    /// returned.
    pub fn load(home: &Path) -> Result<Self> {
        let config_path = Self::config_path(home);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            PassGenError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate and write settings to `<home>/config.toml` with mode 0600.
    pub fn save(&self, home: &Path) -> Result<()> {
        self.validate()?;

        let contents = toml::to_string_pretty(self)
            .map_err(|e| PassGenError::ConfigError(format!("Failed to serialize settings: {e}")))?;

        std::fs::create_dir_all(home)?;
        let config_path = Self::config_path(home);
        crate::vault::format::stage_write(&config_path, contents.as_bytes())?.commit()?;

        tracing::debug!(path = %config_path.display(), "settings saved");
        Ok(())
    }

    /// Restore defaults on disk and return them.
    pub fn reset(home: &Path) -> Result<Self> {
        let settings = Self::default();
        settings.save(home)?;
        Ok(settings)
    }

    /// Check every field is within its accepted range.
    pub fn validate(&self) -> Result<()> {
        if !(4..=128).contains(&self.default_password_length) {
            return Err(PassGenError::ConfigValidationError(format!(
                "default_password_length must be between 4 and 128 (got {})",
                self.default_password_length
            )));
        }

        if !(self.default_use_uppercase
            || self.default_use_lowercase
            || self.default_use_digits
            || self.default_use_symbols)
        {
            return Err(PassGenError::ConfigValidationError(
                "at least one character class must be enabled".into(),
            ));
        }

        if self.default_use_symbols && self.default_symbols.is_empty() {
            return Err(PassGenError::ConfigValidationError(
                "default_symbols cannot be empty while symbols are enabled".into(),
            ));
        }

        if self.max_auth_attempts == 0 {
            return Err(PassGenError::ConfigValidationError(
                "max_auth_attempts must be at least 1".into(),
            ));
        }

        if self.kdf_iterations < MIN_ITERATIONS {
            return Err(PassGenError::ConfigValidationError(format!(
                "kdf_iterations must be at least {MIN_ITERATIONS} (got {})",
                self.kdf_iterations
            )));
        }

        Ok(())
    }

    /// The generator policy described by the `default_*` fields.
    pub fn password_policy(&self) -> crate::generator::PasswordPolicy {
        crate::generator::PasswordPolicy {
            length: self.default_password_length,
            use_uppercase: self.default_use_uppercase,
            use_lowercase: self.default_use_lowercase,
            use_digits: self.default_use_digits,
            use_symbols: self.default_use_symbols,
            symbols: self.default_symbols.clone(),
            exclude: self.default_exclude.clone(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
