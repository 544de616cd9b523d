//! `passgen generate`: print random passwords without saving them.

use crate::cli::output;
use crate::cli::{load_context, Cli};
use crate::clipboard::SystemClipboard;
use crate::errors::Result;
use crate::generator::{self, PasswordPolicy};

/// Options collected from the command line.
#[derive(Default)]
pub struct GenerateArgs<'a> {
    pub length: Option<usize>,
    pub no_uppercase: bool,
    pub no_lowercase: bool,
    pub no_digits: bool,
    pub no_symbols: bool,
    pub symbols: Option<&'a str>,
    pub exclude: Option<&'a str>,
    pub count: usize,
    pub copy: bool,
}

impl GenerateArgs<'_> {
    /// `base` with the flags applied on top.
    pub fn policy(&self, mut base: PasswordPolicy) -> PasswordPolicy {
        if let Some(length) = self.length {
            base.length = length;
        }
        base.use_uppercase &= !self.no_uppercase;
        base.use_lowercase &= !self.no_lowercase;
        base.use_digits &= !self.no_digits;
        base.use_symbols &= !self.no_symbols;
        if let Some(symbols) = self.symbols {
            base.symbols = symbols.to_string();
        }
        if let Some(exclude) = self.exclude {
            base.exclude = exclude.to_string();
        }
        base
    }
}

/// Execute the `generate` command.
pub fn execute(cli: &Cli, args: GenerateArgs<'_>) -> Result<()> {
    let (_, settings) = load_context(cli)?;
    let policy = args.policy(settings.password_policy());

    if args.copy {
        let password = generator::generate(&policy)?;
        super::copy_to_clipboard(&mut SystemClipboard, &settings, &password)?;
        output::success(&format!("Copied a {}-character password.", policy.length));
        return Ok(());
    }

    for _ in 0..args.count.max(1) {
        let password = generator::generate(&policy)?;
        println!("{}", password.as_str());
    }

    Ok(())
}
