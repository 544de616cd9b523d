//! Random password generation.
//!
//! Passwords are drawn from the enabled character classes using the
//! thread-local CSPRNG.  Every enabled class contributes at least one
//! character; the rest are drawn from the union of all classes and the
//! result is shuffled.

use rand::Rng;
use zeroize::Zeroizing;

use crate::errors::{PassGenError, Result};

/// Shortest password the generator will produce.
pub const MIN_LENGTH: usize = 4;

/// Longest password the generator will produce.
pub const MAX_LENGTH: usize = 128;

const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const DIGITS: &str = "0123456789";

/// What a generated password may contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub length: usize,
    pub use_uppercase: bool,
    pub use_lowercase: bool,
    pub use_digits: bool,
    pub use_symbols: bool,
    /// The symbol alphabet used when `use_symbols` is set.
    pub symbols: String,
    /// Characters removed from every class.
    pub exclude: String,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        crate::config::Settings::default().password_policy()
    }
}

impl PasswordPolicy {
    /// The enabled classes, each with excluded characters removed.
    fn classes(&self) -> Result<Vec<Vec<char>>> {
        let enabled = [
            (self.use_uppercase, "uppercase", UPPERCASE),
            (self.use_lowercase, "lowercase", LOWERCASE),
            (self.use_digits, "digits", DIGITS),
            (self.use_symbols, "symbols", self.symbols.as_str()),
        ];

        let mut classes = Vec::new();
        for (on, name, alphabet) in enabled {
            if !on {
                continue;
            }
            let mut chars: Vec<char> = alphabet
                .chars()
                .filter(|c| !self.exclude.contains(*c))
                .collect();
            chars.sort_unstable();
            chars.dedup();

            if chars.is_empty() {
                return Err(PassGenError::ConfigValidationError(format!(
                    "no {name} left after exclusions"
                )));
            }
            classes.push(chars);
        }

        if classes.is_empty() {
            return Err(PassGenError::ConfigValidationError(
                "at least one character class must be enabled".into(),
            ));
        }
        Ok(classes)
    }
}

/// Generate a password satisfying `policy`.
pub fn generate(policy: &PasswordPolicy) -> Result<Zeroizing<String>> {
    if !(MIN_LENGTH..=MAX_LENGTH).contains(&policy.length) {
        return Err(PassGenError::ConfigValidationError(format!(
            "password length must be between {MIN_LENGTH} and {MAX_LENGTH} (got {})",
            policy.length
        )));
    }

    let classes = policy.classes()?;
    if classes.len() > policy.length {
        return Err(PassGenError::ConfigValidationError(format!(
            "length {} is too short for {} character classes",
            policy.length,
            classes.len()
        )));
    }

    let mut pool: Vec<char> = classes.iter().flatten().copied().collect();
    pool.sort_unstable();
    pool.dedup();

    let mut rng = rand::rng();
    let mut chars = Zeroizing::new(Vec::with_capacity(policy.length));

    // One from each class first, then fill from the whole pool.
    for class in &classes {
        chars.push(class[rng.random_range(0..class.len())]);
    }
    while chars.len() < policy.length {
        chars.push(pool[rng.random_range(0..pool.len())]);
    }

    // Fisher-Yates so the guaranteed characters are not always up front.
    for i in (1..chars.len()).rev() {
        let j = rng.random_range(0..=i);
        chars.swap(i, j);
    }

    Ok(Zeroizing::new(chars.iter().collect()))
}
