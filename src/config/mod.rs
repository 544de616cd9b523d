//! Configuration: the `Settings` file and the PassGen home directory.

pub mod settings;

use std::path::{Path, PathBuf};

use crate::errors::{PassGenError, Result};

pub use settings::Settings;

/// Directory name used under the user's home when no override is given.
const HOME_DIR_NAME: &str = ".passgen";

/// Resolve the PassGen home: the explicit override if any, else `~/.passgen`.
pub fn resolve_home(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    dirs::home_dir()
        .map(|home| home.join(HOME_DIR_NAME))
        .ok_or_else(|| PassGenError::ConfigError("could not determine home directory".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_home_wins() {
        let home = resolve_home(Some(Path::new("/tmp/pg"))).unwrap();
        assert_eq!(home, PathBuf::from("/tmp/pg"));
    }
}
