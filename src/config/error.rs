//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors
///
/// Any of these means no module has run yet.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("config file parsing error: {0}")]
    Toml(toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),

    #[error("root folder `{0}` does not exist")]
    MissingRoot(PathBuf),
}

// NOTE: no #[from] on `Toml`, the parse message is already in the display
impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::Toml(err)
    }
}
