//! Errors raised while loading or saving `stdaq.toml`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The stdaq config file exists but could not be read.
    #[error("cannot read stdaq config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the `[serial]`/`[logging]` schema.
    #[error("invalid stdaq config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot encode stdaq config: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("cannot write stdaq config '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A `STDAQ_*` override holds a value the setting does not accept.
    #[error("invalid value in {var}: {message}")]
    EnvOverride { var: String, message: String },
}

impl ConfigError {
    pub fn env_override(var: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EnvOverride {
            var: var.into(),
            message: message.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
