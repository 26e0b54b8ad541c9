use crate::config::ConfigError;
use crate::logging::LoggingError;
use crate::port::PortError;
use crate::session::{OpenError, ReadError, WriteError};
use thiserror::Error;

/// A specialized `Result` type for the command-line front end.
pub type AppResult<T> = Result<T, AppError>;

/// Unified application error type.
///
/// Library calls return their own error kinds; this type only gathers them
/// for the `stdaq` binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("No serial device given. Pass --device or set serial.default_device.")]
    NoDevice,

    #[error("The request payload is invalid: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Open(#[from] OpenError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("A serialization error occurred: {0}")]
    Serde(#[from] serde_json::Error),
}

impl AppError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoDevice | Self::InvalidPayload(_) | Self::Config(_) => 2,
            _ => 1,
        }
    }
}
