//! Error taxonomy for session operations.
//!
//! Every transport failure is translated into exactly one of these kinds.
//! The underlying `PortError` is kept as the source so the OS text reaches
//! the caller.

use crate::port::PortError;
use thiserror::Error;

/// Failure to bring a session into the Open state.
#[derive(Debug, Error)]
pub enum OpenError {
    /// The device could not be found or accessed.
    #[error("{device}: {source}")]
    DeviceUnavailable {
        device: String,
        #[source]
        source: PortError,
    },

    /// Discarding bytes in flight failed after the device was acquired.
    #[error("Failed to flush serial port {device}: {source}")]
    FlushFailed {
        device: String,
        #[source]
        source: PortError,
    },

    /// Installing timeouts or line settings failed.
    #[error("Failed to set serial settings on {device}: {source}")]
    ConfigFailed {
        device: String,
        #[source]
        source: PortError,
    },
}

impl OpenError {
    /// The device the failed open targeted.
    pub fn device(&self) -> &str {
        match self {
            Self::DeviceUnavailable { device, .. }
            | Self::FlushFailed { device, .. }
            | Self::ConfigFailed { device, .. } => device,
        }
    }
}

/// Failure of a single read call.
#[derive(Debug, Error)]
pub enum ReadError {
    /// No session is open.
    #[error("Failed to read from port: no serial session is open")]
    NotOpen,

    /// The read call itself failed. A timeout is not an error.
    #[error("Failed to read from port: {0}")]
    IoFailure(#[source] PortError),
}

/// Failure of a single write call.
#[derive(Debug, Error)]
pub enum WriteError {
    /// No session is open.
    #[error("Failed to write to port: no serial session is open")]
    NotOpen,

    /// The write call itself failed.
    #[error("Failed to write to port: {0}")]
    IoFailure(#[source] PortError),

    /// The transport accepted fewer bytes than requested.
    #[error("Failed to write all bytes to port: wrote {written} of {requested}")]
    PartialWrite { written: usize, requested: usize },
}
