//! Port-specific error types.
//!
//! Transport failures are kept separate from the session taxonomy; the
//! session decides which step (acquire, flush, configure, read, write)
//! a `PortError` belongs to.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial port was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Port configuration failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation timed out.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a Timeout error from a duration.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout(duration)
    }

    /// Whether this error means "the timeout elapsed with nothing to transfer".
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ),
            Self::Serial(e) => matches!(
                e.kind(),
                serialport::ErrorKind::Io(std::io::ErrorKind::TimedOut)
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PortError::not_found("COM9");
        assert_eq!(err.to_string(), "Serial port not found: COM9");

        let err = PortError::config("unsupported baud rate");
        assert_eq!(err.to_string(), "Configuration error: unsupported baud rate");
    }

    #[test]
    fn test_timeout_error() {
        let err = PortError::timeout(Duration::from_millis(1));
        assert!(err.to_string().contains("1ms"));
        assert!(err.is_timeout());
    }

    #[test]
    fn test_io_timeout_kinds() {
        let timed_out = PortError::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "Operation timed out",
        ));
        assert!(timed_out.is_timeout());

        let would_block = PortError::Io(std::io::ErrorKind::WouldBlock.into());
        assert!(would_block.is_timeout());

        let broken = PortError::Io(std::io::ErrorKind::BrokenPipe.into());
        assert!(!broken.is_timeout());
        assert!(!PortError::not_found("COM1").is_timeout());
    }
}
