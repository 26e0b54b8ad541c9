//! stdaq-serial library
//!
//! A serial-port session binding for exchanging raw bytes with the stDAQ
//! acquisition board from a scripting host.
//!
//! # Modules
//!
//! - `port`: transport abstraction, real `serialport` backend and mock
//! - `session`: open/read/write/close lifecycle for one port
//! - `host`: integer calling convention and the process-wide session
//! - `ffi`: C entry points (`stdaq_open`, `stdaq_read`, ...)
//! - `config`: TOML configuration with environment overrides
//! - `logging`: tracing subscriber setup
//! - `error`: application error for the CLI

pub mod config;
pub mod error;
pub mod ffi;
pub mod host;
pub mod logging;
pub mod port;
pub mod session;

// Re-export commonly used types for convenience
pub use error::{AppError, AppResult};
pub use host::{HostRead, HostSession, READ_BUFFER_CAPACITY};
pub use port::{
    MockPortOpener, MockSerialPort, PortConfiguration, PortError, PortOpener, SerialPortAdapter,
    SyncSerialPort, SystemPortOpener,
};
pub use session::{OpenError, ReadError, ReopenPolicy, SerialSession, SessionStatus, WriteError};

pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
