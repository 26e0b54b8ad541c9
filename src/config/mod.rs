//! Configuration module for stdaq-serial.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `STDAQ_CONFIG` environment variable (explicit path)
//! 2. `./stdaq.toml` (current directory)
//! 3. `~/.config/stdaq/stdaq.toml` (XDG on Linux/macOS)
//! 4. `%APPDATA%\stdaq\stdaq.toml` (Windows)
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! - `STDAQ_SERIAL_DEVICE=COM9`
//! - `STDAQ_SERIAL_REOPEN_POLICY=leak_previous`
//! - `STDAQ_LOG_LEVEL=debug`
//! - `STDAQ_LOG_FORMAT=json`
//!
//! # Example
//!
//! ```rust,no_run
//! use stdaq_serial::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! println!("Default device: {:?}", loader.config().serial.default_device);
//! # Ok::<(), stdaq_serial::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{get_default_config_path, resolve_config_path, ConfigLoader};
pub use schema::{Config, LogFormat, LoggingConfig, SerialConfig};
