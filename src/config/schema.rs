//! Configuration schema definitions.
//!
//! Line parameters (baud rate, framing, timeouts) are fixed by the device
//! firmware and are deliberately absent here.

use crate::session::ReopenPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial session configuration
    pub serial: SerialConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Serial session configuration section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device used when the caller names none
    pub default_device: Option<String>,
    /// Behaviour of `open` on an already open session
    pub reopen_policy: ReopenPolicy,
    /// Port aliases for convenience
    pub port_aliases: HashMap<String, String>,
}

impl SerialConfig {
    /// Resolve a port name through aliases
    pub fn resolve_port(&self, name: &str) -> String {
        self.port_aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// The device to use: the explicit one, else the configured default,
    /// resolved through aliases.
    pub fn select_device(&self, explicit: Option<&str>) -> Option<String> {
        explicit
            .or(self.default_device.as_deref())
            .map(|name| self.resolve_port(name))
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "stdaq_serial=debug"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}
