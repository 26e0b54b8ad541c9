//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "STDAQ";

/// Config file name
const CONFIG_FILE_NAME: &str = "stdaq.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "STDAQ_CONFIG";

/// Application directory under the platform config dir
const APP_DIR: &str = "stdaq";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Environment variables override any config file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = if let Some(ref path) = config_path {
            load_from_file(path)?
        } else {
            Config::default()
        };

        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        // Still apply env overrides even with defaults
        let _ = apply_env_overrides(&mut config);

        Self {
            config_path: None,
            config,
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. XDG config directory (Linux/macOS) or APPDATA (Windows)
    get_default_config_path().filter(|path| path.exists())
}

/// Get the platform-specific config directory.
fn get_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Save configuration to a file.
fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Apply environment variable overrides to the configuration.
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let Ok(val) = std::env::var(format!("{}_SERIAL_DEVICE", ENV_PREFIX)) {
        config.serial.default_device = Some(val);
    }
    if let Ok(val) = std::env::var(format!("{}_SERIAL_REOPEN_POLICY", ENV_PREFIX)) {
        config.serial.reopen_policy = val.parse().map_err(|message: String| {
            ConfigError::env_override(format!("{}_SERIAL_REOPEN_POLICY", ENV_PREFIX), message)
        })?;
    }

    if let Ok(val) = std::env::var(format!("{}_LOG_LEVEL", ENV_PREFIX)) {
        config.logging.level = val;
    }
    if let Ok(val) = std::env::var(format!("{}_LOG_FORMAT", ENV_PREFIX)) {
        config.logging.format = val.parse().map_err(|message: String| {
            ConfigError::env_override(format!("{}_LOG_FORMAT", ENV_PREFIX), message)
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;
    use crate::session::ReopenPolicy;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_default_loader() {
        let loader = ConfigLoader::with_defaults();
        assert!(loader.config_path.is_none());
        assert_eq!(loader.config().logging.level, "info");
    }

    #[test]
    #[serial]
    fn test_env_override() {
        env::set_var("STDAQ_SERIAL_DEVICE", "COM9");
        env::set_var("STDAQ_LOG_FORMAT", "json");

        let loader = ConfigLoader::with_defaults();
        assert_eq!(
            loader.config().serial.default_device.as_deref(),
            Some("COM9")
        );
        assert_eq!(loader.config().logging.format, LogFormat::Json);

        // Clean up
        env::remove_var("STDAQ_SERIAL_DEVICE");
        env::remove_var("STDAQ_LOG_FORMAT");
    }

    #[test]
    #[serial]
    fn test_invalid_env_override_is_reported() {
        env::set_var("STDAQ_SERIAL_REOPEN_POLICY", "sometimes");

        let mut config = Config::default();
        let err = apply_env_overrides(&mut config).unwrap_err();
        assert!(matches!(err, ConfigError::EnvOverride { ref var, .. } if var == "STDAQ_SERIAL_REOPEN_POLICY"));
        assert_eq!(config.serial.reopen_policy, ReopenPolicy::CloseThenReplace);

        env::remove_var("STDAQ_SERIAL_REOPEN_POLICY");
    }

    #[test]
    #[serial]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut loader = ConfigLoader::with_defaults();
        loader.config.serial.reopen_policy = ReopenPolicy::LeakPrevious;
        loader.save_to(&path).unwrap();

        let reloaded = ConfigLoader::load_from(&path).unwrap();
        assert_eq!(reloaded.config_path.as_deref(), Some(path.as_path()));
        assert_eq!(
            reloaded.config().serial.reopen_policy,
            ReopenPolicy::LeakPrevious
        );
    }

    #[test]
    #[serial]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::load_from(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    #[serial]
    fn test_malformed_file_is_parse_error_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[serial]\nreopen_policy = \"sometimes\"\n").unwrap();

        let err = ConfigLoader::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { path: ref p, .. } if p == &path));
    }

    #[test]
    #[serial]
    fn test_explicit_path_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[serial]\ndefault_device = \"COM12\"\n").unwrap();
        env::set_var(CONFIG_PATH_ENV, &path);

        let loader = ConfigLoader::load().unwrap();
        assert_eq!(loader.config_path.as_deref(), Some(path.as_path()));
        assert_eq!(
            loader.config().serial.default_device.as_deref(),
            Some("COM12")
        );

        env::remove_var(CONFIG_PATH_ENV);
    }
}
