//! Configuration file discovery and TOML loading
//!
//! The bootstrap config file is located in this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Per-user config directory (`<config_dir>/<app>/config.toml`)
//! 4. System-wide config (`/etc/<app>/config.toml`, Linux only)
//!
//! A missing file is never fatal unless it was named explicitly on the
//! command line: the caller falls back to built-in defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where a resolved config path came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    CommandLine,
    Environment,
    UserConfigDir,
    SystemConfigDir,
}

/// A config file path together with its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    pub path: PathBuf,
    pub origin: ConfigOrigin,
}

/// Logging configuration shared by all binaries
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolves the bootstrap config file for one application
pub struct ConfigResolver {
    app_name: String,
    env_var_name: String,
}

impl ConfigResolver {
    /// Create a resolver for `app_name`, reading overrides from `env_var_name`
    pub fn new(app_name: &str, env_var_name: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            env_var_name: env_var_name.to_string(),
        }
    }

    /// Find the config file to load, if any.
    ///
    /// Command-line and environment paths are returned even when the file
    /// does not exist so the caller can decide how loud to be about it.
    /// Directory defaults are only returned when the file exists.
    pub fn resolve(&self, cli_arg: Option<&Path>) -> Option<ConfigLocation> {
        if let Some(path) = cli_arg {
            return Some(ConfigLocation {
                path: path.to_path_buf(),
                origin: ConfigOrigin::CommandLine,
            });
        }

        if let Ok(path) = std::env::var(&self.env_var_name) {
            if !path.is_empty() {
                return Some(ConfigLocation {
                    path: PathBuf::from(path),
                    origin: ConfigOrigin::Environment,
                });
            }
        }

        if let Some(path) = self.user_config_path() {
            if path.exists() {
                return Some(ConfigLocation {
                    path,
                    origin: ConfigOrigin::UserConfigDir,
                });
            }
        }

        if cfg!(target_os = "linux") {
            let system = PathBuf::from("/etc").join(&self.app_name).join("config.toml");
            if system.exists() {
                return Some(ConfigLocation {
                    path: system,
                    origin: ConfigOrigin::SystemConfigDir,
                });
            }
        }

        None
    }

    /// Per-user config file path for this platform
    pub fn user_config_path(&self) -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(&self.app_name).join("config.toml"))
    }

    /// Resolve and load the config file, falling back to `T::default()`.
    ///
    /// Nothing is logged here: this usually runs before the subscriber
    /// exists, so the caller reports the returned [`ConfigSource`] once
    /// logging is up.
    ///
    /// # Errors
    /// - Explicit `--config` path that does not exist
    /// - Any file that exists but cannot be read or parsed
    pub fn load_or_default<T>(&self, cli_arg: Option<&Path>) -> Result<(T, ConfigSource)>
    where
        T: DeserializeOwned + Default,
    {
        let Some(location) = self.resolve(cli_arg) else {
            return Ok((T::default(), ConfigSource::Defaults));
        };

        if !location.path.exists() {
            if location.origin == ConfigOrigin::CommandLine {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    location.path.display()
                )));
            }
            return Ok((T::default(), ConfigSource::Missing(location)));
        }

        let value = load_toml(&location.path)?;
        Ok((value, ConfigSource::File(location)))
    }
}

/// Outcome of [`ConfigResolver::load_or_default`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Values were read from this file
    File(ConfigLocation),
    /// No config file was found anywhere
    Defaults,
    /// A path was named (environment) but no file exists there
    Missing(ConfigLocation),
}

impl ConfigSource {
    /// File the values came from, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::File(location) => Some(&location.path),
            _ => None,
        }
    }

    /// Report where configuration came from. Call after logging is set up.
    pub fn log(&self) {
        match self {
            ConfigSource::File(location) => {
                info!("Loaded configuration from {}", location.path.display())
            }
            ConfigSource::Defaults => debug!("No config file found, using built-in defaults"),
            ConfigSource::Missing(location) => warn!(
                "Config file {} ({:?}) not found, using built-in defaults",
                location.path.display(),
                location.origin
            ),
        }
    }
}

/// Read and deserialize one TOML file
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|source| Error::Toml {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Sample {
        #[serde(default)]
        name: String,
        #[serde(default)]
        logging: LoggingConfig,
    }

    #[test]
    fn test_logging_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.file.is_none());
    }

    #[test]
    fn test_logging_section_partial() {
        let parsed: Sample = toml::from_str("[logging]\nfile = \"/tmp/x.log\"\n").unwrap();
        assert_eq!(parsed.logging.level, "info");
        assert_eq!(parsed.logging.file, Some(PathBuf::from("/tmp/x.log")));
    }

    #[test]
    fn test_cli_path_wins() {
        let resolver = ConfigResolver::new("panmeter-test", "PANMETER_TEST_UNUSED_VAR");
        let location = resolver.resolve(Some(Path::new("/nonexistent/a.toml"))).unwrap();
        assert_eq!(location.origin, ConfigOrigin::CommandLine);
        assert_eq!(location.path, PathBuf::from("/nonexistent/a.toml"));
    }

    #[test]
    fn test_missing_cli_path_is_error() {
        let resolver = ConfigResolver::new("panmeter-test", "PANMETER_TEST_UNUSED_VAR");
        let result: Result<(Sample, _)> =
            resolver.load_or_default(Some(Path::new("/nonexistent/panmeter.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_config_source_path_only_for_loaded_file() {
        let location = ConfigLocation {
            path: PathBuf::from("/nonexistent/a.toml"),
            origin: ConfigOrigin::Environment,
        };
        assert_eq!(ConfigSource::Missing(location.clone()).path(), None);
        assert_eq!(ConfigSource::Defaults.path(), None);
        assert_eq!(
            ConfigSource::File(location).path(),
            Some(Path::new("/nonexistent/a.toml"))
        );
    }
}
