//! panmeter configuration file
//!
//! ```toml
//! [analysis]
//! window_seconds = 0.05
//! floor_db = -60.0
//! scope = "per_chunk"      # or "whole_stream"
//!
//! [playback]
//! enabled = true
//! device = "default"
//! buffer_frames = 1024
//! ring_frames = 8192
//!
//! [display]
//! refresh_ms = 50
//! db_min = -60.0
//! db_max = 0.0
//! bar_width = 40
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every key is optional. Command-line flags override file values.

use crate::analysis::LIVE_FLOOR_DB;
use crate::audio::ring_buffer::DEFAULT_RING_FRAMES;
use crate::engine::{AccumulationScope, EngineConfig, LIVE_WINDOW_SECONDS, MAX_WINDOW_SECONDS};
use crate::error::{Error, Result};
use panmeter_common::config::{ConfigResolver, ConfigSource, LoggingConfig};
use serde::Deserialize;
use std::path::Path;

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "PANMETER_CONFIG";

/// Application name used for the config directory
pub const APP_NAME: &str = "panmeter";

/// Top-level configuration file contents
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct MeterConfig {
    pub analysis: AnalysisConfig,
    pub playback: PlaybackConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    /// Analysis window length in seconds
    #[serde(default = "default_window_seconds")]
    pub window_seconds: f64,

    /// Level reported for silence and empty windows (dB)
    #[serde(default = "default_floor_db")]
    pub floor_db: f64,

    #[serde(default = "default_scope")]
    pub scope: AccumulationScope,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_seconds: default_window_seconds(),
            floor_db: default_floor_db(),
            scope: default_scope(),
        }
    }
}

fn default_window_seconds() -> f64 {
    LIVE_WINDOW_SECONDS
}

fn default_floor_db() -> f64 {
    LIVE_FLOOR_DB
}

fn default_scope() -> AccumulationScope {
    AccumulationScope::PerChunk
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// Play the input on an output device while metering
    #[serde(default = "default_playback_enabled")]
    pub enabled: bool,

    /// Output device name; "default" or absent uses the system default
    #[serde(default)]
    pub device: Option<String>,

    /// Requested device buffer size in frames (None = driver default)
    #[serde(default)]
    pub buffer_frames: Option<u32>,

    /// Frame ring capacity between engine and audio callback
    #[serde(default = "default_ring_frames")]
    pub ring_frames: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            enabled: default_playback_enabled(),
            device: None,
            buffer_frames: None,
            ring_frames: default_ring_frames(),
        }
    }
}

fn default_playback_enabled() -> bool {
    true
}

fn default_ring_frames() -> usize {
    DEFAULT_RING_FRAMES
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DisplayConfig {
    /// Redraw interval in milliseconds
    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,

    /// Level drawn as an empty bar
    #[serde(default = "default_db_min")]
    pub db_min: f64,

    /// Level drawn as a full bar
    #[serde(default = "default_db_max")]
    pub db_max: f64,

    /// Bar width in characters
    #[serde(default = "default_bar_width")]
    pub bar_width: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_ms: default_refresh_ms(),
            db_min: default_db_min(),
            db_max: default_db_max(),
            bar_width: default_bar_width(),
        }
    }
}

fn default_refresh_ms() -> u64 {
    50
}

fn default_db_min() -> f64 {
    -60.0
}

fn default_db_max() -> f64 {
    0.0
}

fn default_bar_width() -> usize {
    40
}

impl MeterConfig {
    /// Load from `--config`, `PANMETER_CONFIG` or the user config dir,
    /// falling back to defaults. Also returns where the values came from,
    /// to be logged once logging is initialized.
    pub fn load(cli_path: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let resolver = ConfigResolver::new(APP_NAME, CONFIG_ENV_VAR);
        let (config, source): (Self, _) = resolver.load_or_default(cli_path)?;
        config.validate()?;
        Ok((config, source))
    }

    /// Reject values the engine or display cannot work with
    pub fn validate(&self) -> Result<()> {
        let window = self.analysis.window_seconds;
        if !window.is_finite() || window <= 0.0 || window > MAX_WINDOW_SECONDS {
            return Err(Error::Config(format!(
                "analysis.window_seconds must be in (0, {}], got {}",
                MAX_WINDOW_SECONDS, window
            )));
        }
        if !self.analysis.floor_db.is_finite() {
            return Err(Error::Config(format!(
                "analysis.floor_db must be finite, got {}",
                self.analysis.floor_db
            )));
        }
        if self.playback.ring_frames == 0 {
            return Err(Error::Config("playback.ring_frames must be at least 1".to_string()));
        }
        if self.display.refresh_ms == 0 {
            return Err(Error::Config("display.refresh_ms must be at least 1".to_string()));
        }
        let (min, max) = (self.display.db_min, self.display.db_max);
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(Error::Config(format!(
                "display range must satisfy db_min < db_max, got {}..{}",
                min, max
            )));
        }
        Ok(())
    }

    /// Engine parameters from the `[analysis]` section
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            window_seconds: self.analysis.window_seconds,
            floor_db: self.analysis.floor_db,
            scope: self.analysis.scope,
        }
    }

    /// Output device name, treating "default" as unset
    pub fn playback_device(&self) -> Option<&str> {
        self.playback
            .device
            .as_deref()
            .filter(|name| !name.is_empty() && *name != "default")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: MeterConfig = toml::from_str("").unwrap();
        assert_eq!(config, MeterConfig::default());
        assert_eq!(config.engine_config(), EngineConfig::live());
        assert!(config.playback.enabled);
        assert_eq!(config.display.refresh_ms, 50);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config: MeterConfig = toml::from_str(
            r#"
            [analysis]
            scope = "whole_stream"
            floor_db = -90.0

            [playback]
            device = "USB Audio"
            "#,
        )
        .unwrap();

        assert_eq!(config.analysis.scope, AccumulationScope::WholeStream);
        assert_eq!(config.analysis.floor_db, -90.0);
        assert_eq!(config.analysis.window_seconds, LIVE_WINDOW_SECONDS);
        assert_eq!(config.playback_device(), Some("USB Audio"));
        assert_eq!(config.playback.ring_frames, DEFAULT_RING_FRAMES);
    }

    #[test]
    fn test_default_device_name_means_system_default() {
        let mut config = MeterConfig::default();
        config.playback.device = Some("default".to_string());
        assert_eq!(config.playback_device(), None);
    }

    #[test]
    fn test_unknown_scope_rejected() {
        let result: std::result::Result<MeterConfig, _> = toml::from_str(
            r#"
            [analysis]
            scope = "sometimes"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = MeterConfig::default();
        config.analysis.window_seconds = 0.0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = MeterConfig::default();
        config.analysis.window_seconds = 1e15;
        assert!(matches!(
            config.validate(),
            Err(Error::Config(msg)) if msg.contains("window_seconds")
        ));

        let mut config = MeterConfig::default();
        config.analysis.window_seconds = MAX_WINDOW_SECONDS;
        assert!(config.validate().is_ok());

        let mut config = MeterConfig::default();
        config.analysis.floor_db = f64::NEG_INFINITY;
        assert!(config.validate().is_err());

        let mut config = MeterConfig::default();
        config.display.db_min = 0.0;
        assert!(config.validate().is_err());

        assert!(MeterConfig::default().validate().is_ok());
    }
}
