//! Camera configuration using Figment
//!
//! Configuration is loaded from:
//! 1. `config/camera.toml` (or a file given on the command line)
//! 2. Environment variables prefixed with `MIRRORLESS_`, nesting split on `__`
//!
//! A missing file is not an error; every field has a default.
//!
//! # Example
//! ```no_run
//! use mirrorless_camera::config::CameraConfig;
//!
//! let config = CameraConfig::load()?;
//! println!("Personality: {:?}", config.session.personality);
//! # Ok::<(), mirrorless_camera::error::CameraError>(())
//! ```

use crate::error::{AppResult, CameraError};
use crate::output_mode::{OutputMode, OutputModePolicy, Personality};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/camera.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "MIRRORLESS_";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Device to connect to, by device id or display name
    #[serde(default)]
    pub device_id: Option<String>,
    /// Session behaviour
    #[serde(default)]
    pub session: SessionConfig,
    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Session behaviour fixed for the lifetime of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Client integration profile
    #[serde(default)]
    pub personality: Personality,
    /// Representation requested when the personality does not force one
    #[serde(default)]
    pub preferred_output: OutputMode,
    /// Expose the liveview readout mode when the sensor supports it
    #[serde(default = "default_use_liveview")]
    pub use_liveview: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_use_liveview() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            personality: Personality::default(),
            preferred_output: OutputMode::default(),
            use_liveview: default_use_liveview(),
        }
    }
}

impl SessionConfig {
    /// Output-mode policy for these settings.
    pub fn policy(&self) -> OutputModePolicy {
        OutputModePolicy::new(self.personality, self.preferred_output, self.use_liveview)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl CameraConfig {
    /// Load configuration from `config/camera.toml` and environment variables
    ///
    /// Example: `MIRRORLESS_SESSION__PERSONALITY=legacy_monochrome_client`
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config: Self = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate().map_err(CameraError::Configuration)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            ));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_formats.join(", ")
            ));
        }

        if let Some(device_id) = &self.device_id {
            if device_id.trim().is_empty() {
                return Err("device_id must not be empty".to_string());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CameraConfig::default();
        assert_eq!(config.session.personality, Personality::Default);
        assert_eq!(config.session.preferred_output, OutputMode::DebayeredColor);
        assert!(config.session.use_liveview);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = CameraConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_format() {
        let mut config = CameraConfig::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_device_id() {
        let config = CameraConfig {
            device_id: Some("  ".to_string()),
            ..CameraConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
