//! Tracing initialisation.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the binary (or a test). `RUST_LOG` takes precedence over the configured
//! level.
//!
//! # Example
//! ```no_run
//! use mirrorless_camera::{config::CameraConfig, logging};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CameraConfig::load()?;
//! logging::init_from_config(&config)?;
//! tracing::info!("camera core ready");
//! # Ok(())
//! # }
//! ```

use crate::config::CameraConfig;
use crate::error::{AppResult, CameraError};
use std::io::IsTerminal;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Multi-line, coloured when stderr is a terminal
    Pretty,
    /// One line per event
    Compact,
    /// One JSON object per event
    Json,
}

impl FromStr for OutputFormat {
    type Err = CameraError;

    fn from_str(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(OutputFormat::Pretty),
            "compact" => Ok(OutputFormat::Compact),
            "json" => Ok(OutputFormat::Json),
            _ => Err(CameraError::Configuration(format!(
                "Invalid log format '{s}'. Must be one of: pretty, compact, json"
            ))),
        }
    }
}

/// Subscriber settings resolved from `[logging]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracingConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: Level,
    /// Line format
    pub format: OutputFormat,
}

impl TracingConfig {
    /// Settings with an explicit level and format.
    pub fn new(level: Level, format: OutputFormat) -> Self {
        Self { level, format }
    }

    /// Resolve the `[logging]` section of the camera configuration.
    pub fn from_camera_config(config: &CameraConfig) -> AppResult<Self> {
        Ok(Self::new(
            parse_log_level(&config.logging.level)?,
            config.logging.format.parse()?,
        ))
    }
}

/// Initialize tracing from the camera configuration.
pub fn init_from_config(config: &CameraConfig) -> AppResult<()> {
    init(TracingConfig::from_camera_config(config)?)
}

/// Install the global subscriber.
///
/// Returns `Ok(())` when a subscriber is already installed, so tests and
/// embedding applications can call it more than once.
pub fn init(config: TracingConfig) -> AppResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str().to_lowercase()));

    let base = fmt::layer().with_writer(std::io::stderr).with_target(true);
    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        OutputFormat::Pretty => base
            .pretty()
            .with_ansi(std::io::stderr().is_terminal())
            .boxed(),
        OutputFormat::Compact => base.compact().with_ansi(false).boxed(),
        OutputFormat::Json => base.json().with_ansi(false).boxed(),
    };

    match tracing_subscriber::registry()
        .with(layer.with_filter(env_filter))
        .try_init()
    {
        Ok(()) => Ok(()),
        Err(e) if e.to_string().contains("already been set") => Ok(()),
        Err(e) => Err(CameraError::Configuration(format!(
            "Failed to initialize tracing: {e}"
        ))),
    }
}

fn parse_log_level(level: &str) -> AppResult<Level> {
    Level::from_str(level).map_err(|_| {
        CameraError::Configuration(format!(
            "Invalid log level '{level}'. Must be one of: trace, debug, info, warn, error"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert!(matches!(parse_log_level("trace"), Ok(Level::TRACE)));
        assert!(matches!(parse_log_level("warn"), Ok(Level::WARN)));
        assert!(matches!(parse_log_level("Debug"), Ok(Level::DEBUG)));
        assert!(parse_log_level("loud").is_err());
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!(matches!(
            "xml".parse::<OutputFormat>(),
            Err(CameraError::Configuration(_))
        ));
    }

    #[test]
    fn test_from_camera_config() {
        let mut config = CameraConfig::default();
        config.logging.level = "debug".to_string();
        config.logging.format = "json".to_string();

        let tracing_config = TracingConfig::from_camera_config(&config).unwrap();
        assert_eq!(
            tracing_config,
            TracingConfig::new(Level::DEBUG, OutputFormat::Json)
        );
    }
}
