//! Configuration loading tests
//!
//! These touch files and process environment variables, so every test runs
//! under `#[serial]`.

use mirrorless_camera::config::CameraConfig;
use mirrorless_camera::logging::{self, OutputFormat, TracingConfig};
use mirrorless_camera::output_mode::{OutputMode, Personality};
use mirrorless_camera::CameraError;
use serial_test::serial;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::Level;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn clear_env() {
    for key in [
        "MIRRORLESS_DEVICE_ID",
        "MIRRORLESS_SESSION__PERSONALITY",
        "MIRRORLESS_LOGGING__LEVEL",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_missing_file_uses_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let config = CameraConfig::load_from(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, CameraConfig::default());
}

#[test]
#[serial]
fn test_load_from_file() {
    clear_env();
    let file = write_config(
        r#"
device_id = "ILCE-7M3"

[session]
personality = "legacy_monochrome_client"
preferred_output = "raw_bayer"
use_liveview = false

[logging]
level = "debug"
format = "json"
"#,
    );

    let config = CameraConfig::load_from(file.path()).unwrap();
    assert_eq!(config.device_id.as_deref(), Some("ILCE-7M3"));
    assert_eq!(config.session.personality, Personality::LegacyMonochromeClient);
    assert_eq!(config.session.preferred_output, OutputMode::RawBayer);
    assert!(!config.session.use_liveview);
    assert_eq!(config.logging.format, "json");
}

#[test]
#[serial]
fn test_env_overrides_file() {
    clear_env();
    let file = write_config(
        r#"
[session]
personality = "default"
"#,
    );
    std::env::set_var("MIRRORLESS_SESSION__PERSONALITY", "legacy_monochrome_client");
    std::env::set_var("MIRRORLESS_DEVICE_ID", "usb:001:004");

    let config = CameraConfig::load_from(file.path());
    clear_env();

    let config = config.unwrap();
    assert_eq!(config.session.personality, Personality::LegacyMonochromeClient);
    assert_eq!(config.device_id.as_deref(), Some("usb:001:004"));
    assert!(config.session.use_liveview);
}

#[test]
#[serial]
fn test_invalid_values_are_rejected() {
    clear_env();
    let bad_level = write_config("[logging]\nlevel = \"chatty\"\n");
    assert!(matches!(
        CameraConfig::load_from(bad_level.path()),
        Err(CameraError::Configuration(_))
    ));

    let bad_personality = write_config("[session]\npersonality = \"nina\"\n");
    assert!(matches!(
        CameraConfig::load_from(bad_personality.path()),
        Err(CameraError::Config(_))
    ));
}

#[test]
#[serial]
fn test_logging_init_is_idempotent() {
    clear_env();
    let config = TracingConfig::new(Level::WARN, OutputFormat::Compact);
    assert!(logging::init(config).is_ok());
    assert!(logging::init(config).is_ok());
    assert!(logging::init_from_config(&CameraConfig::default()).is_ok());
}
