//! CLI Entry Point for mirrorless-camera
//!
//! Drives a capture session against the simulated transport:
//! - `devices` lists the attached (simulated) cameras
//! - `capture` connects, exposes, waits for the frame and prints a summary
//!
//! # Usage
//!
//! ```bash
//! mirrorless-camera devices
//! mirrorless-camera capture --duration 2.5 --roi 0,0,1024,680 --readout-mode 1
//! mirrorless-camera --json capture --duration 0.5
//! ```

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use mirrorless_camera::config::{CameraConfig, DEFAULT_CONFIG_PATH};
use mirrorless_camera::frame::FrameMetadata;
use mirrorless_camera::hardware::{CameraTransport, CompletionMode, MockDevice, MockTransport};
use mirrorless_camera::logging;
use mirrorless_camera::sensor::Rect;
use mirrorless_camera::session::{CameraSession, CameraState};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{sleep, Duration, Instant};
use tracing::info;

#[derive(Parser)]
#[command(name = "mirrorless-camera")]
#[command(about = "Capture-session control for mirrorless imaging sensors", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List attached cameras
    Devices,

    /// Take one exposure and summarise the frame
    Capture {
        /// Exposure duration in seconds
        #[arg(long, default_value = "1.0")]
        duration: f64,

        /// Sub-frame as X,Y,W,H; defaults to the full frame of the readout mode
        #[arg(long, value_parser = parse_roi)]
        roi: Option<Rect>,

        /// Readout mode index (0 = full resolution, 1 = liveview)
        #[arg(long, default_value = "0")]
        readout_mode: usize,

        /// Take a dark frame instead of a light frame
        #[arg(long)]
        dark: bool,

        /// Device id or display name; overrides the configuration
        #[arg(long)]
        device: Option<String>,
    },
}

fn parse_roi(value: &str) -> Result<Rect, String> {
    let parts: Vec<u32> = value
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid ROI '{value}': {e}"))?;
    match parts.as_slice() {
        [x, y, w, h] => Ok(Rect::new(*x, *y, *w, *h)),
        _ => Err(format!("ROI '{value}' must be X,Y,W,H")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CameraConfig::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    logging::init_from_config(&config)?;

    match cli.command {
        Commands::Devices => list_devices(cli.json).await,
        Commands::Capture {
            duration,
            roi,
            readout_mode,
            dark,
            device,
        } => {
            let request = CaptureRequest {
                duration,
                roi,
                readout_mode,
                light: !dark,
                device,
            };
            capture(&config, request, cli.json).await
        }
    }
}

struct CaptureRequest {
    duration: f64,
    roi: Option<Rect>,
    readout_mode: usize,
    light: bool,
    device: Option<String>,
}

#[derive(Serialize)]
struct CaptureSummary<'a> {
    readout: &'a str,
    width: u32,
    height: u32,
    channels: u32,
    mean: f64,
    metadata: &'a FrameMetadata,
}

async fn list_devices(json: bool) -> Result<()> {
    let (transport, _events) = MockTransport::new(vec![MockDevice::full_frame_24mp()]);
    let devices = transport.enumerate_devices().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }
    for device in devices {
        println!("{}\t{}", device.device_id, device.display_name);
    }
    Ok(())
}

async fn capture(config: &CameraConfig, request: CaptureRequest, json: bool) -> Result<()> {
    let CaptureRequest {
        duration,
        roi,
        readout_mode,
        light,
        device,
    } = request;
    let device_id = device
        .or_else(|| config.device_id.clone())
        .unwrap_or_else(|| MockDevice::full_frame_24mp().info.display_name);

    let (transport, events) = MockTransport::new(vec![MockDevice::full_frame_24mp()]);
    transport.set_completion_mode(CompletionMode::Realistic);
    let session = Arc::new(CameraSession::new(transport, &config.session));
    let listener = session.spawn_event_listener(events);

    session.connect(&device_id).await?;
    session.set_readout_mode(readout_mode)?;

    let modes = session.readout_modes()?;
    let mode = modes
        .get(readout_mode)
        .ok_or_else(|| anyhow!("readout mode {readout_mode} unavailable"))?;
    let roi = roi.unwrap_or(Rect::full(mode.width, mode.height));
    info!(mode = %mode.name, ?roi, duration, "starting capture");

    session.start_exposure(duration, light, roi).await?;

    let deadline = Instant::now() + Duration::from_secs_f64(duration + 10.0);
    while session.camera_state()? == CameraState::Exposing {
        if Instant::now() > deadline {
            session.abort_exposure().await;
            bail!("exposure did not complete in time");
        }
        sleep(Duration::from_millis(20)).await;
    }

    let frame = session.last_frame(roi)?;
    let (width, height, channels) = frame.planes.geometry();
    let pixels = frame.planes.pixels();
    let mean = if pixels.is_empty() {
        0.0
    } else {
        pixels.iter().map(|&v| f64::from(v)).sum::<f64>() / pixels.len() as f64
    };

    if json {
        let summary = CaptureSummary {
            readout: &mode.name,
            width,
            height,
            channels,
            mean,
            metadata: &frame.metadata,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("sequence:    {}", frame.metadata.sequence);
        println!("readout:     {}", mode.name);
        println!("geometry:    {width} x {height} x {channels}");
        println!("sensor type: {}", frame.metadata.sensor_type);
        println!("started at:  {}", frame.metadata.started_at);
        println!("mean value:  {mean:.1}");
    }

    session.disconnect().await;
    listener.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roi() {
        assert_eq!(parse_roi("1,2,3,4").unwrap(), Rect::new(1, 2, 3, 4));
        assert!(parse_roi("1,2,3").is_err());
        assert!(parse_roi("a,b,c,d").is_err());
    }
}
