//! Camera transport capability
//!
//! The session never talks to USB or MTP directly. Everything it needs from
//! the physical link goes through [`CameraTransport`]:
//!
//! - device enumeration and link management (connect / disconnect)
//! - the sensor descriptor for the connected device
//! - a capture trigger and a cancel primitive
//!
//! Completed captures are not returned from `trigger_capture`. The transport
//! reports them out-of-band as [`CaptureEvent`] messages on a channel, tagged
//! with the sequence id the session handed it in [`CaptureTrigger`].
//!
//! # Contract
//! - `trigger_capture` returns once the capture is submitted, not when it ends
//! - exactly one `CaptureEvent` is sent for every triggered capture that is
//!   not cancelled before completion
//! - after `cancel_capture(seq)` returns, no event for `seq` should be sent,
//!   though the session tolerates a late one
//!
//! # Thread Safety
//! All methods take `&self`; implementations use interior mutability.

use crate::frame::PixelPlanes;
use crate::output_mode::OutputMode;
use crate::sensor::SensorDescriptor;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Monotonically increasing token identifying one triggered exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CaptureSequence(pub u64);

impl fmt::Display for CaptureSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A device visible to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Stable identifier used to connect
    pub device_id: String,
    /// Human-readable name, e.g. the camera model
    pub display_name: String,
}

/// Parameters of one capture submission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureTrigger {
    /// Session-allocated sequence id to echo in the completion
    pub sequence: CaptureSequence,
    /// Exposure duration in seconds
    pub duration_s: f64,
    /// Representation the device should deliver
    pub output_mode: OutputMode,
    /// Capture a reduced-resolution liveview frame instead of a full one
    pub preview: bool,
    /// Light frame (shutter open) or dark frame
    pub light: bool,
}

/// Out-of-band capture outcome.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// The device delivered pixel data
    Completed {
        /// Sequence id from the matching trigger
        sequence: CaptureSequence,
        /// Raw pixel planes
        planes: PixelPlanes,
        /// Actual exposure duration in seconds
        duration_s: f64,
        /// When the exposure started
        started_at: DateTime<Utc>,
    },
    /// The device abandoned the capture
    Failed {
        /// Sequence id from the matching trigger
        sequence: CaptureSequence,
        /// Transport-reported reason
        message: String,
    },
}

impl CaptureEvent {
    /// Sequence id this event belongs to.
    pub fn sequence(&self) -> CaptureSequence {
        match self {
            CaptureEvent::Completed { sequence, .. } | CaptureEvent::Failed { sequence, .. } => {
                *sequence
            }
        }
    }
}

/// Capability: physical camera link
///
/// Implemented by real USB transports and by
/// [`MockTransport`](crate::hardware::mock::MockTransport).
#[async_trait]
pub trait CameraTransport: Send + Sync {
    /// List devices currently attached.
    async fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Open the link to `device_id`.
    async fn connect(&self, device_id: &str) -> Result<()>;

    /// Geometry and timing limits of the connected device.
    ///
    /// # Returns
    /// - Ok(descriptor) once connected
    /// - Err if no device is connected
    async fn sensor_descriptor(&self) -> Result<SensorDescriptor>;

    /// Close the link. Closing an already closed link is not an error.
    async fn disconnect(&self) -> Result<()>;

    /// Submit a capture; completion is reported as a [`CaptureEvent`].
    async fn trigger_capture(&self, trigger: CaptureTrigger) -> Result<()>;

    /// Cancel the capture identified by `sequence`.
    async fn cancel_capture(&self, sequence: CaptureSequence) -> Result<()>;
}
