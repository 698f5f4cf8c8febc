//! Mock Camera Transport
//!
//! Simulated USB camera link for testing without physical hardware.
//! All delays use `tokio::time::sleep`, never `std::thread::sleep`.
//!
//! # Completion Modes
//!
//! - `Instant` - the completion is sent before `trigger_capture` returns
//! - `Realistic` - the completion is sent after the requested exposure time
//! - `Manual` - nothing is sent until the test calls [`MockTransport::deliver`]
//!
//! Cancelled captures never complete in the automatic modes. `deliver` ignores
//! cancellation so tests can force a late, stale completion.
//!
//! [`MockTransport::hold_next_cancel`] keeps the next `cancel_capture` call
//! pending until the returned [`Notify`] is signalled, which lets a test act
//! while the session is still `Aborting`.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

use crate::frame::{PixelPlanes, COLOR_CHANNELS};
use crate::hardware::pattern::{bayer_frame, rgb_frame};
use crate::hardware::transport::{
    CameraTransport, CaptureEvent, CaptureSequence, CaptureTrigger, DeviceInfo,
};
use crate::output_mode::OutputMode;
use crate::sensor::{ExposureBounds, PreviewGeometry, SensorDescriptor};

/// When a triggered capture completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionMode {
    /// Complete immediately
    #[default]
    Instant,
    /// Complete after the requested exposure duration
    Realistic,
    /// Complete only when [`MockTransport::deliver`] is called
    Manual,
}

/// A simulated attached camera.
#[derive(Debug, Clone)]
pub struct MockDevice {
    /// Identity reported by enumeration
    pub info: DeviceInfo,
    /// Geometry reported after connect
    pub descriptor: SensorDescriptor,
}

impl MockDevice {
    /// Full-frame 24MP body with liveview.
    pub fn full_frame_24mp() -> Self {
        Self {
            info: DeviceInfo {
                device_id: "usb:001:004".to_string(),
                display_name: "ILCE-7M3".to_string(),
            },
            descriptor: SensorDescriptor {
                sensor_name: "IMX410".to_string(),
                width: 6024,
                height: 4024,
                preview: Some(PreviewGeometry {
                    width: 1024,
                    height: 680,
                }),
                pixel_size_x_um: 5.94,
                pixel_size_y_um: 5.94,
                bayer_offset_x: 0,
                bayer_offset_y: 0,
                exposure: ExposureBounds::new(0.001, 30.0, 0.001),
                liveview: true,
            },
        }
    }

    /// Small sensor, handy for fast tests.
    pub fn small(device_id: &str, display_name: &str, width: u32, height: u32) -> Self {
        Self {
            info: DeviceInfo {
                device_id: device_id.to_string(),
                display_name: display_name.to_string(),
            },
            descriptor: SensorDescriptor {
                sensor_name: format!("SIM{width}x{height}"),
                width,
                height,
                preview: Some(PreviewGeometry {
                    width: (width / 4).max(1),
                    height: (height / 4).max(1),
                }),
                pixel_size_x_um: 3.76,
                pixel_size_y_um: 3.76,
                bayer_offset_x: 0,
                bayer_offset_y: 0,
                exposure: ExposureBounds::new(0.0, 60.0, 0.001),
                liveview: true,
            },
        }
    }
}

#[derive(Default)]
struct MockState {
    connected: Option<usize>,
    mode: CompletionMode,
    /// Every trigger ever accepted, in order
    triggers: Vec<CaptureTrigger>,
    /// Triggered, not yet completed or cancelled; value is the injected-failure flag
    pending: HashMap<CaptureSequence, bool>,
    cancelled: Vec<CaptureSequence>,
    fail_next_trigger: bool,
    fail_next_capture: bool,
    /// Held by the next `cancel_capture` until notified
    cancel_gate: Option<Arc<Notify>>,
}

/// Simulated camera transport.
///
/// # Example
///
/// ```rust,ignore
/// let (transport, events) = MockTransport::new(vec![MockDevice::full_frame_24mp()]);
/// transport.set_completion_mode(CompletionMode::Manual);
/// ```
pub struct MockTransport {
    devices: Vec<MockDevice>,
    state: Arc<Mutex<MockState>>,
    events: UnboundedSender<CaptureEvent>,
    capture_count: Arc<AtomicU64>,
}

impl MockTransport {
    /// Create a transport exposing `devices`, returning the completion channel.
    pub fn new(devices: Vec<MockDevice>) -> (Self, UnboundedReceiver<CaptureEvent>) {
        let (events, rx) = unbounded_channel();
        let transport = Self {
            devices,
            state: Arc::new(Mutex::new(MockState::default())),
            events,
            capture_count: Arc::new(AtomicU64::new(0)),
        };
        (transport, rx)
    }

    /// Change when future captures complete.
    pub fn set_completion_mode(&self, mode: CompletionMode) {
        self.state.lock().mode = mode;
    }

    /// Make the next `trigger_capture` call fail.
    pub fn fail_next_trigger(&self) {
        self.state.lock().fail_next_trigger = true;
    }

    /// Make the next triggered capture complete with a `Failed` event.
    pub fn fail_next_capture(&self) {
        self.state.lock().fail_next_capture = true;
    }

    /// Hold the next `cancel_capture` until the returned handle is notified.
    pub fn hold_next_cancel(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().cancel_gate = Some(Arc::clone(&gate));
        gate
    }

    /// All accepted triggers, oldest first.
    pub fn triggers(&self) -> Vec<CaptureTrigger> {
        self.state.lock().triggers.clone()
    }

    /// Sequence ids passed to `cancel_capture`.
    pub fn cancelled(&self) -> Vec<CaptureSequence> {
        self.state.lock().cancelled.clone()
    }

    /// Number of completion events sent so far.
    pub fn capture_count(&self) -> u64 {
        self.capture_count.load(Ordering::SeqCst)
    }

    /// Send the completion for `sequence` now, even if it was cancelled.
    pub fn deliver(&self, sequence: CaptureSequence) -> Result<()> {
        let (trigger, fail, descriptor) = {
            let mut state = self.state.lock();
            let trigger = state
                .triggers
                .iter()
                .find(|t| t.sequence == sequence)
                .copied()
                .ok_or_else(|| anyhow!("MockTransport: no capture {sequence} was triggered"))?;
            let fail = state.pending.remove(&sequence).unwrap_or(false);
            let descriptor = state
                .connected
                .map(|index| self.devices[index].descriptor.clone())
                .ok_or_else(|| anyhow!("MockTransport: not connected"))?;
            (trigger, fail, descriptor)
        };
        let event = build_event(&descriptor, trigger, fail)?;
        send_event(&self.events, &self.capture_count, event)
    }

    fn connected_descriptor(&self) -> Result<SensorDescriptor> {
        let state = self.state.lock();
        state
            .connected
            .map(|index| self.devices[index].descriptor.clone())
            .ok_or_else(|| anyhow!("MockTransport: not connected"))
    }
}

/// Build the completion event a capture would produce.
fn build_event(
    descriptor: &SensorDescriptor,
    trigger: CaptureTrigger,
    fail: bool,
) -> Result<CaptureEvent> {
    if fail {
        return Ok(CaptureEvent::Failed {
            sequence: trigger.sequence,
            message: "MockTransport: simulated capture failure".to_string(),
        });
    }

    let (width, height) = match descriptor.preview {
        Some(preview) if trigger.preview => (preview.width, preview.height),
        _ => (descriptor.width, descriptor.height),
    };
    let seq = trigger.sequence.0;
    let planes = match trigger.output_mode {
        OutputMode::RawBayer => PixelPlanes::plane_2d(
            bayer_frame(
                width,
                height,
                descriptor.bayer_offset_x,
                descriptor.bayer_offset_y,
                seq,
                trigger.light,
            ),
            width,
            height,
        )?,
        OutputMode::DebayeredColor => PixelPlanes::plane_3d(
            rgb_frame(width, height, seq, trigger.light),
            width,
            height,
            COLOR_CHANNELS,
        )?,
    };

    let started_at =
        Utc::now() - chrono::Duration::milliseconds((trigger.duration_s * 1000.0) as i64);
    Ok(CaptureEvent::Completed {
        sequence: trigger.sequence,
        planes,
        duration_s: trigger.duration_s,
        started_at,
    })
}

fn send_event(
    events: &UnboundedSender<CaptureEvent>,
    capture_count: &AtomicU64,
    event: CaptureEvent,
) -> Result<()> {
    let sequence = event.sequence();
    events
        .send(event)
        .map_err(|_| anyhow!("MockTransport: completion receiver dropped"))?;
    let count = capture_count.fetch_add(1, Ordering::SeqCst) + 1;
    debug!(%sequence, count, "MockTransport: completion sent");
    Ok(())
}

#[async_trait]
impl CameraTransport for MockTransport {
    async fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>> {
        Ok(self.devices.iter().map(|d| d.info.clone()).collect())
    }

    async fn connect(&self, device_id: &str) -> Result<()> {
        let index = self
            .devices
            .iter()
            .position(|d| d.info.device_id == device_id)
            .ok_or_else(|| anyhow!("MockTransport: no device '{device_id}'"))?;
        // Simulate USB session setup
        sleep(Duration::from_millis(5)).await;
        self.state.lock().connected = Some(index);
        info!(device_id, "MockTransport: connected");
        Ok(())
    }

    async fn sensor_descriptor(&self) -> Result<SensorDescriptor> {
        self.connected_descriptor()
    }

    async fn disconnect(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.connected = None;
        state.pending.clear();
        info!("MockTransport: disconnected");
        Ok(())
    }

    async fn trigger_capture(&self, trigger: CaptureTrigger) -> Result<()> {
        let (mode, fail, descriptor) = {
            let mut state = self.state.lock();
            let Some(index) = state.connected else {
                bail!("MockTransport: cannot trigger - not connected");
            };
            if std::mem::take(&mut state.fail_next_trigger) {
                bail!("MockTransport: simulated trigger failure");
            }
            let fail = std::mem::take(&mut state.fail_next_capture);
            state.triggers.push(trigger);
            state.pending.insert(trigger.sequence, fail);
            (state.mode, fail, self.devices[index].descriptor.clone())
        };
        debug!(sequence = %trigger.sequence, ?mode, "MockTransport: capture triggered");

        match mode {
            CompletionMode::Manual => Ok(()),
            CompletionMode::Instant => {
                self.state.lock().pending.remove(&trigger.sequence);
                let event = build_event(&descriptor, trigger, fail)?;
                send_event(&self.events, &self.capture_count, event)
            }
            CompletionMode::Realistic => {
                let state = Arc::clone(&self.state);
                let events = self.events.clone();
                let capture_count = Arc::clone(&self.capture_count);
                tokio::spawn(async move {
                    sleep(Duration::from_secs_f64(trigger.duration_s.max(0.0))).await;
                    // Cancelled (or disconnected) while exposing
                    if state.lock().pending.remove(&trigger.sequence).is_none() {
                        return;
                    }
                    match build_event(&descriptor, trigger, fail) {
                        Ok(event) => {
                            if let Err(err) = send_event(&events, &capture_count, event) {
                                debug!(error = %err, "MockTransport: completion dropped");
                            }
                        }
                        Err(err) => debug!(error = %err, "MockTransport: frame build failed"),
                    }
                });
                Ok(())
            }
        }
    }

    async fn cancel_capture(&self, sequence: CaptureSequence) -> Result<()> {
        let gate = self.state.lock().cancel_gate.take();
        if let Some(gate) = gate {
            debug!(%sequence, "MockTransport: cancel held");
            gate.notified().await;
        }

        let mut state = self.state.lock();
        state.pending.remove(&sequence);
        state.cancelled.push(sequence);
        debug!(%sequence, "MockTransport: capture cancelled");
        Ok(())
    }
}
