//! Capture session controller.
//!
//! A [`CameraSession`] represents exactly one physical camera. It owns the
//! capture state machine, validates requests against the connected sensor's
//! descriptor, drives the [`CameraTransport`] and stores the frame delivered by
//! the most recent completed exposure.
//!
//! ## State Machine
//!
//! ```text
//!              connect                 start_exposure
//! Disconnected ───────▶ Idle ◀───────────────────────▶ Exposing
//!      ▲                 ▲   completion / failure          │
//!      │                 │                                 │ abort / stop
//!      │                 └──────────── Aborting ◀──────────┘
//!      └──────── disconnect (from any state)
//! ```
//!
//! ## Concurrency
//!
//! Session state lives behind a single `parking_lot::Mutex`. Every transition
//! checks the current state and applies the new one under that lock, and the
//! lock is never held across an `.await`. Transport calls happen between two
//! critical sections, so a concurrent abort, disconnect or completion may
//! change the state in between; the second critical section re-checks before
//! applying its transition.
//!
//! Each triggered capture carries a session-allocated [`CaptureSequence`].
//! Completions are accepted only when their sequence id matches the one
//! outstanding capture and the session is still `Exposing`, so a late
//! completion for an aborted, superseded or disconnected capture is dropped.
//!
//! The last frame is held as an `Arc<FrameBuffer>` and replaced by swapping
//! the `Arc`. Readers clone it under the lock and window it outside, so they
//! never observe a frame mid-replacement.

use crate::config::SessionConfig;
use crate::error::{AppResult, CameraError};
use crate::frame::{FrameBuffer, FrameMetadata};
use crate::hardware::transport::{
    CameraTransport, CaptureEvent, CaptureSequence, CaptureTrigger, DeviceInfo,
};
use crate::output_mode::{
    ModeResolution, OutputModePolicy, Personality, ReadoutMode, SensorTypeReport, PREVIEW_MODE,
};
use crate::sensor::{Rect, SensorDescriptor};
use crate::validation::{validate_exposure, validate_readout_index, validate_subframe};
use crate::windower;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Capture state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CameraState {
    /// No device link
    Disconnected,
    /// Connected, no capture running
    Idle,
    /// A capture is outstanding
    Exposing,
    /// A cancel has been sent and not yet acknowledged
    Aborting,
}

impl fmt::Display for CameraState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CameraState::Disconnected => "disconnected",
            CameraState::Idle => "idle",
            CameraState::Exposing => "exposing",
            CameraState::Aborting => "aborting",
        };
        write!(f, "{}", label)
    }
}

/// Static capability summary for the connected camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// `abort_exposure` is supported
    pub can_abort_exposure: bool,
    /// `stop_exposure` is supported
    pub can_stop_exposure: bool,
    /// Preview capture can be selected outside readout modes
    pub can_fast_readout: bool,
    /// Binning is not supported; always 1
    pub max_bin_x: u8,
    /// Binning is not supported; always 1
    pub max_bin_y: u8,
}

#[derive(Debug, Clone, Copy)]
struct Outstanding {
    sequence: CaptureSequence,
    resolution: ModeResolution,
}

#[derive(Debug)]
struct Inner {
    state: CameraState,
    descriptor: Option<SensorDescriptor>,
    device: Option<DeviceInfo>,
    outstanding: Option<Outstanding>,
    next_sequence: u64,
    last_frame: Option<Arc<FrameBuffer>>,
    pending_fault: Option<String>,
    readout_mode: usize,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: CameraState::Disconnected,
            descriptor: None,
            device: None,
            outstanding: None,
            next_sequence: 1,
            last_frame: None,
            pending_fault: None,
            readout_mode: 0,
        }
    }

    fn descriptor(&self) -> AppResult<&SensorDescriptor> {
        match (self.state, self.descriptor.as_ref()) {
            (CameraState::Disconnected, _) | (_, None) => Err(CameraError::NotConnected),
            (_, Some(descriptor)) => Ok(descriptor),
        }
    }

    fn outstanding_sequence(&self) -> Option<CaptureSequence> {
        self.outstanding.map(|o| o.sequence)
    }
}

/// Session controller for one physical camera.
///
/// Shared across tasks through `Arc`; all operations take `&self`.
pub struct CameraSession<T: CameraTransport> {
    transport: T,
    policy: OutputModePolicy,
    inner: Mutex<Inner>,
    /// Serialises connect and disconnect
    link: tokio::sync::Mutex<()>,
}

impl<T: CameraTransport> CameraSession<T> {
    /// Create a disconnected session driving `transport`.
    pub fn new(transport: T, settings: &SessionConfig) -> Self {
        Self {
            transport,
            policy: settings.policy(),
            inner: Mutex::new(Inner::new()),
            link: tokio::sync::Mutex::new(()),
        }
    }

    /// The transport this session drives.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Personality selected at construction.
    pub fn personality(&self) -> Personality {
        self.policy.personality()
    }

    /// Connect to the device whose id or display name equals `device_id`.
    ///
    /// Connecting again to the device already in use is a no-op.
    ///
    /// # Errors
    /// - `DeviceNotFound` if no enumerated device matches
    /// - `DeviceError` if the transport fails or reports an unusable descriptor
    /// - `OperationInProgress` if connected to a different device; disconnect first
    pub async fn connect(&self, device_id: &str) -> AppResult<()> {
        let _link = self.link.lock().await;

        {
            let inner = self.inner.lock();
            if inner.state != CameraState::Disconnected {
                let current = inner.device.as_ref();
                let same_device =
                    current.is_some_and(|d| d.device_id == device_id || d.display_name == device_id);
                if same_device {
                    debug!(device_id, "already connected");
                    return Ok(());
                }
                warn!(
                    device_id,
                    connected = ?current.map(|d| d.device_id.as_str()),
                    "connect rejected, session is bound to another device"
                );
                return Err(CameraError::OperationInProgress);
            }
        }

        let devices = self
            .transport
            .enumerate_devices()
            .await
            .map_err(|e| CameraError::device(&e))?;
        let device = devices
            .into_iter()
            .find(|d| d.device_id == device_id || d.display_name == device_id)
            .ok_or_else(|| {
                warn!(device_id, "no matching device enumerated");
                CameraError::DeviceNotFound(device_id.to_string())
            })?;

        self.transport
            .connect(&device.device_id)
            .await
            .map_err(|e| CameraError::device(&e))?;

        let descriptor = match self.transport.sensor_descriptor().await {
            Ok(descriptor) => descriptor,
            Err(err) => {
                self.close_link().await;
                return Err(CameraError::device(&err));
            }
        };
        if let Err(reason) = descriptor.check() {
            self.close_link().await;
            return Err(CameraError::DeviceError(reason));
        }

        info!(
            device_id = %device.device_id,
            display_name = %device.display_name,
            sensor = %descriptor.sensor_name,
            width = descriptor.width,
            height = descriptor.height,
            "camera connected"
        );

        let mut inner = self.inner.lock();
        let next_sequence = inner.next_sequence;
        *inner = Inner {
            state: CameraState::Idle,
            descriptor: Some(descriptor),
            device: Some(device),
            next_sequence,
            ..Inner::new()
        };
        Ok(())
    }

    /// Disconnect from the camera, cancelling any outstanding capture.
    ///
    /// Valid from any state. Transport failures are logged, not returned.
    pub async fn disconnect(&self) {
        let _link = self.link.lock().await;

        let outstanding = {
            let mut inner = self.inner.lock();
            if inner.state == CameraState::Disconnected {
                return;
            }
            let outstanding = inner.outstanding_sequence();
            let next_sequence = inner.next_sequence;
            *inner = Inner {
                next_sequence,
                ..Inner::new()
            };
            outstanding
        };

        if let Some(sequence) = outstanding {
            if let Err(err) = self.transport.cancel_capture(sequence).await {
                warn!(%sequence, error = %err, "cancel during disconnect failed");
            }
        }
        self.close_link().await;
        info!("camera disconnected");
    }

    async fn close_link(&self) {
        if let Err(err) = self.transport.disconnect().await {
            warn!(error = %err, "transport disconnect failed");
        }
    }

    /// Start an exposure of `duration_s` seconds over `subframe`.
    ///
    /// Returns once the capture is submitted; the frame arrives later through
    /// [`on_capture_event`](Self::on_capture_event). Starting an exposure
    /// discards the previous frame.
    ///
    /// # Errors
    /// - `NotConnected` when disconnected
    /// - `OperationInProgress` while exposing or aborting; the running capture is untouched
    /// - `InvalidParameter` for a duration outside the sensor's bounds
    /// - `InvalidFrameRequest` for a sub-frame outside the active readout mode's frame
    /// - `DeviceError` if the transport rejects the trigger; the session returns to `Idle`
    /// - `DeviceError` if an earlier fault has not been reported yet; nothing is
    ///   started and the fault is cleared, so the next call proceeds
    pub async fn start_exposure(&self, duration_s: f64, light: bool, subframe: Rect) -> AppResult<()> {
        let trigger = {
            let mut inner = self.inner.lock();
            match inner.state {
                CameraState::Disconnected => return Err(CameraError::NotConnected),
                CameraState::Exposing | CameraState::Aborting => {
                    debug!(state = %inner.state, "exposure rejected, capture running");
                    return Err(CameraError::OperationInProgress);
                }
                CameraState::Idle => {}
            }
            if let Some(message) = inner.pending_fault.take() {
                debug!(fault = %message, "exposure rejected, unreported fault");
                return Err(CameraError::DeviceError(message));
            }

            let descriptor = inner.descriptor()?;
            validate_exposure(duration_s, &descriptor.exposure)?;
            let resolution = self.policy.resolve(inner.readout_mode, descriptor)?;
            validate_subframe(&subframe, resolution.width, resolution.height)?;

            let sequence = CaptureSequence(inner.next_sequence);
            inner.next_sequence += 1;
            inner.outstanding = Some(Outstanding {
                sequence,
                resolution,
            });
            inner.state = CameraState::Exposing;
            inner.last_frame = None;

            CaptureTrigger {
                sequence,
                duration_s,
                output_mode: resolution.output_mode,
                preview: resolution.preview,
                light,
            }
        };

        info!(
            sequence = %trigger.sequence,
            duration_s,
            light,
            output_mode = ?trigger.output_mode,
            preview = trigger.preview,
            "exposure started"
        );

        if let Err(err) = self.transport.trigger_capture(trigger).await {
            let mut inner = self.inner.lock();
            if inner.state == CameraState::Exposing
                && inner.outstanding_sequence() == Some(trigger.sequence)
            {
                inner.outstanding = None;
                inner.state = CameraState::Idle;
            }
            warn!(sequence = %trigger.sequence, error = %err, "trigger failed");
            return Err(CameraError::device(&err));
        }
        Ok(())
    }

    /// Abort the running exposure without producing a frame.
    ///
    /// A no-op unless the session is `Exposing`. A failed cancel is reported
    /// as `DeviceError` on the next state query or frame read.
    pub async fn abort_exposure(&self) {
        let sequence = {
            let mut inner = self.inner.lock();
            if inner.state != CameraState::Exposing {
                debug!(state = %inner.state, "abort ignored, no exposure running");
                return;
            }
            let Some(outstanding) = inner.outstanding.take() else {
                inner.state = CameraState::Idle;
                return;
            };
            inner.state = CameraState::Aborting;
            outstanding.sequence
        };

        let result = self.transport.cancel_capture(sequence).await;

        let mut inner = self.inner.lock();
        if let Err(err) = result {
            warn!(%sequence, error = %err, "cancel failed");
            inner.pending_fault = Some(format!("{err:#}"));
        }
        if inner.state == CameraState::Aborting {
            inner.state = CameraState::Idle;
        }
        info!(%sequence, "exposure aborted");
    }

    /// Stop the running exposure. Same semantics as [`abort_exposure`](Self::abort_exposure).
    pub async fn stop_exposure(&self) {
        self.abort_exposure().await;
    }

    /// Apply a completion message from the transport.
    ///
    /// Returns `true` if the event produced the session's new last frame.
    pub fn on_capture_event(&self, event: CaptureEvent) -> bool {
        let sequence = event.sequence();
        let mut inner = self.inner.lock();

        let outstanding = match inner.outstanding {
            Some(o) if o.sequence == sequence && inner.state == CameraState::Exposing => o,
            _ => {
                debug!(
                    %sequence,
                    outstanding = ?inner.outstanding_sequence(),
                    state = %inner.state,
                    "stale completion discarded"
                );
                return false;
            }
        };
        inner.outstanding = None;
        inner.state = CameraState::Idle;

        match event {
            CaptureEvent::Completed {
                planes,
                duration_s,
                started_at,
                ..
            } => {
                let resolution = outstanding.resolution;
                if let Err(err) = planes.check() {
                    let message = format!("capture {sequence} delivered a malformed frame: {err}");
                    warn!(%sequence, "{message}");
                    inner.pending_fault = Some(message);
                    return false;
                }
                if !planes.matches_output_mode(resolution.output_mode) {
                    let message = format!(
                        "capture {sequence} delivered a rank-{} frame for {:?}",
                        planes.rank(),
                        resolution.output_mode
                    );
                    warn!(%sequence, "{message}");
                    inner.pending_fault = Some(message);
                    return false;
                }
                if (planes.width(), planes.height()) != (resolution.width, resolution.height) {
                    let message = format!(
                        "capture {sequence} delivered {}x{}, expected {}x{}",
                        planes.width(),
                        planes.height(),
                        resolution.width,
                        resolution.height
                    );
                    warn!(%sequence, "{message}");
                    inner.pending_fault = Some(message);
                    return false;
                }

                let metadata = FrameMetadata {
                    sequence: sequence.0,
                    duration_s,
                    started_at,
                    output_mode: resolution.output_mode,
                    sensor_type: resolution.sensor_type,
                    preview: resolution.preview,
                };
                inner.last_frame = Some(Arc::new(FrameBuffer::new(planes, metadata)));
                info!(%sequence, "exposure complete");
                true
            }
            CaptureEvent::Failed { message, .. } => {
                warn!(%sequence, reason = %message, "capture failed");
                inner.pending_fault = Some(message);
                false
            }
        }
    }

    /// Current state without consuming a pending fault.
    pub fn state(&self) -> CameraState {
        self.inner.lock().state
    }

    /// Current state.
    ///
    /// # Errors
    /// `DeviceError` once for each transport fault recorded since the last query.
    pub fn camera_state(&self) -> AppResult<CameraState> {
        let mut inner = self.inner.lock();
        if let Some(message) = inner.pending_fault.take() {
            return Err(CameraError::DeviceError(message));
        }
        Ok(inner.state)
    }

    /// True when the most recent exposure completed and produced a frame.
    pub fn is_image_ready(&self) -> bool {
        let inner = self.inner.lock();
        inner.state != CameraState::Disconnected && inner.last_frame.is_some()
    }

    /// The last frame, windowed to `subframe`.
    ///
    /// # Errors
    /// - `NotConnected` when disconnected
    /// - `DeviceError` if a transport fault is pending
    /// - `ImageNotReady` before any exposure completed
    /// - `InvalidFrameRequest` if `subframe` does not fit the frame
    pub fn last_frame(&self, subframe: Rect) -> AppResult<FrameBuffer> {
        let frame = {
            let mut inner = self.inner.lock();
            if inner.state == CameraState::Disconnected {
                return Err(CameraError::NotConnected);
            }
            if let Some(message) = inner.pending_fault.take() {
                return Err(CameraError::DeviceError(message));
            }
            inner.last_frame.clone().ok_or(CameraError::ImageNotReady)?
        };
        windower::window(&frame, subframe)
    }

    /// Duration of the exposure that produced the last frame.
    pub fn last_exposure_duration(&self) -> AppResult<f64> {
        self.last_metadata().map(|m| m.duration_s)
    }

    /// Start time of the exposure that produced the last frame.
    pub fn last_exposure_start_time(&self) -> AppResult<DateTime<Utc>> {
        self.last_metadata().map(|m| m.started_at)
    }

    fn last_metadata(&self) -> AppResult<FrameMetadata> {
        let inner = self.inner.lock();
        if inner.state == CameraState::Disconnected {
            return Err(CameraError::NotConnected);
        }
        inner
            .last_frame
            .as_ref()
            .map(|frame| frame.metadata.clone())
            .ok_or(CameraError::ImageNotReady)
    }

    /// Descriptor of the connected sensor.
    pub fn sensor_descriptor(&self) -> AppResult<SensorDescriptor> {
        self.inner.lock().descriptor().cloned()
    }

    /// Device the session is connected to.
    pub fn device(&self) -> Option<DeviceInfo> {
        self.inner.lock().device.clone()
    }

    /// Readout modes of the connected sensor, full resolution first.
    pub fn readout_modes(&self) -> AppResult<Vec<ReadoutMode>> {
        let inner = self.inner.lock();
        Ok(self.policy.readout_modes(inner.descriptor()?))
    }

    /// Index of the readout mode used by the next exposure.
    pub fn readout_mode(&self) -> AppResult<usize> {
        let inner = self.inner.lock();
        inner.descriptor()?;
        Ok(inner.readout_mode)
    }

    /// Select the readout mode for subsequent exposures.
    ///
    /// A running exposure keeps the mode it was started with.
    pub fn set_readout_mode(&self, index: usize) -> AppResult<()> {
        let mut inner = self.inner.lock();
        let available = self.policy.readout_modes(inner.descriptor()?).len();
        validate_readout_index(index, available)?;
        inner.readout_mode = index;
        debug!(index, "readout mode selected");
        Ok(())
    }

    /// Sensor type reported for the selected readout mode.
    pub fn sensor_type(&self) -> AppResult<SensorTypeReport> {
        let inner = self.inner.lock();
        let resolution = self.policy.resolve(inner.readout_mode, inner.descriptor()?)?;
        Ok(resolution.sensor_type)
    }

    /// Whether preview capture can be selected outside readout modes.
    pub fn can_fast_readout(&self) -> bool {
        self.policy.can_fast_readout()
    }

    /// True when the next exposure uses the liveview capture.
    pub fn fast_readout(&self) -> AppResult<bool> {
        let inner = self.inner.lock();
        inner.descriptor()?;
        Ok(inner.readout_mode == PREVIEW_MODE)
    }

    /// Switch the next exposure between liveview and full-resolution capture.
    ///
    /// Enabling has no effect when liveview is unavailable or disabled in the
    /// session settings.
    ///
    /// # Errors
    /// - `NotConnected` when disconnected
    /// - `InvalidParameter` when the personality does not offer fast readout
    pub fn set_fast_readout(&self, enabled: bool) -> AppResult<()> {
        let mut inner = self.inner.lock();
        let index = self.policy.fast_readout_mode(enabled, inner.descriptor()?)?;
        inner.readout_mode = index;
        debug!(enabled, index, "fast readout set");
        Ok(())
    }

    /// Capability summary.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            can_abort_exposure: true,
            can_stop_exposure: true,
            can_fast_readout: self.policy.can_fast_readout(),
            max_bin_x: 1,
            max_bin_y: 1,
        }
    }
}

impl<T: CameraTransport + 'static> CameraSession<T> {
    /// Pump transport completions into [`on_capture_event`](Self::on_capture_event).
    ///
    /// The task ends when the channel closes or the session is dropped.
    pub fn spawn_event_listener(
        self: &Arc<Self>,
        mut events: UnboundedReceiver<CaptureEvent>,
    ) -> JoinHandle<()> {
        let session = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(session) = session.upgrade() else {
                    break;
                };
                session.on_capture_event(event);
            }
            debug!("capture event listener stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelPlanes;
    use crate::hardware::mock::{CompletionMode, MockDevice, MockTransport};
    use crate::output_mode::OutputMode;
    use tracing_test::traced_test;

    async fn connected(
        settings: SessionConfig,
    ) -> (
        CameraSession<MockTransport>,
        UnboundedReceiver<CaptureEvent>,
    ) {
        let (transport, rx) = MockTransport::new(vec![MockDevice::small("cam0", "Sim", 16, 12)]);
        transport.set_completion_mode(CompletionMode::Manual);
        let session = CameraSession::new(transport, &settings);
        session.connect("cam0").await.unwrap();
        (session, rx)
    }

    #[tokio::test]
    async fn test_connect_by_display_name() {
        let (transport, _rx) = MockTransport::new(vec![MockDevice::small("cam0", "Sim", 16, 12)]);
        let session = CameraSession::new(transport, &SessionConfig::default());
        session.connect("Sim").await.unwrap();
        assert_eq!(session.state(), CameraState::Idle);
        assert_eq!(session.device().unwrap().device_id, "cam0");
    }

    #[tokio::test]
    async fn test_unknown_device() {
        let (transport, _rx) = MockTransport::new(vec![]);
        let session = CameraSession::new(transport, &SessionConfig::default());
        assert!(matches!(
            session.connect("nope").await,
            Err(CameraError::DeviceNotFound(_))
        ));
        assert_eq!(session.state(), CameraState::Disconnected);
    }

    #[tokio::test]
    async fn test_completion_stores_frame() {
        let (session, mut rx) = connected(SessionConfig::default()).await;
        session
            .start_exposure(0.5, true, Rect::full(16, 12))
            .await
            .unwrap();
        assert_eq!(session.state(), CameraState::Exposing);
        assert!(!session.is_image_ready());

        session.transport().deliver(CaptureSequence(1)).unwrap();
        let event = rx.recv().await.unwrap();
        assert!(session.on_capture_event(event));
        assert!(session.is_image_ready());

        let frame = session.last_frame(Rect::new(2, 2, 4, 4)).unwrap();
        assert_eq!(frame.planes.geometry(), (4, 4, 3));
        assert_eq!(frame.metadata.sensor_type, SensorTypeReport::Color);
        assert_eq!(session.last_exposure_duration().unwrap(), 0.5);
    }

    #[tokio::test]
    async fn test_wrong_rank_is_device_error() {
        let (session, _rx) = connected(SessionConfig::default()).await;
        session
            .start_exposure(0.1, true, Rect::full(16, 12))
            .await
            .unwrap();

        let planes = PixelPlanes::plane_2d(vec![0u16; 16 * 12], 16, 12).unwrap();
        let accepted = session.on_capture_event(CaptureEvent::Completed {
            sequence: CaptureSequence(1),
            planes,
            duration_s: 0.1,
            started_at: Utc::now(),
        });
        assert!(!accepted);
        assert!(matches!(
            session.camera_state(),
            Err(CameraError::DeviceError(_))
        ));
        assert_eq!(session.camera_state().unwrap(), CameraState::Idle);
        assert!(!session.is_image_ready());
    }

    #[tokio::test]
    async fn test_readout_mode_selection() {
        let settings = SessionConfig {
            preferred_output: OutputMode::RawBayer,
            ..SessionConfig::default()
        };
        let (session, _rx) = connected(settings).await;
        assert_eq!(session.readout_modes().unwrap().len(), 2);
        assert_eq!(session.sensor_type().unwrap(), SensorTypeReport::BayerMosaic);

        session.set_readout_mode(1).unwrap();
        assert_eq!(session.readout_mode().unwrap(), 1);
        assert!(matches!(
            session.set_readout_mode(2),
            Err(CameraError::InvalidParameter(_))
        ));

        // Preview geometry is 4x3, so the full-resolution rect no longer fits
        assert!(matches!(
            session.start_exposure(0.1, true, Rect::full(16, 12)).await,
            Err(CameraError::InvalidFrameRequest { .. })
        ));
        session
            .start_exposure(0.1, true, Rect::full(4, 3))
            .await
            .unwrap();
        assert!(session.transport().triggers()[0].preview);
    }

    #[tokio::test]
    async fn test_queries_when_disconnected() {
        let (transport, _rx) = MockTransport::new(vec![]);
        let session = CameraSession::new(transport, &SessionConfig::default());
        assert!(matches!(
            session.sensor_descriptor(),
            Err(CameraError::NotConnected)
        ));
        assert!(matches!(
            session.last_frame(Rect::full(1, 1)),
            Err(CameraError::NotConnected)
        ));
        assert!(matches!(
            session.last_exposure_start_time(),
            Err(CameraError::NotConnected)
        ));
        session.abort_exposure().await;
        session.disconnect().await;
        assert_eq!(session.camera_state().unwrap(), CameraState::Disconnected);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_stale_completion_is_logged() {
        let (session, mut rx) = connected(SessionConfig::default()).await;
        session
            .start_exposure(0.1, true, Rect::full(16, 12))
            .await
            .unwrap();
        session.abort_exposure().await;

        session.transport().deliver(CaptureSequence(1)).unwrap();
        assert!(!session.on_capture_event(rx.recv().await.unwrap()));
        assert!(logs_contain("stale completion discarded"));
        assert!(logs_contain("exposure aborted"));
    }

    #[tokio::test]
    async fn test_capabilities_follow_personality() {
        let legacy = SessionConfig {
            personality: Personality::LegacyMonochromeClient,
            ..SessionConfig::default()
        };
        let (session, _rx) = connected(legacy).await;
        let caps = session.capabilities();
        assert!(!caps.can_fast_readout);
        assert_eq!((caps.max_bin_x, caps.max_bin_y), (1, 1));
        assert_eq!(session.sensor_type().unwrap(), SensorTypeReport::Monochrome);
    }
}
