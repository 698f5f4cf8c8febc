//! # Mirrorless Camera Core Library
//!
//! Capture-session control for a USB-attached mirrorless imaging sensor. The
//! crate manages the lifecycle of a capture session on one physical camera and
//! turns the raw sensor output into caller-requested sub-frames in a
//! caller-requested pixel layout.
//!
//! ## Crate Structure
//!
//! - **`session`**: `CameraSession`, the capture state machine (connect, expose,
//!   abort, readout). Owns the last frame and rejects stale completions.
//! - **`output_mode`**: Maps a readout mode index and a client personality to the
//!   capture representation and the reported sensor type.
//! - **`windower`**: Crops a frame to a sub-rectangle, for single-plane and
//!   interleaved colour buffers alike.
//! - **`frame`** / **`sensor`**: Pixel buffers, capture metadata, sensor geometry.
//! - **`hardware`**: The `CameraTransport` trait the session drives, and a
//!   simulated transport for tests and the CLI.
//! - **`config`** / **`logging`**: Figment configuration and tracing setup.
//! - **`error`**: The `CameraError` taxonomy shared by every operation.
//!
//! ## Example
//!
//! ```no_run
//! use mirrorless_camera::config::SessionConfig;
//! use mirrorless_camera::hardware::{MockDevice, MockTransport};
//! use mirrorless_camera::sensor::Rect;
//! use mirrorless_camera::session::CameraSession;
//! use std::sync::Arc;
//!
//! # async fn run() -> mirrorless_camera::error::AppResult<()> {
//! let (transport, events) = MockTransport::new(vec![MockDevice::full_frame_24mp()]);
//! let session = Arc::new(CameraSession::new(transport, &SessionConfig::default()));
//! session.spawn_event_listener(events);
//!
//! session.connect("ILCE-7M3").await?;
//! session.start_exposure(2.5, true, Rect::full(6024, 4024)).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod frame;
pub mod hardware;
pub mod logging;
pub mod output_mode;
pub mod sensor;
pub mod session;
pub mod validation;
pub mod windower;

pub use error::{AppResult, CameraError};
pub use frame::{FrameBuffer, FrameMetadata, PixelPlanes};
pub use output_mode::{OutputMode, Personality, SensorTypeReport};
pub use sensor::{Rect, SensorDescriptor};
pub use session::{CameraSession, CameraState};
