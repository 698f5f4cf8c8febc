//! Hardware Transports
//!
//! The camera link abstraction the session drives, plus a simulated
//! implementation used by the tests and the CLI.

pub mod mock;
pub mod pattern;
pub mod transport;

pub use mock::{CompletionMode, MockDevice, MockTransport};
pub use transport::{CameraTransport, CaptureEvent, CaptureSequence, CaptureTrigger, DeviceInfo};
