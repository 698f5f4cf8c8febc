//! Custom error types for the camera core.
//!
//! This module defines `CameraError`, the single error type returned by every
//! session, windowing and configuration operation. Using the `thiserror` crate,
//! it keeps the failure taxonomy explicit so callers can match on the kind of
//! failure instead of parsing messages.
//!
//! ## Error Hierarchy
//!
//! - **State preconditions**: `NotConnected`, `OperationInProgress`, `ImageNotReady`.
//!   Detected synchronously before any transport call is made.
//! - **Parameter errors**: `InvalidParameter` (exposure duration, readout mode index)
//!   and `InvalidFrameRequest` (sub-frame geometry outside the buffer).
//! - **Device errors**: `DeviceNotFound` (connect target not enumerated) and
//!   `DeviceError` (fault reported by the transport collaborator).
//! - **Configuration**: `Config` wraps figment extraction failures, `Configuration`
//!   carries semantic validation failures.
//!
//! Transport traits return `anyhow::Result`; the session converts those into
//! `DeviceError` with [`CameraError::device`].

use crate::sensor::Rect;
use thiserror::Error;

/// Convenience alias for results using the camera error type.
pub type AppResult<T> = std::result::Result<T, CameraError>;

/// Primary error type for the camera core.
#[derive(Error, Debug)]
pub enum CameraError {
    /// The operation needs an active session but the camera is disconnected.
    #[error("Camera is not connected")]
    NotConnected,

    /// No enumerated device matches the requested id or display name.
    #[error("Device '{0}' not found")]
    DeviceNotFound(String),

    /// A scalar argument is outside its declared bounds.
    ///
    /// Covers exposure durations (negative, NaN, or outside the sensor's
    /// `[min, max]`) and readout mode indices past the end of the mode list.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A sub-frame does not fit inside the buffer it is applied to.
    #[error(
        "Invalid frame request: {}x{} at ({}, {}) does not fit in {buffer_width}x{buffer_height}",
        .rect.width, .rect.height, .rect.x, .rect.y
    )]
    InvalidFrameRequest {
        /// The rejected sub-frame.
        rect: Rect,
        /// Width of the buffer the sub-frame was checked against.
        buffer_width: u32,
        /// Height of the buffer the sub-frame was checked against.
        buffer_height: u32,
    },

    /// A capture is already running (or being aborted) on this session.
    #[error("An exposure is already in progress")]
    OperationInProgress,

    /// A frame read was attempted before any exposure completed.
    #[error("No image is ready; take an exposure first")]
    ImageNotReady,

    /// The transport collaborator reported a hardware or protocol fault.
    #[error("Device error: {0}")]
    DeviceError(String),

    /// Calculating a buffer size overflowed `usize`.
    #[error("Size overflow while computing {context}")]
    SizeOverflow {
        /// What was being computed.
        context: &'static str,
    },

    /// Configuration file parsing or extraction failed.
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// Configuration values parsed but failed semantic validation.
    #[error("Configuration validation error: {0}")]
    Configuration(String),
}

impl CameraError {
    /// Wrap a transport failure as a `DeviceError`, keeping the full cause chain.
    pub fn device(err: &anyhow::Error) -> Self {
        CameraError::DeviceError(format!("{err:#}"))
    }

    /// Build an `InvalidFrameRequest` for `rect` against a `width` x `height` buffer.
    pub fn frame_request(rect: Rect, width: u32, height: u32) -> Self {
        CameraError::InvalidFrameRequest {
            rect,
            buffer_width: width,
            buffer_height: height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CameraError::DeviceNotFound("ILCE-7M3".to_string());
        assert_eq!(err.to_string(), "Device 'ILCE-7M3' not found");
    }

    #[test]
    fn test_frame_request_display() {
        let err = CameraError::frame_request(Rect::new(900, 0, 500, 200), 1000, 800);
        assert_eq!(
            err.to_string(),
            "Invalid frame request: 500x200 at (900, 0) does not fit in 1000x800"
        );
    }

    #[test]
    fn test_device_error_keeps_context() {
        let cause = anyhow::anyhow!("usb stall").context("trigger failed");
        let err = CameraError::device(&cause);
        assert_eq!(err.to_string(), "Device error: trigger failed: usb stall");
    }
}
