//! Request validation shared by the session and the windower.
//!
//! Every check here runs before any transport call or pixel copy is made, so a
//! rejected request leaves no state behind.

use crate::error::{AppResult, CameraError};
use crate::sensor::{ExposureBounds, Rect};

/// Validates an exposure duration against the sensor's bounds.
///
/// # Arguments
///
/// * `duration_s` - Requested exposure in seconds.
/// * `bounds` - Limits reported by the connected sensor.
///
/// # Returns
///
/// * `Ok(())` if the duration is finite and inside `[min, max]`.
/// * `Err(CameraError::InvalidParameter)` otherwise.
pub fn validate_exposure(duration_s: f64, bounds: &ExposureBounds) -> AppResult<()> {
    if duration_s.is_nan() || duration_s < 0.0 {
        return Err(CameraError::InvalidParameter(format!(
            "exposure duration {duration_s} must be a non-negative number of seconds"
        )));
    }
    if !bounds.contains(duration_s) {
        return Err(CameraError::InvalidParameter(format!(
            "exposure duration {duration_s}s outside [{}, {}]",
            bounds.min_s, bounds.max_s
        )));
    }
    Ok(())
}

/// Validates that a sub-frame is non-empty and lies inside a buffer.
///
/// # Arguments
///
/// * `rect` - Requested sub-frame.
/// * `width`, `height` - Geometry of the buffer the sub-frame applies to.
///
/// # Returns
///
/// * `Ok(())` if the rect fits.
/// * `Err(CameraError::InvalidFrameRequest)` otherwise. No clamping is applied.
pub fn validate_subframe(rect: &Rect, width: u32, height: u32) -> AppResult<()> {
    if rect.fits_within(width, height) {
        Ok(())
    } else {
        Err(CameraError::frame_request(*rect, width, height))
    }
}

/// Validates a readout mode index against the number of available modes.
pub fn validate_readout_index(index: usize, available: usize) -> AppResult<()> {
    if index < available {
        Ok(())
    } else {
        Err(CameraError::InvalidParameter(format!(
            "readout mode {index} not in allowable values (0..{available})"
        )))
    }
}
