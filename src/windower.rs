//! Sub-frame cropping.
//!
//! Both plane ranks go through [`crop_rows`]: a 2-D plane is treated as a
//! 3-D plane with one channel, so each output row is one contiguous slice of
//! `width * channels` values taken from the matching input row.

use crate::error::AppResult;
use crate::frame::{plane_len, FrameBuffer, PixelPlanes};
use crate::sensor::Rect;
use crate::validation::validate_subframe;
use std::sync::Arc;

/// Crop `frame` to `rect`, keeping its metadata.
///
/// Requesting the full frame returns a buffer sharing the input's pixel
/// storage; otherwise the window is copied into new storage.
pub fn window(frame: &FrameBuffer, rect: Rect) -> AppResult<FrameBuffer> {
    let planes = window_planes(&frame.planes, rect)?;
    Ok(FrameBuffer::new(planes, frame.metadata.clone()))
}

/// Crop pixel planes to `rect`.
///
/// The output has exactly `rect.width` x `rect.height` pixels and the same
/// channel count as the input, or the call fails with `InvalidFrameRequest`.
/// Input whose value count disagrees with its geometry fails with `DeviceError`.
pub fn window_planes(planes: &PixelPlanes, rect: Rect) -> AppResult<PixelPlanes> {
    planes.check()?;
    let (width, height, channels) = planes.geometry();
    validate_subframe(&rect, width, height)?;

    if rect.is_full_frame(width, height) {
        return Ok(planes.clone());
    }

    let pixels = crop_rows(planes.pixels(), width, channels, rect)?;
    match planes {
        PixelPlanes::Plane2D { .. } => PixelPlanes::plane_2d(pixels, rect.width, rect.height),
        PixelPlanes::Plane3D { .. } => {
            PixelPlanes::plane_3d(pixels, rect.width, rect.height, channels)
        }
    }
}

/// Copy the rows of `rect` out of a row-major buffer with `channels` values per pixel.
///
/// `rect` must already be validated against the buffer geometry.
fn crop_rows(source: &[u16], width: u32, channels: u32, rect: Rect) -> AppResult<Arc<[u16]>> {
    let stride = width as usize * channels as usize;
    let row_len = rect.width as usize * channels as usize;
    let offset = rect.x as usize * channels as usize;

    let mut out = Vec::with_capacity(plane_len(rect.width, rect.height, channels)?);
    for row in source
        .chunks_exact(stride)
        .skip(rect.y as usize)
        .take(rect.height as usize)
    {
        out.extend_from_slice(&row[offset..offset + row_len]);
    }
    Ok(out.into())
}
