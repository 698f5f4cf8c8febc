//! Frame buffers delivered by completed captures.
//!
//! Pixel data is stored row-major. A 2-D plane holds one value per pixel; a
//! 3-D plane holds `channels` interleaved values per pixel, so the value for
//! `(x, y, c)` lives at `(y * width + x) * channels + c`.
//!
//! Pixel storage is reference counted. Handing a frame to a reader, or
//! windowing it to its full extent, never copies pixel data.

use crate::error::{AppResult, CameraError};
use crate::output_mode::{OutputMode, SensorTypeReport};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Number of interleaved channels in a debayered colour frame.
pub const COLOR_CHANNELS: u32 = 3;

/// Number of values needed for a `width` x `height` x `channels` plane.
pub fn plane_len(width: u32, height: u32, channels: u32) -> AppResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .ok_or(CameraError::SizeOverflow {
            context: "frame pixel count",
        })?
        .checked_mul(channels as usize)
        .ok_or(CameraError::SizeOverflow {
            context: "frame value count",
        })
}

/// Pixel storage for one frame, either a single plane or interleaved channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelPlanes {
    /// Single plane: raw bayer mosaic or monochrome
    Plane2D {
        /// Row-major pixel values
        pixels: Arc<[u16]>,
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
    /// Interleaved colour channels
    Plane3D {
        /// Row-major pixel values, `channels` per pixel
        pixels: Arc<[u16]>,
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
        /// Values per pixel
        channels: u32,
    },
}

impl PixelPlanes {
    /// Build a single-plane buffer, checking `pixels` matches the geometry.
    pub fn plane_2d(pixels: impl Into<Arc<[u16]>>, width: u32, height: u32) -> AppResult<Self> {
        let pixels = pixels.into();
        Self::check_len(pixels.len(), width, height, 1)?;
        Ok(PixelPlanes::Plane2D {
            pixels,
            width,
            height,
        })
    }

    /// Build an interleaved multi-channel buffer, checking `pixels` matches the geometry.
    pub fn plane_3d(
        pixels: impl Into<Arc<[u16]>>,
        width: u32,
        height: u32,
        channels: u32,
    ) -> AppResult<Self> {
        if channels == 0 {
            return Err(CameraError::InvalidParameter(
                "colour frame must have at least one channel".to_string(),
            ));
        }
        let pixels = pixels.into();
        Self::check_len(pixels.len(), width, height, channels)?;
        Ok(PixelPlanes::Plane3D {
            pixels,
            width,
            height,
            channels,
        })
    }

    /// Check the value count matches the geometry.
    ///
    /// The variants can be built directly, bypassing the constructors, so
    /// anything crossing the transport boundary is re-checked with this.
    pub fn check(&self) -> AppResult<()> {
        let (width, height, channels) = self.geometry();
        if channels == 0 {
            return Err(CameraError::DeviceError(
                "colour frame has zero channels".to_string(),
            ));
        }
        Self::check_len(self.pixels().len(), width, height, channels)
    }

    fn check_len(actual: usize, width: u32, height: u32, channels: u32) -> AppResult<()> {
        let expected = plane_len(width, height, channels)?;
        if actual != expected {
            return Err(CameraError::DeviceError(format!(
                "frame of {width}x{height}x{channels} needs {expected} values, got {actual}"
            )));
        }
        Ok(())
    }

    /// `(width, height, channels)`; channels is 1 for a 2-D plane.
    pub fn geometry(&self) -> (u32, u32, u32) {
        match self {
            PixelPlanes::Plane2D { width, height, .. } => (*width, *height, 1),
            PixelPlanes::Plane3D {
                width,
                height,
                channels,
                ..
            } => (*width, *height, *channels),
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.geometry().0
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.geometry().1
    }

    /// 2 for a single plane, 3 for interleaved channels.
    pub fn rank(&self) -> usize {
        match self {
            PixelPlanes::Plane2D { .. } => 2,
            PixelPlanes::Plane3D { .. } => 3,
        }
    }

    /// Shared handle to the raw values.
    pub fn pixels(&self) -> &Arc<[u16]> {
        match self {
            PixelPlanes::Plane2D { pixels, .. } | PixelPlanes::Plane3D { pixels, .. } => pixels,
        }
    }

    /// Value at `(x, y)` in channel `c`, or `None` when out of range.
    pub fn pixel(&self, x: u32, y: u32, c: u32) -> Option<u16> {
        let (width, height, channels) = self.geometry();
        if x >= width || y >= height || c >= channels {
            return None;
        }
        let index = ((y as usize * width as usize) + x as usize) * channels as usize + c as usize;
        self.pixels().get(index).copied()
    }

    /// True if this layout is what a capture in `mode` must deliver.
    pub fn matches_output_mode(&self, mode: OutputMode) -> bool {
        match (self, mode) {
            (PixelPlanes::Plane2D { .. }, OutputMode::RawBayer) => true,
            (PixelPlanes::Plane3D { .. }, OutputMode::DebayeredColor) => true,
            _ => false,
        }
    }
}

/// Capture details recorded alongside each frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameMetadata {
    /// Session-assigned capture sequence id
    pub sequence: u64,
    /// Requested exposure duration in seconds
    pub duration_s: f64,
    /// Wall-clock time the exposure started
    pub started_at: DateTime<Utc>,
    /// Representation the frame was captured in
    pub output_mode: OutputMode,
    /// Sensor type reported for this frame
    pub sensor_type: SensorTypeReport,
    /// Whether this is a liveview preview frame
    pub preview: bool,
}

/// A completed capture: pixel data plus metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    /// Pixel storage
    pub planes: PixelPlanes,
    /// Capture details
    pub metadata: FrameMetadata,
}

impl FrameBuffer {
    /// Create a frame buffer.
    pub fn new(planes: PixelPlanes, metadata: FrameMetadata) -> Self {
        Self { planes, metadata }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.planes.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.planes.height()
    }
}
