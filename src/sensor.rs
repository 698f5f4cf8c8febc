//! Sensor geometry and timing limits.
//!
//! A [`SensorDescriptor`] is supplied by the transport when a device is
//! connected. It is immutable for the lifetime of the connection and replaced
//! wholesale on reconnect.

use serde::{Deserialize, Serialize};

/// Rectangular sub-frame in sensor pixel coordinates.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rect {
    /// X-coordinate of top-left corner in pixels
    pub x: u32,
    /// Y-coordinate of top-left corner in pixels
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Rect {
    /// Create a sub-frame with origin `(x, y)` and size `width` x `height`.
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole `width` x `height` frame.
    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Calculate area in pixels
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// True if this rect covers exactly a `width` x `height` frame from the origin.
    pub fn is_full_frame(&self, width: u32, height: u32) -> bool {
        self.x == 0 && self.y == 0 && self.width == width && self.height == height
    }

    /// Check if the rect is non-empty and fits inside a `width` x `height` frame.
    ///
    /// Uses checked arithmetic so an origin near `u32::MAX` cannot wrap around.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        if self.width == 0 || self.height == 0 {
            return false;
        }
        let right = self.x.checked_add(self.width);
        let bottom = self.y.checked_add(self.height);
        matches!((right, bottom), (Some(r), Some(b)) if r <= width && b <= height)
    }
}

/// Exposure duration limits, in seconds.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExposureBounds {
    /// Shortest accepted exposure
    pub min_s: f64,
    /// Longest accepted exposure
    pub max_s: f64,
    /// Smallest step between exposure values
    pub resolution_s: f64,
}

impl ExposureBounds {
    /// Create bounds with the given min, max and step.
    pub const fn new(min_s: f64, max_s: f64, resolution_s: f64) -> Self {
        Self {
            min_s,
            max_s,
            resolution_s,
        }
    }

    /// True if `duration_s` is a finite value inside `[min_s, max_s]`.
    pub fn contains(&self, duration_s: f64) -> bool {
        duration_s.is_finite() && duration_s >= self.min_s && duration_s <= self.max_s
    }
}

/// Reduced-resolution liveview frame size.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreviewGeometry {
    /// Preview width in pixels
    pub width: u32,
    /// Preview height in pixels
    pub height: u32,
}

/// Per-device geometry and timing limits.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SensorDescriptor {
    /// Sensor model name reported by the device
    pub sensor_name: String,
    /// Full-resolution width in pixels
    pub width: u32,
    /// Full-resolution height in pixels
    pub height: u32,
    /// Preview frame size; `None` if the device has no liveview
    pub preview: Option<PreviewGeometry>,
    /// Pixel pitch along X in micrometres
    pub pixel_size_x_um: f64,
    /// Pixel pitch along Y in micrometres
    pub pixel_size_y_um: f64,
    /// Bayer phase offset along X
    pub bayer_offset_x: u8,
    /// Bayer phase offset along Y
    pub bayer_offset_y: u8,
    /// Exposure duration limits
    pub exposure: ExposureBounds,
    /// Whether the device can stream liveview frames
    pub liveview: bool,
}

impl SensorDescriptor {
    /// Full-resolution frame as a [`Rect`].
    pub fn full_frame(&self) -> Rect {
        Rect::full(self.width, self.height)
    }

    /// Preview geometry, if the device both reports liveview and a preview size.
    pub fn liveview_geometry(&self) -> Option<PreviewGeometry> {
        if self.liveview {
            self.preview
        } else {
            None
        }
    }

    /// Sanity-check a descriptor received from the transport.
    pub fn check(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!(
                "sensor '{}' reports empty geometry {}x{}",
                self.sensor_name, self.width, self.height
            ));
        }
        if let Some(preview) = self.preview {
            if preview.width == 0 || preview.height == 0 {
                return Err(format!(
                    "sensor '{}' reports empty preview geometry",
                    self.sensor_name
                ));
            }
        }
        let bounds = self.exposure;
        if !(bounds.min_s.is_finite() && bounds.max_s.is_finite())
            || bounds.min_s < 0.0
            || bounds.min_s > bounds.max_s
        {
            return Err(format!(
                "sensor '{}' reports invalid exposure bounds [{}, {}]",
                self.sensor_name, bounds.min_s, bounds.max_s
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> SensorDescriptor {
        SensorDescriptor {
            sensor_name: "IMX571".to_string(),
            width: 6024,
            height: 4024,
            preview: Some(PreviewGeometry {
                width: 1024,
                height: 680,
            }),
            pixel_size_x_um: 3.76,
            pixel_size_y_um: 3.76,
            bayer_offset_x: 0,
            bayer_offset_y: 0,
            exposure: ExposureBounds::new(0.001, 30.0, 0.001),
            liveview: true,
        }
    }

    #[test]
    fn test_rect_fits_within() {
        assert!(Rect::new(100, 100, 500, 500).fits_within(1000, 1000));
        assert!(Rect::full(1000, 800).fits_within(1000, 800));
        assert!(!Rect::new(900, 0, 500, 200).fits_within(1000, 800));
        assert!(!Rect::new(0, 700, 10, 101).fits_within(1000, 800));
        assert!(!Rect::new(0, 0, 0, 10).fits_within(1000, 800));
        assert!(!Rect::new(u32::MAX, 0, 2, 1).fits_within(u32::MAX, 1));
    }

    #[test]
    fn test_exposure_bounds() {
        let bounds = ExposureBounds::new(0.001, 30.0, 0.001);
        assert!(bounds.contains(2.5));
        assert!(bounds.contains(30.0));
        assert!(!bounds.contains(-1.0));
        assert!(!bounds.contains(0.0));
        assert!(!bounds.contains(30.5));
        assert!(!bounds.contains(f64::NAN));
    }

    #[test]
    fn test_liveview_geometry_requires_flag() {
        let mut d = descriptor();
        assert!(d.liveview_geometry().is_some());
        d.liveview = false;
        assert!(d.liveview_geometry().is_none());
    }

    #[test]
    fn test_descriptor_check() {
        assert!(descriptor().check().is_ok());

        let mut empty = descriptor();
        empty.width = 0;
        assert!(empty.check().is_err());

        let mut inverted = descriptor();
        inverted.exposure = ExposureBounds::new(10.0, 1.0, 0.1);
        assert!(inverted.check().is_err());
    }
}
