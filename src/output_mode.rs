//! Readout-mode and personality translation.
//!
//! Decides how sensor data is represented to a client: which capture
//! representation the transport is asked for, which sensor type is reported,
//! and whether the capture is a reduced-resolution liveview frame.
//!
//! Readout mode index 0 is always the full-resolution capture. Index 1 exists
//! only when the sensor has liveview and the session enables it, and selects
//! the preview capture.
//!
//! The [`Personality::LegacyMonochromeClient`] profile is a compatibility shim
//! for one client integration: it never receives debayered data and always
//! sees a monochrome sensor, whichever readout mode is selected.

use crate::error::{AppResult, CameraError};
use crate::sensor::SensorDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of the full-resolution readout mode.
pub const FULL_RESOLUTION_MODE: usize = 0;

/// Index of the liveview readout mode, when present.
pub const PREVIEW_MODE: usize = 1;

/// Integration profile selected at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Personality {
    /// Report the sensor as it is
    #[default]
    Default,
    /// Client that only understands single-plane monochrome frames
    LegacyMonochromeClient,
}

/// Underlying capture representation requested from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Single-plane bayer mosaic straight off the sensor
    RawBayer,
    /// Three-plane colour image demosaiced by the device
    #[default]
    DebayeredColor,
}

/// Sensor type reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorTypeReport {
    /// Full colour, one plane per channel
    Color,
    /// Single plane carrying a bayer colour filter mosaic
    BayerMosaic,
    /// Single plane, no colour information
    Monochrome,
}

impl fmt::Display for SensorTypeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SensorTypeReport::Color => "color",
            SensorTypeReport::BayerMosaic => "bayer_mosaic",
            SensorTypeReport::Monochrome => "monochrome",
        };
        write!(f, "{}", label)
    }
}

/// Named capture configuration exposed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadoutMode {
    /// Position in the readout mode list
    pub index: usize,
    /// Human-readable label
    pub name: String,
    /// Frame width produced by this mode
    pub width: u32,
    /// Frame height produced by this mode
    pub height: u32,
    /// True for the reduced-resolution liveview capture
    pub preview: bool,
}

/// Outcome of resolving a readout mode under a personality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeResolution {
    /// Representation to request from the transport
    pub output_mode: OutputMode,
    /// Sensor type to report to the caller
    pub sensor_type: SensorTypeReport,
    /// Whether the capture is a liveview preview
    pub preview: bool,
    /// Width of frames captured in this mode
    pub width: u32,
    /// Height of frames captured in this mode
    pub height: u32,
}

/// Maps readout mode indices to capture representations for one personality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputModePolicy {
    personality: Personality,
    preferred_output: OutputMode,
    use_liveview: bool,
}

impl OutputModePolicy {
    /// Create a policy.
    ///
    /// `preferred_output` is the representation used when the personality does
    /// not force one; `use_liveview` hides the preview mode when false.
    pub fn new(personality: Personality, preferred_output: OutputMode, use_liveview: bool) -> Self {
        Self {
            personality,
            preferred_output,
            use_liveview,
        }
    }

    /// Personality this policy applies.
    pub fn personality(&self) -> Personality {
        self.personality
    }

    /// Legacy clients select preview through readout modes only.
    pub fn can_fast_readout(&self) -> bool {
        self.personality != Personality::LegacyMonochromeClient
    }

    /// Readout mode index that enabling or disabling fast readout selects.
    ///
    /// Fast readout is the liveview capture, so enabling it selects the
    /// preview mode when one exists and falls back to full resolution
    /// otherwise.
    ///
    /// # Errors
    /// `InvalidParameter` when the personality does not offer fast readout.
    pub fn fast_readout_mode(&self, enabled: bool, descriptor: &SensorDescriptor) -> AppResult<usize> {
        if !self.can_fast_readout() {
            return Err(CameraError::InvalidParameter(format!(
                "fast readout is not available to the {:?} personality",
                self.personality
            )));
        }
        let has_preview = self.preview_geometry(descriptor).is_some();
        Ok(if enabled && has_preview {
            PREVIEW_MODE
        } else {
            FULL_RESOLUTION_MODE
        })
    }

    /// Ordered list of readout modes for `descriptor`.
    pub fn readout_modes(&self, descriptor: &SensorDescriptor) -> Vec<ReadoutMode> {
        let mut modes = vec![ReadoutMode {
            index: FULL_RESOLUTION_MODE,
            name: format!(
                "Full Resolution ({} x {})",
                descriptor.width, descriptor.height
            ),
            width: descriptor.width,
            height: descriptor.height,
            preview: false,
        }];

        if let Some(preview) = self.preview_geometry(descriptor) {
            let suffix = match self.personality {
                Personality::LegacyMonochromeClient => " [Mono]",
                Personality::Default => "",
            };
            modes.push(ReadoutMode {
                index: PREVIEW_MODE,
                name: format!(
                    "LiveView ({} x {}){}",
                    preview.width, preview.height, suffix
                ),
                width: preview.width,
                height: preview.height,
                preview: true,
            });
        }

        modes
    }

    /// Resolve `index` to the capture representation and reported sensor type.
    ///
    /// # Errors
    /// `InvalidParameter` if `index` is not a readout mode of `descriptor`.
    pub fn resolve(&self, index: usize, descriptor: &SensorDescriptor) -> AppResult<ModeResolution> {
        let (preview, width, height) = match index {
            FULL_RESOLUTION_MODE => (false, descriptor.width, descriptor.height),
            PREVIEW_MODE => match self.preview_geometry(descriptor) {
                Some(geometry) => (true, geometry.width, geometry.height),
                None => return Err(Self::out_of_range(index, 1)),
            },
            _ => {
                let count = self.readout_modes(descriptor).len();
                return Err(Self::out_of_range(index, count));
            }
        };

        let (output_mode, sensor_type) = match self.personality {
            Personality::LegacyMonochromeClient => {
                (OutputMode::RawBayer, SensorTypeReport::Monochrome)
            }
            Personality::Default => match self.preferred_output {
                OutputMode::DebayeredColor => {
                    (OutputMode::DebayeredColor, SensorTypeReport::Color)
                }
                OutputMode::RawBayer => (OutputMode::RawBayer, SensorTypeReport::BayerMosaic),
            },
        };

        Ok(ModeResolution {
            output_mode,
            sensor_type,
            preview,
            width,
            height,
        })
    }

    fn preview_geometry(
        &self,
        descriptor: &SensorDescriptor,
    ) -> Option<crate::sensor::PreviewGeometry> {
        if self.use_liveview {
            descriptor.liveview_geometry()
        } else {
            None
        }
    }

    fn out_of_range(index: usize, count: usize) -> CameraError {
        CameraError::InvalidParameter(format!(
            "readout mode {index} not in allowable values (0..{count})"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{ExposureBounds, PreviewGeometry};

    fn descriptor(liveview: bool) -> SensorDescriptor {
        SensorDescriptor {
            sensor_name: "IMX410".to_string(),
            width: 6024,
            height: 4024,
            preview: Some(PreviewGeometry {
                width: 1024,
                height: 680,
            }),
            pixel_size_x_um: 5.9,
            pixel_size_y_um: 5.9,
            bayer_offset_x: 0,
            bayer_offset_y: 0,
            exposure: ExposureBounds::new(0.001, 30.0, 0.001),
            liveview,
        }
    }

    #[test]
    fn test_default_personality_reports_color() {
        let policy = OutputModePolicy::new(Personality::Default, OutputMode::DebayeredColor, true);
        let resolved = policy.resolve(0, &descriptor(true)).unwrap();
        assert_eq!(resolved.output_mode, OutputMode::DebayeredColor);
        assert_eq!(resolved.sensor_type, SensorTypeReport::Color);
        assert!(!resolved.preview);
        assert_eq!((resolved.width, resolved.height), (6024, 4024));
    }

    #[test]
    fn test_default_personality_raw_reports_bayer() {
        let policy = OutputModePolicy::new(Personality::Default, OutputMode::RawBayer, true);
        let resolved = policy.resolve(0, &descriptor(true)).unwrap();
        assert_eq!(resolved.output_mode, OutputMode::RawBayer);
        assert_eq!(resolved.sensor_type, SensorTypeReport::BayerMosaic);
    }

    #[test]
    fn test_legacy_personality_coerces_every_mode() {
        let policy = OutputModePolicy::new(
            Personality::LegacyMonochromeClient,
            OutputMode::DebayeredColor,
            true,
        );
        for index in 0..2 {
            let resolved = policy.resolve(index, &descriptor(true)).unwrap();
            assert_eq!(resolved.output_mode, OutputMode::RawBayer);
            assert_eq!(resolved.sensor_type, SensorTypeReport::Monochrome);
        }
        assert!(!policy.can_fast_readout());
    }

    #[test]
    fn test_preview_mode_uses_preview_geometry() {
        let policy = OutputModePolicy::new(Personality::Default, OutputMode::DebayeredColor, true);
        let resolved = policy.resolve(1, &descriptor(true)).unwrap();
        assert!(resolved.preview);
        assert_eq!((resolved.width, resolved.height), (1024, 680));
    }

    #[test]
    fn test_preview_mode_rejected_without_liveview() {
        let policy = OutputModePolicy::new(Personality::Default, OutputMode::DebayeredColor, true);
        let err = policy.resolve(1, &descriptor(false)).unwrap_err();
        assert!(matches!(err, CameraError::InvalidParameter(_)));

        let disabled = OutputModePolicy::new(Personality::Default, OutputMode::DebayeredColor, false);
        assert!(disabled.resolve(1, &descriptor(true)).is_err());
        assert_eq!(disabled.readout_modes(&descriptor(true)).len(), 1);
    }

    #[test]
    fn test_fast_readout_mode_selection() {
        let policy = OutputModePolicy::new(Personality::Default, OutputMode::DebayeredColor, true);
        assert_eq!(policy.fast_readout_mode(true, &descriptor(true)).unwrap(), PREVIEW_MODE);
        assert_eq!(
            policy.fast_readout_mode(false, &descriptor(true)).unwrap(),
            FULL_RESOLUTION_MODE
        );
        // No liveview on the sensor: enabling is accepted but stays at full resolution
        assert_eq!(
            policy.fast_readout_mode(true, &descriptor(false)).unwrap(),
            FULL_RESOLUTION_MODE
        );

        let legacy = OutputModePolicy::new(
            Personality::LegacyMonochromeClient,
            OutputMode::RawBayer,
            true,
        );
        assert!(matches!(
            legacy.fast_readout_mode(true, &descriptor(true)),
            Err(CameraError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_out_of_range_index() {
        let policy = OutputModePolicy::new(Personality::Default, OutputMode::DebayeredColor, true);
        assert!(matches!(
            policy.resolve(2, &descriptor(true)),
            Err(CameraError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_readout_mode_names() {
        let default = OutputModePolicy::new(Personality::Default, OutputMode::DebayeredColor, true);
        let names: Vec<String> = default
            .readout_modes(&descriptor(true))
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "Full Resolution (6024 x 4024)".to_string(),
                "LiveView (1024 x 680)".to_string()
            ]
        );

        let legacy = OutputModePolicy::new(
            Personality::LegacyMonochromeClient,
            OutputMode::DebayeredColor,
            true,
        );
        let modes = legacy.readout_modes(&descriptor(true));
        assert_eq!(modes[1].name, "LiveView (1024 x 680) [Mono]");
    }
}
