use serde::{Deserialize, Serialize};

use crate::error::{GratexError, GratexResult};
use crate::pixel::PixelFormat;

/// Carrier wave shape of a grating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
}

/// Spatial modulation applied over the carrier. Exactly one variant is active;
/// the legacy scheme of zero-valued mask/envelope fields meaning "disabled"
/// maps onto `FullField`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Modulation {
    #[default]
    FullField,
    CircularMask {
        /// Mask diameter as a percentage of screen width.
        diameter_pct: f64,
        #[serde(default = "default_center")]
        center_left_pct: f64,
        #[serde(default = "default_center")]
        center_top_pct: f64,
        /// Edge fade band width as a percentage of screen width. 0 = hard edge.
        #[serde(default)]
        fade_pct: f64,
    },
    Gabor {
        /// Gaussian envelope sigma as a percentage of screen width.
        sigma_pct: f64,
        #[serde(default = "default_center")]
        center_left_pct: f64,
        #[serde(default = "default_center")]
        center_top_pct: f64,
    },
}

fn default_center() -> f64 {
    50.0
}

fn default_contrast() -> f64 {
    1.0
}

fn default_background() -> u8 {
    127
}

fn default_resolution() -> (u32, u32) {
    (1280, 720)
}

/// Immutable description of one stimulus. Optional fields carry the documented
/// defaults, so a JSON spec only needs duration, angle and the two frequencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GratingSpec {
    /// Presentation length in seconds.
    pub duration_secs: f64,
    /// Propagation angle in degrees, counter-clockwise from horizontal.
    pub angle_deg: f64,
    /// Spatial frequency in cycles per degree of visual angle.
    pub spatial_freq: f64,
    /// Temporal frequency in cycles per second.
    pub temporal_freq: f64,
    #[serde(default = "default_contrast")]
    pub contrast: f64,
    #[serde(default = "default_background")]
    pub background: u8,
    #[serde(default = "default_resolution")]
    pub resolution: (u32, u32),
    #[serde(default)]
    pub waveform: Waveform,
    #[serde(default)]
    pub modulation: Modulation,
    #[serde(default)]
    pub pixel_format: PixelFormat,
}

impl GratingSpec {
    /// Rejects out-of-range parameters before any file or device I/O happens.
    pub fn validate(&self) -> GratexResult<()> {
        for (name, value) in [
            ("duration", self.duration_secs),
            ("angle", self.angle_deg),
            ("spatial frequency", self.spatial_freq),
            ("temporal frequency", self.temporal_freq),
            ("contrast", self.contrast),
        ] {
            if !value.is_finite() {
                return Err(GratexError::validation(format!("{name} must be finite")));
            }
        }
        if self.duration_secs <= 0.0 {
            return Err(GratexError::validation(format!(
                "duration must be positive, got {}",
                self.duration_secs
            )));
        }
        if self.spatial_freq <= 0.0 {
            return Err(GratexError::validation(format!(
                "spatial frequency must be positive, got {}",
                self.spatial_freq
            )));
        }
        if self.temporal_freq < 0.0 {
            return Err(GratexError::validation(format!(
                "temporal frequency must not be negative, got {}",
                self.temporal_freq
            )));
        }
        if !(0.0..=1.0).contains(&self.contrast) {
            return Err(GratexError::validation(format!(
                "contrast must lie in [0, 1], got {}",
                self.contrast
            )));
        }
        let (width, height) = self.resolution;
        if width == 0 || height == 0 {
            return Err(GratexError::validation(format!(
                "resolution must be positive, got {width}x{height}"
            )));
        }
        match self.modulation {
            Modulation::FullField => {}
            Modulation::CircularMask {
                diameter_pct,
                fade_pct,
                ..
            } => {
                if !(diameter_pct > 0.0) {
                    return Err(GratexError::validation(format!(
                        "mask diameter must be positive, got {diameter_pct}%"
                    )));
                }
                if !(fade_pct >= 0.0) {
                    return Err(GratexError::validation(format!(
                        "mask fade width must not be negative, got {fade_pct}%"
                    )));
                }
            }
            Modulation::Gabor { sigma_pct, .. } => {
                if !(sigma_pct > 0.0) {
                    return Err(GratexError::validation(format!(
                        "envelope sigma must be positive, got {sigma_pct}%"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// One swept parameter for batch encoding: a family of specs differing in a
/// single field, one output file per value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepAxis {
    Angles(Vec<f64>),
    SpatialFreqs(Vec<f64>),
    TemporalFreqs(Vec<f64>),
    Contrasts(Vec<f64>),
}

impl SweepAxis {
    /// Expands the base spec along this axis. Each entry is named after the
    /// swept value, which becomes the output file name.
    pub fn expand(&self, base: &GratingSpec) -> Vec<(String, GratingSpec)> {
        let apply = |values: &[f64], set: fn(&mut GratingSpec, f64)| {
            values
                .iter()
                .map(|&value| {
                    let mut spec = base.clone();
                    set(&mut spec, value);
                    (format!("{value}"), spec)
                })
                .collect::<Vec<_>>()
        };
        match self {
            SweepAxis::Angles(values) => apply(values, |spec, v| spec.angle_deg = v),
            SweepAxis::SpatialFreqs(values) => apply(values, |spec, v| spec.spatial_freq = v),
            SweepAxis::TemporalFreqs(values) => apply(values, |spec, v| spec.temporal_freq = v),
            SweepAxis::Contrasts(values) => apply(values, |spec, v| spec.contrast = v),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SweepAxis::Angles(v)
            | SweepAxis::SpatialFreqs(v)
            | SweepAxis::TemporalFreqs(v)
            | SweepAxis::Contrasts(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
