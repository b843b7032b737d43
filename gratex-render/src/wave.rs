use gratex_core::{DEGREES_SUBTENDED, GratexError, GratexResult, GratingSpec, Waveform};

/// Orientation resolved to a drift projection. Cardinal angles use exact
/// coordinate transpositions so they never accumulate rotation error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    NegX,
    PosY,
    PosX,
    NegY,
    Rotated { cos: f64, sin: f64 },
}

impl Projection {
    /// Angles are taken in whole degrees and wrapped into [0, 360).
    pub fn from_angle(angle_deg: f64) -> Self {
        let deg = ((angle_deg as i32) % 360 + 360) % 360;
        match deg {
            0 => Projection::NegX,
            90 => Projection::PosY,
            180 => Projection::PosX,
            270 => Projection::NegY,
            _ => {
                let theta = f64::from(180 - deg).to_radians();
                Projection::Rotated {
                    cos: theta.cos(),
                    sin: theta.sin(),
                }
            }
        }
    }

    /// Position of pixel (x, y) along the drift axis, before drift offset.
    pub fn x_prime(self, x: u32, y: u32) -> f64 {
        match self {
            Projection::NegX => -f64::from(x),
            Projection::PosY => f64::from(y),
            Projection::PosX => f64::from(x),
            Projection::NegY => -f64::from(y),
            Projection::Rotated { cos, sin } => cos * f64::from(x) + sin * f64::from(y),
        }
    }
}

/// Centered carrier excursion in [-1, 1] at a drifted position. The square
/// carrier is low over the first half-cycle and high over the second.
pub fn carrier(waveform: Waveform, x_prime: f64, wavelength_px: f64) -> f64 {
    match waveform {
        Waveform::Sine => (2.0 * std::f64::consts::PI * x_prime / wavelength_px).sin(),
        Waveform::Square => {
            let position = (x_prime / wavelength_px).rem_euclid(1.0);
            if position < 0.5 { -1.0 } else { 1.0 }
        }
    }
}

/// Pixel-space drift parameters derived from a spec and a refresh rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftGeometry {
    pub wavelength_px: u32,
    pub speed_px_per_frame: i32,
}

/// Converts cycles/degree into pixel units. Pixels-per-degree and the
/// wavelength both truncate to whole pixels; the per-frame shift rounds to the
/// nearest integer, so low resolutions or low temporal:spatial frequency
/// ratios can slow the drift or freeze it entirely.
pub fn drift_geometry(spec: &GratingSpec, refresh_hz: f64) -> GratexResult<DriftGeometry> {
    let (width, _) = spec.resolution;
    let px_per_degree = width / DEGREES_SUBTENDED;
    let wavelength_px = (f64::from(px_per_degree) / spec.spatial_freq) as u32;
    if wavelength_px == 0 {
        return Err(GratexError::validation(format!(
            "spatial frequency {} cycles/degree yields a sub-pixel wavelength at width {width}",
            spec.spatial_freq
        )));
    }
    let speed_px_per_frame =
        (f64::from(wavelength_px) * spec.temporal_freq / refresh_hz).round() as i32;
    Ok(DriftGeometry {
        wavelength_px,
        speed_px_per_frame,
    })
}

/// Number of frames a presentation of `duration_secs` occupies at the given
/// refresh rate, rounded to the nearest whole frame.
pub fn frame_count(duration_secs: f64, refresh_hz: f64) -> u32 {
    (duration_secs * refresh_hz).round() as u32
}
