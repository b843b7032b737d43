use gratex_core::{GratingSpec, PixelFormat, Waveform};

use crate::modulation::ResolvedModulation;
use crate::wave::{DriftGeometry, Projection, carrier};

/// One stimulus resolved to pixel space, ready to paint frames. Greyscale
/// luminance is computed per pixel and quantized into the target format.
#[derive(Debug, Clone)]
pub struct FramePainter {
    width: u32,
    height: u32,
    background: f64,
    amplitude: f64,
    waveform: Waveform,
    projection: Projection,
    wavelength_px: f64,
    speed_px_per_frame: i32,
    modulation: ResolvedModulation,
    pixel_format: PixelFormat,
}

impl FramePainter {
    pub fn new(spec: &GratingSpec, geometry: DriftGeometry) -> Self {
        let (width, height) = spec.resolution;
        FramePainter {
            width,
            height,
            background: f64::from(spec.background),
            amplitude: spec.contrast * 127.0,
            waveform: spec.waveform,
            projection: Projection::from_angle(spec.angle_deg),
            wavelength_px: f64::from(geometry.wavelength_px),
            speed_px_per_frame: geometry.speed_px_per_frame,
            modulation: ResolvedModulation::resolve(spec.modulation, width, height),
            pixel_format: spec.pixel_format,
        }
    }

    /// Byte length of one painted frame.
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * self.pixel_format.bytes_per_pixel()
    }

    pub fn paint(&self, t: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.frame_len());
        self.paint_into(t, &mut out);
        out
    }

    /// Paints frame `t` into `out` (cleared first), row-major from top-left.
    pub fn paint_into(&self, t: u32, out: &mut Vec<u8>) {
        out.clear();
        out.reserve(self.frame_len());
        let drift = f64::from(self.speed_px_per_frame) * f64::from(t);
        for y in 0..self.height {
            for x in 0..self.width {
                let weight = self.modulation.weight(x, y);
                let value = if weight == 0.0 {
                    self.background
                } else {
                    let position = self.projection.x_prime(x, y) + drift;
                    let excursion = carrier(self.waveform, position, self.wavelength_px);
                    self.background + weight * self.amplitude * excursion
                };
                let level = value.clamp(0.0, 255.0) as u8;
                self.pixel_format.write_pixel(out, level, level, level);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wave::drift_geometry;
    use gratex_core::{Modulation, pack_rgb565};

    fn painter(spec: &GratingSpec) -> FramePainter {
        FramePainter::new(spec, drift_geometry(spec, 60.0).unwrap())
    }

    fn base_spec() -> GratingSpec {
        GratingSpec {
            duration_secs: 1.0,
            angle_deg: 0.0,
            spatial_freq: 0.2,
            temporal_freq: 6.0,
            contrast: 1.0,
            background: 127,
            resolution: (160, 120),
            waveform: Waveform::Square,
            modulation: Modulation::FullField,
            pixel_format: PixelFormat::Rgb888,
        }
    }

    #[test]
    fn square_wave_swings_amplitude_around_background() {
        let frame = painter(&base_spec()).paint(0);
        // Full contrast around 127: low half-cycle clamps at 0, high at 254.
        assert!(frame.iter().all(|&b| b == 0 || b == 254));
        assert!(frame.contains(&0) && frame.contains(&254));
    }

    #[test]
    fn contrast_scales_the_excursion() {
        let mut spec = base_spec();
        spec.contrast = 0.5;
        let frame = painter(&spec).paint(0);
        // 127 +/- 63.5, truncated.
        assert!(frame.iter().all(|&b| b == 63 || b == 190));
    }

    #[test]
    fn zero_temporal_freq_paints_identical_frames() {
        let mut spec = base_spec();
        spec.temporal_freq = 0.0;
        let p = painter(&spec);
        assert_eq!(p.paint(0), p.paint(7));
    }

    #[test]
    fn drift_shifts_the_pattern_between_frames() {
        let p = painter(&base_spec());
        assert_ne!(p.paint(0), p.paint(1));
    }

    #[test]
    fn hard_mask_edge_is_exact() {
        let mut spec = base_spec();
        spec.background = 90;
        spec.modulation = Modulation::CircularMask {
            diameter_pct: 25.0,
            center_left_pct: 50.0,
            center_top_pct: 50.0,
            fade_pct: 0.0,
        };
        let masked = painter(&spec).paint(0);

        let mut full = base_spec();
        full.background = 90;
        let unmasked = painter(&full).paint(0);

        let index = |x: u32, y: u32| ((y * 160 + x) * 3) as usize;
        // Radius is 20 px around (80, 60): a corner pixel is pure background,
        // the center matches the unmasked stimulus byte for byte.
        assert_eq!(masked[index(0, 0)], 90);
        assert_eq!(masked[index(159, 119)], 90);
        assert_eq!(masked[index(80, 60)], unmasked[index(80, 60)]);
        assert_eq!(masked[index(85, 60)], unmasked[index(85, 60)]);
    }

    #[test]
    fn gabor_tapers_toward_background() {
        let mut spec = base_spec();
        spec.waveform = Waveform::Sine;
        spec.modulation = Modulation::Gabor {
            sigma_pct: 5.0,
            center_left_pct: 50.0,
            center_top_pct: 50.0,
        };
        let frame = painter(&spec).paint(0);
        let index = |x: u32, y: u32| ((y * 160 + x) * 3) as usize;
        // Far corner is within a level of the background.
        let corner = i16::from(frame[index(0, 0)]);
        assert!((corner - 127).abs() <= 1);
    }

    #[test]
    fn rgb565_frames_pack_greyscale_levels() {
        let mut spec = base_spec();
        spec.pixel_format = PixelFormat::Rgb565;
        let frame = painter(&spec).paint(0);
        assert_eq!(frame.len(), 160 * 120 * 2);
        let low = pack_rgb565(0, 0, 0).to_le_bytes();
        let high = pack_rgb565(254, 254, 254).to_le_bytes();
        let first: [u8; 2] = [frame[0], frame[1]];
        assert!(first == low || first == high);
    }
}
