use gratex_core::Modulation;

/// A spatial modulation resolved against a concrete resolution, in pixel
/// units. `weight` runs per pixel, so everything derivable is precomputed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedModulation {
    Full,
    Mask {
        center_x: i32,
        center_y: i32,
        radius: i32,
        fade_px: f64,
    },
    Envelope {
        center_x: f64,
        center_y: f64,
        two_sigma_sq: f64,
    },
}

impl ResolvedModulation {
    /// Percentages resolve against screen width apart from the vertical
    /// center, which resolves against height. Mask geometry truncates to
    /// whole pixels.
    pub fn resolve(modulation: Modulation, width: u32, height: u32) -> Self {
        match modulation {
            Modulation::FullField => ResolvedModulation::Full,
            Modulation::CircularMask {
                diameter_pct,
                center_left_pct,
                center_top_pct,
                fade_pct,
            } => ResolvedModulation::Mask {
                center_x: (f64::from(width) * center_left_pct / 100.0) as i32,
                center_y: (f64::from(height) * center_top_pct / 100.0) as i32,
                radius: (f64::from(width) * diameter_pct / 200.0) as i32,
                fade_px: f64::from(width) * fade_pct / 100.0,
            },
            Modulation::Gabor {
                sigma_pct,
                center_left_pct,
                center_top_pct,
            } => {
                let sigma = f64::from(width) * sigma_pct / 100.0;
                ResolvedModulation::Envelope {
                    center_x: f64::from(width) * center_left_pct / 100.0,
                    center_y: f64::from(height) * center_top_pct / 100.0,
                    two_sigma_sq: 2.0 * sigma * sigma,
                }
            }
        }
    }

    /// Stimulus weight at (x, y): 1 shows the full carrier excursion, 0 is
    /// pure background.
    pub fn weight(&self, x: u32, y: u32) -> f64 {
        match *self {
            ResolvedModulation::Full => 1.0,
            ResolvedModulation::Mask {
                center_x,
                center_y,
                radius,
                fade_px,
            } => {
                let dx = x as i32 - center_x;
                let dy = y as i32 - center_y;
                let point_radius = (f64::from(dx * dx + dy * dy)).sqrt() as i32;
                if f64::from(point_radius) > f64::from(radius) + fade_px {
                    0.0
                } else if point_radius <= radius {
                    1.0
                } else {
                    (f64::from(radius) + fade_px - f64::from(point_radius)) / fade_px
                }
            }
            ResolvedModulation::Envelope {
                center_x,
                center_y,
                two_sigma_sq,
            } => {
                let dx = f64::from(x) - center_x;
                let dy = f64::from(y) - center_y;
                (-(dx * dx + dy * dy) / two_sigma_sq).exp()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn centered_mask(diameter_pct: f64, fade_pct: f64) -> ResolvedModulation {
        ResolvedModulation::resolve(
            Modulation::CircularMask {
                diameter_pct,
                center_left_pct: 50.0,
                center_top_pct: 50.0,
                fade_pct,
            },
            200,
            200,
        )
    }

    #[test]
    fn full_field_weight_is_one_everywhere() {
        let m = ResolvedModulation::resolve(Modulation::FullField, 200, 200);
        assert_eq!(m.weight(0, 0), 1.0);
        assert_eq!(m.weight(199, 199), 1.0);
    }

    #[test]
    fn hard_edge_mask_is_binary() {
        // Diameter 50% of 200 px -> radius 50 px around (100, 100).
        let m = centered_mask(50.0, 0.0);
        assert_eq!(m.weight(100, 100), 1.0);
        assert_eq!(m.weight(150, 100), 1.0); // on the radius
        assert_eq!(m.weight(151, 100), 0.0); // one past it
        assert_eq!(m.weight(0, 0), 0.0);
    }

    #[test]
    fn fade_band_interpolates_linearly() {
        // Radius 50 px, fade 10% of 200 px = 20 px.
        let m = centered_mask(50.0, 10.0);
        assert_eq!(m.weight(150, 100), 1.0);
        assert_eq!(m.weight(160, 100), 0.5);
        assert_eq!(m.weight(171, 100), 0.0);
        let w = m.weight(165, 100);
        assert!(w > 0.0 && w < 0.5);
    }

    #[test]
    fn envelope_peaks_at_center_and_decays() {
        let m = ResolvedModulation::resolve(
            Modulation::Gabor {
                sigma_pct: 10.0,
                center_left_pct: 50.0,
                center_top_pct: 50.0,
            },
            200,
            200,
        );
        assert_eq!(m.weight(100, 100), 1.0);
        // One sigma out (20 px): exp(-1/2).
        let one_sigma = m.weight(120, 100);
        assert!((one_sigma - (-0.5_f64).exp()).abs() < 1e-12);
        // Far corner is effectively background but never exactly zero.
        let corner = m.weight(0, 0);
        assert!(corner > 0.0 && corner < 1e-10);
    }
}
