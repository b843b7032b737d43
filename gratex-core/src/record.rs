use serde::{Deserialize, Serialize};

/// Timing summary of one completed playback. Immutable; one is produced per
/// `play` call that runs to completion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    /// Mean inter-frame interval in microseconds.
    pub mean_interframe_us: f64,
    /// Standard deviation of the inter-frame interval in microseconds.
    pub stddev_interframe_us: f64,
    /// Wall-clock start of playback, Unix epoch seconds.
    pub start_time: u64,
}

impl PerformanceRecord {
    /// Record for a playback with fewer than two frame boundaries: there are
    /// no intervals to aggregate, so both statistics are zero.
    pub fn empty(start_time: u64) -> Self {
        PerformanceRecord {
            mean_interframe_us: 0.0,
            stddev_interframe_us: 0.0,
            start_time,
        }
    }
}
