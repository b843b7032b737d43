pub mod error;
pub mod format;
pub mod pixel;
pub mod record;
pub mod stimulus;

pub use error::{GratexError, GratexResult};
pub use format::{AnimationHeader, HEADER_LEN};
pub use pixel::{PixelFormat, pack_rgb565};
pub use record::PerformanceRecord;
pub use stimulus::{GratingSpec, Modulation, SweepAxis, Waveform};

/// Degrees of visual angle subtended by the full display width.
pub const DEGREES_SUBTENDED: u32 = 80;

/// Nominal display refresh rate in Hz.
pub const DEFAULT_REFRESH_HZ: f64 = 60.0;

/// Trigger channel permanently reserved for the feedback output line.
pub const FEEDBACK_CHANNEL: u8 = 1;
