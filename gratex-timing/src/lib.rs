pub mod timer;

pub use timer::{FrameTimer, IntervalStats, Timer, unix_time_secs};
