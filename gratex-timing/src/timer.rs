use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Monotonic timing seam for frame presentation. Presentation code records the
/// observed interval at each frame boundary; the aggregate statistics are what
/// end up in a performance record.
pub trait Timer: Clone + Send + Sync {
    type Timestamp: Copy + Send + Sync;
    fn now(&self) -> Self::Timestamp;
    fn elapsed(&self, since: Self::Timestamp) -> Duration;
    fn sleep(&self, duration: Duration);
    fn record_interval(&mut self, interval: Duration);
    fn interval_stats(&self) -> IntervalStats;
}

/// Aggregate inter-frame interval statistics, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalStats {
    pub mean_us: f64,
    pub stddev_us: f64,
    pub min_us: f64,
    pub max_us: f64,
    pub effective_hz: f64,
}

impl IntervalStats {
    pub fn from_intervals(intervals: &[Duration]) -> Self {
        if intervals.is_empty() {
            return IntervalStats {
                mean_us: 0.0,
                stddev_us: 0.0,
                min_us: 0.0,
                max_us: 0.0,
                effective_hz: 0.0,
            };
        }
        let samples: Vec<f64> = intervals
            .iter()
            .map(|d| d.as_nanos() as f64 / 1_000.0)
            .collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let variance =
            samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        IntervalStats {
            mean_us: mean,
            stddev_us: variance.sqrt(),
            min_us: min,
            max_us: max,
            effective_hz: if mean > 0.0 { 1_000_000.0 / mean } else { 0.0 },
        }
    }
}

/// Seconds since the Unix epoch, saturating to zero on a pre-epoch clock.
pub fn unix_time_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Monotonic timer with platform-specific high-precision sleeps and a bounded
/// interval sample buffer.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    start: Instant,
    intervals: Vec<Duration>,
    max_samples: usize,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self::with_capacity(1_000)
    }

    /// A timer that keeps up to `max_samples` intervals. Size it to the frame
    /// count when the statistics must cover a whole presentation.
    pub fn with_capacity(max_samples: usize) -> Self {
        FrameTimer {
            start: Instant::now(),
            intervals: Vec::with_capacity(max_samples),
            max_samples,
        }
    }

    /// Sleeps until `target`, returning immediately if it already passed.
    pub fn sleep_until(&self, target: Instant) {
        let now = Instant::now();
        if target > now {
            self.sleep(target - now);
        }
    }

    fn high_precision_sleep(&self, duration: Duration) {
        #[cfg(target_os = "linux")]
        linux_sleep(duration);
        #[cfg(target_os = "windows")]
        windows_sleep(duration);
        #[cfg(target_os = "macos")]
        macos_sleep(duration);
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        std::thread::sleep(duration);
    }
}

impl Timer for FrameTimer {
    type Timestamp = u64;

    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }

    fn elapsed(&self, since: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(since))
    }

    fn sleep(&self, duration: Duration) {
        self.high_precision_sleep(duration);
    }

    fn record_interval(&mut self, interval: Duration) {
        if self.intervals.len() >= self.max_samples {
            self.intervals.remove(0);
        }
        self.intervals.push(interval);
    }

    fn interval_stats(&self) -> IntervalStats {
        IntervalStats::from_intervals(&self.intervals)
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "linux")]
fn linux_sleep(duration: Duration) {
    use libc::{CLOCK_MONOTONIC, clock_nanosleep, timespec};

    let mut req = timespec {
        tv_sec: duration.as_secs() as libc::time_t,
        tv_nsec: duration.subsec_nanos() as libc::c_long,
    };
    let mut rem = timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // Relative sleep; resume from the remainder if a signal lands mid-sleep.
    unsafe {
        while clock_nanosleep(CLOCK_MONOTONIC, 0, &req, &mut rem) == libc::EINTR {
            req = rem;
        }
    }
}

#[cfg(target_os = "windows")]
fn windows_sleep(duration: Duration) {
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::System::Threading::{
        CreateWaitableTimerW, INFINITE, SetWaitableTimer, WaitForSingleObject,
    };

    unsafe {
        let Ok(timer) = CreateWaitableTimerW(None, true, None) else {
            std::thread::sleep(duration);
            return;
        };
        // Negative due time = relative, in 100 ns units.
        let due_time = -(duration.as_nanos() as i64 / 100);
        if SetWaitableTimer(timer, &due_time, 0, None, None, false).is_ok() {
            WaitForSingleObject(timer, INFINITE);
        } else {
            std::thread::sleep(duration);
        }
        let _ = CloseHandle(timer);
    }
}

#[cfg(target_os = "macos")]
fn macos_sleep(duration: Duration) {
    use mach2::mach_time::{mach_absolute_time, mach_timebase_info, mach_timebase_info_data_t};

    // Spin for sub-100 µs targets, where thread::sleep overshoots badly.
    if duration.as_nanos() < 100_000 {
        unsafe {
            let start = mach_absolute_time();
            let mut timebase = mach_timebase_info_data_t { numer: 0, denom: 0 };
            mach_timebase_info(&mut timebase);
            let target_ticks =
                duration.as_nanos() as u64 * timebase.denom as u64 / timebase.numer as u64;
            while mach_absolute_time() - start < target_ticks {
                std::hint::spin_loop();
            }
        }
    } else {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_of_known_intervals() {
        let intervals = [Duration::from_millis(10), Duration::from_millis(30)];
        let stats = IntervalStats::from_intervals(&intervals);
        assert_eq!(stats.mean_us, 20_000.0);
        assert_eq!(stats.stddev_us, 10_000.0);
        assert_eq!(stats.min_us, 10_000.0);
        assert_eq!(stats.max_us, 30_000.0);
        assert_eq!(stats.effective_hz, 50.0);
    }

    #[test]
    fn stats_of_nothing_are_zero() {
        let stats = IntervalStats::from_intervals(&[]);
        assert_eq!(stats.mean_us, 0.0);
        assert_eq!(stats.stddev_us, 0.0);
        assert_eq!(stats.effective_hz, 0.0);
    }

    #[test]
    fn sample_buffer_is_bounded() {
        let mut timer = FrameTimer::with_capacity(3);
        for ms in [10, 20, 30, 40] {
            timer.record_interval(Duration::from_millis(ms));
        }
        let stats = timer.interval_stats();
        // Oldest sample (10 ms) was dropped.
        assert_eq!(stats.min_us, 20_000.0);
        assert_eq!(stats.max_us, 40_000.0);
    }

    #[test]
    fn sleep_never_undershoots() {
        let timer = FrameTimer::new();
        let before = Instant::now();
        timer.sleep(Duration::from_millis(2));
        assert!(before.elapsed() >= Duration::from_millis(2));
    }

    #[test]
    fn sleep_until_past_target_returns() {
        let timer = FrameTimer::new();
        timer.sleep_until(Instant::now() - Duration::from_millis(5));
    }

    #[test]
    fn elapsed_is_monotonic() {
        let timer = FrameTimer::new();
        let t0 = timer.now();
        std::thread::sleep(Duration::from_millis(1));
        assert!(timer.elapsed(t0) >= Duration::from_millis(1));
        assert!(timer.now() >= t0);
    }
}
