use std::time::{Duration, Instant};

use gratex_core::{GratexResult, PixelFormat};
use gratex_timing::FrameTimer;

/// Seam between the surface manager and the physical (or simulated) pixel
/// device. `frame_mut` exposes the back buffer for the upcoming frame;
/// `present` publishes it at the next refresh boundary and blocks until that
/// boundary has passed.
pub trait DisplayDevice {
    fn resolution(&self) -> (u32, u32);
    fn pixel_format(&self) -> PixelFormat;
    /// Back buffer for the next frame, row-major from the top-left corner.
    fn frame_mut(&mut self) -> &mut [u8];
    /// Publishes the back buffer, blocking until the refresh it lands on.
    fn present(&mut self) -> GratexResult<()>;
    /// Restores whatever device state open-time setup disturbed.
    fn restore(&mut self) -> GratexResult<()>;
}

/// In-memory device for headless runs and tests. Optionally paces `present`
/// at a nominal refresh rate so interval statistics stay meaningful without
/// real hardware.
#[derive(Debug)]
pub struct MemoryDevice {
    width: u32,
    height: u32,
    format: PixelFormat,
    back: Vec<u8>,
    front: Vec<u8>,
    presents: u64,
    pacing: Option<Pacing>,
}

#[derive(Debug)]
struct Pacing {
    period: Duration,
    next: Instant,
    timer: FrameTimer,
}

impl MemoryDevice {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let len = width as usize * height as usize * format.bytes_per_pixel();
        MemoryDevice {
            width,
            height,
            format,
            back: vec![0; len],
            front: vec![0; len],
            presents: 0,
            pacing: None,
        }
    }

    /// A device whose presents block until the next `refresh_hz` boundary,
    /// emulating a vsync-locked panel.
    pub fn paced(width: u32, height: u32, format: PixelFormat, refresh_hz: f64) -> Self {
        let mut device = Self::new(width, height, format);
        if refresh_hz > 0.0 {
            device.pacing = Some(Pacing {
                period: Duration::from_secs_f64(1.0 / refresh_hz),
                next: Instant::now(),
                timer: FrameTimer::new(),
            });
        }
        device
    }

    /// The most recently presented frame.
    pub fn front(&self) -> &[u8] {
        &self.front
    }

    pub fn present_count(&self) -> u64 {
        self.presents
    }
}

impl DisplayDevice for MemoryDevice {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    fn frame_mut(&mut self) -> &mut [u8] {
        &mut self.back
    }

    fn present(&mut self) -> GratexResult<()> {
        if let Some(pacing) = &mut self.pacing {
            pacing.timer.sleep_until(pacing.next);
            let now = Instant::now();
            pacing.next += pacing.period;
            if pacing.next < now {
                // Missed boundaries are skipped, like real vsync.
                pacing.next = now + pacing.period;
            }
        }
        self.front.copy_from_slice(&self.back);
        self.presents += 1;
        Ok(())
    }

    fn restore(&mut self) -> GratexResult<()> {
        Ok(())
    }
}
