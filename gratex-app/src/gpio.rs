//! Sysfs GPIO glue. Trigger channels are GPIO numbers; the feedback line is
//! driven as an output on its reserved pin.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use gratex_core::{GratexError, GratexResult};
use gratex_display::{FeedbackLine, SignalSource};
use tracing::{debug, warn};

const GPIO_ROOT: &str = "/sys/class/gpio";
const POLL_INTERVAL: Duration = Duration::from_micros(500);

fn export(pin: u32) -> GratexResult<PathBuf> {
    let dir = PathBuf::from(GPIO_ROOT).join(format!("gpio{pin}"));
    if !dir.exists() {
        let export = PathBuf::from(GPIO_ROOT).join("export");
        fs::write(&export, pin.to_string()).map_err(|e| GratexError::io("write", &export, e))?;
        // Exported nodes appear asynchronously.
        thread::sleep(Duration::from_millis(50));
    }
    Ok(dir)
}

fn set_direction(dir: &Path, direction: &str) -> GratexResult<()> {
    let path = dir.join("direction");
    fs::write(&path, direction).map_err(|e| GratexError::io("write", &path, e))
}

/// Watches a trigger line from a detached thread, reporting each rising edge
/// as a signal. A line already high when the watcher starts does not count;
/// only transitions observed while watching do.
pub fn watch_trigger(channel: u8, source: SignalSource) -> GratexResult<()> {
    let dir = export(u32::from(channel))?;
    set_direction(&dir, "in")?;
    let value_path = dir.join("value");
    let mut last = read_level(&value_path).unwrap_or(b'0');
    thread::spawn(move || loop {
        let level = match read_level(&value_path) {
            Some(level) => level,
            None => {
                warn!(channel, "trigger line unreadable, watcher stopping");
                break;
            }
        };
        if last == b'0' && level == b'1' {
            debug!(channel, "trigger edge");
            source.edge(channel);
        }
        last = level;
        thread::sleep(POLL_INTERVAL);
    });
    Ok(())
}

fn read_level(path: &Path) -> Option<u8> {
    fs::read(path).ok()?.first().copied()
}

/// Feedback output on sysfs. Opens low and is driven per frame by the
/// scheduler.
pub struct SysfsFeedback {
    pin: u32,
    value_path: PathBuf,
}

impl SysfsFeedback {
    pub fn open(pin: u32) -> GratexResult<Self> {
        let dir = export(pin)?;
        set_direction(&dir, "out")?;
        let mut line = SysfsFeedback {
            pin,
            value_path: dir.join("value"),
        };
        line.set(false)?;
        Ok(line)
    }
}

impl FeedbackLine for SysfsFeedback {
    fn set(&mut self, high: bool) -> GratexResult<()> {
        fs::write(&self.value_path, if high { "1" } else { "0" })
            .map_err(|e| GratexError::device("feedback write", e))
    }
}

impl Drop for SysfsFeedback {
    fn drop(&mut self) {
        let _ = self.set(false);
        let unexport = PathBuf::from(GPIO_ROOT).join("unexport");
        if let Err(e) = fs::write(&unexport, self.pin.to_string()) {
            debug!(pin = self.pin, error = %e, "gpio unexport failed");
        }
    }
}
