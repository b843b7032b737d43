use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use gratex_core::{GratexError, GratexResult, PerformanceRecord};
use tracing::debug;

/// Appending writer for the per-presentation log. Each line carries the
/// stimulus type, identifier, start time in Unix seconds, then the mean and
/// standard deviation of the inter-frame interval in microseconds,
/// tab-separated. A line is durable once `append` returns.
pub struct PresentationLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl PresentationLog {
    /// Opens `path` for appending, creating parent directories as needed.
    pub fn open(path: &Path) -> GratexResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| GratexError::io("create", parent, e))?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| GratexError::io("open", path, e))?;
        debug!(path = %path.display(), "presentation log open");
        Ok(PresentationLog {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn append(
        &mut self,
        stimulus_type: &str,
        identifier: &str,
        record: &PerformanceRecord,
    ) -> GratexResult<()> {
        writeln!(
            self.writer,
            "{stimulus_type}\t{identifier}\t{}\t{:.1}\t{:.1}",
            record.start_time, record.mean_interframe_us, record.stddev_interframe_us
        )
        .and_then(|()| self.writer.flush())
        .map_err(|e| GratexError::io("write", &self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lines_append_and_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("logs/session/run.log");

        let record = PerformanceRecord {
            mean_interframe_us: 16_666.7,
            stddev_interframe_us: 120.25,
            start_time: 1_700_000_000,
        };
        let mut log = PresentationLog::open(&path).unwrap();
        log.append("grating", "square90.anim", &record).unwrap();
        drop(log);

        let mut log = PresentationLog::open(&path).unwrap();
        log.append("animation", "clip.anim", &record).unwrap();
        drop(log);

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "grating\tsquare90.anim\t1700000000\t16666.7\t120.2"
        );
        assert!(lines[1].starts_with("animation\tclip.anim\t"));
    }
}
