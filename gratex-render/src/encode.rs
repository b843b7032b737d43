use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use gratex_core::{AnimationHeader, GratexError, GratexResult, GratingSpec, SweepAxis};
use tracing::debug;

use crate::frame::FramePainter;
use crate::wave::{drift_geometry, frame_count};

/// Encodes one spec into an animation file at `path`, creating parent
/// directories as needed. All validation happens before the file is touched.
pub fn encode_grating(
    path: &Path,
    spec: &GratingSpec,
    refresh_hz: f64,
) -> GratexResult<AnimationHeader> {
    spec.validate()?;
    let geometry = drift_geometry(spec, refresh_hz)?;
    let (width, height) = spec.resolution;
    let header = AnimationHeader {
        frame_count: frame_count(spec.duration_secs, refresh_hz),
        width,
        height,
        pixel_format: spec.pixel_format,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| GratexError::io("create directory", parent, e))?;
        }
    }
    let file = File::create(path).map_err(|e| GratexError::io("create", path, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(&header.encode())
        .map_err(|e| GratexError::io("write", path, e))?;

    let painter = FramePainter::new(spec, geometry);
    let started = Instant::now();
    let mut frame = Vec::with_capacity(painter.frame_len());
    for t in 0..header.frame_count {
        painter.paint_into(t, &mut frame);
        writer
            .write_all(&frame)
            .map_err(|e| GratexError::io("write", path, e))?;
    }
    writer
        .flush()
        .map_err(|e| GratexError::io("write", path, e))?;

    debug!(
        path = %path.display(),
        frames = header.frame_count,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "encoded grating"
    );
    Ok(header)
}

/// Encodes one file per swept value into `dir`, each named after its value.
/// Returns the written paths in sweep order.
pub fn encode_sweep(
    dir: &Path,
    base: &GratingSpec,
    axis: &SweepAxis,
    refresh_hz: f64,
) -> GratexResult<Vec<PathBuf>> {
    if axis.is_empty() {
        return Err(GratexError::validation("sweep has no values"));
    }
    fs::create_dir_all(dir).map_err(|e| GratexError::io("create directory", dir, e))?;
    let mut written = Vec::with_capacity(axis.len());
    for (name, spec) in axis.expand(base) {
        let path = dir.join(name);
        encode_grating(&path, &spec, refresh_hz)?;
        written.push(path);
    }
    debug!(dir = %dir.display(), count = written.len(), "encoded sweep");
    Ok(written)
}
