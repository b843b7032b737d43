use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use gratex_core::{AnimationHeader, GratexError, GratexResult, PixelFormat};
use tracing::debug;

/// Converts an externally-produced interleaved RGB888 stream into an
/// animation file. Each source frame is held for `refreshes_per_frame`
/// refresh cycles, so a 30 fps clip played on a 60 Hz display passes 2.
pub fn convert_raw(
    src: &Path,
    dst: &Path,
    frames: u32,
    resolution: (u32, u32),
    refreshes_per_frame: u32,
    pixel_format: PixelFormat,
) -> GratexResult<AnimationHeader> {
    let (width, height) = resolution;
    if width == 0 || height == 0 {
        return Err(GratexError::validation(format!(
            "resolution must be positive, got {width}x{height}"
        )));
    }
    if frames == 0 {
        return Err(GratexError::validation("stream must have at least one frame"));
    }
    if refreshes_per_frame == 0 {
        return Err(GratexError::validation(
            "refreshes per frame must be at least 1",
        ));
    }
    let total_frames = frames.checked_mul(refreshes_per_frame).ok_or_else(|| {
        GratexError::validation(format!(
            "{frames} frames x {refreshes_per_frame} refreshes overflows the frame counter"
        ))
    })?;

    let source_frame_bytes = width as u64 * height as u64 * 3;
    let expected = frames as u64 * source_frame_bytes;
    let actual = fs::metadata(src)
        .map_err(|e| GratexError::io("read", src, e))?
        .len();
    if actual != expected {
        return Err(GratexError::StreamLength {
            path: src.to_path_buf(),
            expected,
            actual,
        });
    }

    let header = AnimationHeader {
        frame_count: total_frames,
        width,
        height,
        pixel_format,
    };
    let mut reader = BufReader::new(File::open(src).map_err(|e| GratexError::io("open", src, e))?);
    let file = File::create(dst).map_err(|e| GratexError::io("create", dst, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(&header.encode())
        .map_err(|e| GratexError::io("write", dst, e))?;

    let mut rgb = vec![0u8; source_frame_bytes as usize];
    let mut packed = Vec::with_capacity(header.frame_bytes());
    for _ in 0..frames {
        reader
            .read_exact(&mut rgb)
            .map_err(|e| GratexError::io("read", src, e))?;
        packed.clear();
        for triplet in rgb.chunks_exact(3) {
            pixel_format.write_pixel(&mut packed, triplet[0], triplet[1], triplet[2]);
        }
        for _ in 0..refreshes_per_frame {
            writer
                .write_all(&packed)
                .map_err(|e| GratexError::io("write", dst, e))?;
        }
    }
    writer
        .flush()
        .map_err(|e| GratexError::io("write", dst, e))?;

    debug!(
        src = %src.display(),
        dst = %dst.display(),
        frames = total_frames,
        "converted raw stream"
    );
    Ok(header)
}
