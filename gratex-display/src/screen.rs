use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use gratex_core::{
    AnimationHeader, GratexError, GratexResult, HEADER_LEN, PixelFormat, pack_rgb565,
};
use tracing::{debug, info, warn};

use crate::device::DisplayDevice;

// The physical device has no overlap semantics, so at most one live surface
// may exist per process.
static SCREEN_CLAIMED: AtomicBool = AtomicBool::new(false);

/// Exclusive handle on the display. Every surface operation goes through a
/// live `Screen`; a closed one answers `SurfaceClosed` instead of touching
/// the device.
#[derive(Debug)]
pub struct Screen<D: DisplayDevice> {
    device: Option<D>,
    background: u8,
}

impl<D: DisplayDevice> Screen<D> {
    /// Claims the display and paints it to `background`. Fails fast when a
    /// surface is already live, without touching the device.
    pub fn open(device: D, background: u8) -> GratexResult<Self> {
        let (width, height) = device.resolution();
        if width == 0 || height == 0 {
            return Err(GratexError::validation(format!(
                "surface resolution must be positive, got {width}x{height}"
            )));
        }
        if SCREEN_CLAIMED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(GratexError::SurfaceBusy);
        }
        let mut screen = Screen {
            device: Some(device),
            background,
        };
        screen.fill(i32::from(background))?;
        info!(width, height, background, "surface opened");
        Ok(screen)
    }

    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.device.as_ref().map(|d| d.resolution())
    }

    pub fn background(&self) -> u8 {
        self.background
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    pub fn device(&self) -> Option<&D> {
        self.device.as_ref()
    }

    /// Paints the whole surface one grey level and presents it. On any
    /// failure the surface closes before the error propagates, so the device
    /// is never left half-initialized.
    pub fn fill(&mut self, luminance: i32) -> GratexResult<()> {
        let Some(device) = self.device.as_mut() else {
            return Err(GratexError::SurfaceClosed);
        };
        let result = fill_device(device, luminance);
        if result.is_err() {
            if let Err(close_err) = self.close() {
                warn!(error = %close_err, "close after failed fill also failed");
            }
        }
        result
    }

    /// Reads a whole animation file into memory, verifying its header against
    /// this surface. A sequence whose geometry or pixel format differs from
    /// the surface is refused here, before any frame byte can be written.
    pub fn load_sequence(&mut self, path: &Path) -> GratexResult<LoadedSequence> {
        if self.device.is_none() {
            return Err(GratexError::SurfaceClosed);
        }
        let mut bytes = fs::read(path).map_err(|e| GratexError::io("read", path, e))?;
        if bytes.len() < HEADER_LEN {
            return Err(GratexError::malformed_header(
                path,
                format!("{} bytes is shorter than the {HEADER_LEN} byte header", bytes.len()),
            ));
        }
        let mut head = [0u8; HEADER_LEN];
        head.copy_from_slice(&bytes[..HEADER_LEN]);
        let Some(header) = AnimationHeader::decode(&head) else {
            return Err(GratexError::malformed_header(
                path,
                format!("unknown pixel format tag {}", head[HEADER_LEN - 1]),
            ));
        };
        let expected = HEADER_LEN as u64 + header.data_bytes();
        if bytes.len() as u64 != expected {
            return Err(GratexError::StreamLength {
                path: path.to_path_buf(),
                expected,
                actual: bytes.len() as u64,
            });
        }
        self.check_header(&header)?;
        let data = bytes.split_off(HEADER_LEN);
        debug!(path = %path.display(), frames = header.frame_count, "sequence loaded");
        Ok(LoadedSequence { header, data })
    }

    /// Releases a sequence's memory. Ownership makes a second release on the
    /// same sequence unrepresentable.
    pub fn unload(&self, sequence: LoadedSequence) {
        debug!(frames = sequence.frame_count(), "sequence unloaded");
        drop(sequence);
    }

    /// Restores the prior device state and releases the claim. Idempotent.
    pub fn close(&mut self) -> GratexResult<()> {
        let Some(mut device) = self.device.take() else {
            return Ok(());
        };
        let result = device.restore();
        SCREEN_CLAIMED.store(false, Ordering::Release);
        info!("surface closed");
        result
    }

    pub(crate) fn check_header(&self, header: &AnimationHeader) -> GratexResult<()> {
        let Some(device) = self.device.as_ref() else {
            return Err(GratexError::SurfaceClosed);
        };
        let (width, height) = device.resolution();
        if (header.width, header.height) != (width, height) {
            return Err(GratexError::GeometryMismatch {
                sequence_width: header.width,
                sequence_height: header.height,
                surface_width: width,
                surface_height: height,
            });
        }
        if header.pixel_format != device.pixel_format() {
            return Err(GratexError::PixelFormatMismatch {
                sequence: header.pixel_format,
                surface: device.pixel_format(),
            });
        }
        Ok(())
    }

    pub(crate) fn write_frame(&mut self, frame: &[u8]) -> GratexResult<()> {
        let Some(device) = self.device.as_mut() else {
            return Err(GratexError::SurfaceClosed);
        };
        device.frame_mut().copy_from_slice(frame);
        device.present()
    }
}

impl<D: DisplayDevice> Drop for Screen<D> {
    fn drop(&mut self) {
        if self.device.is_some() {
            if let Err(err) = self.close() {
                warn!(error = %err, "could not restore device state on drop");
            }
        }
    }
}

fn fill_device<D: DisplayDevice>(device: &mut D, luminance: i32) -> GratexResult<()> {
    let value = u8::try_from(luminance).map_err(|_| {
        GratexError::validation(format!("fill luminance must lie in 0..=255, got {luminance}"))
    })?;
    let format = device.pixel_format();
    let frame = device.frame_mut();
    match format {
        PixelFormat::Rgb888 => frame.fill(value),
        PixelFormat::Rgb565 => {
            let packed = pack_rgb565(value, value, value).to_le_bytes();
            for px in frame.chunks_exact_mut(2) {
                px.copy_from_slice(&packed);
            }
        }
    }
    device.present()
}

/// An animation file held entirely in memory, bound to the surface that
/// loaded it.
pub struct LoadedSequence {
    header: AnimationHeader,
    data: Vec<u8>,
}

impl std::fmt::Debug for LoadedSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedSequence")
            .field("header", &self.header)
            .field("data_len", &self.data.len())
            .finish()
    }
}

impl LoadedSequence {
    pub fn header(&self) -> &AnimationHeader {
        &self.header
    }

    pub fn frame_count(&self) -> u32 {
        self.header.frame_count
    }

    pub fn frame(&self, index: u32) -> &[u8] {
        let len = self.header.frame_bytes();
        let start = index as usize * len;
        &self.data[start..start + len]
    }
}
