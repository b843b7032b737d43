use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::path::Path;
use std::ptr;
use std::slice;

use gratex_core::{GratexError, GratexResult, PixelFormat};
use tracing::{debug, warn};

use crate::device::DisplayDevice;

const FBIOGET_VSCREENINFO: libc::c_ulong = 0x4600;
const FBIOPUT_VSCREENINFO: libc::c_ulong = 0x4601;
const FBIOGET_FSCREENINFO: libc::c_ulong = 0x4602;
const FBIOPAN_DISPLAY: libc::c_ulong = 0x4606;
const FBIO_WAITFORVSYNC: libc::c_ulong = 0x4004_4620;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct FbBitfield {
    offset: u32,
    length: u32,
    msb_right: u32,
}

/// Mirror of the kernel's `fb_var_screeninfo`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct FbVarScreeninfo {
    xres: u32,
    yres: u32,
    xres_virtual: u32,
    yres_virtual: u32,
    xoffset: u32,
    yoffset: u32,
    bits_per_pixel: u32,
    grayscale: u32,
    red: FbBitfield,
    green: FbBitfield,
    blue: FbBitfield,
    transp: FbBitfield,
    nonstd: u32,
    activate: u32,
    height: u32,
    width: u32,
    accel_flags: u32,
    pixclock: u32,
    left_margin: u32,
    right_margin: u32,
    upper_margin: u32,
    lower_margin: u32,
    hsync_len: u32,
    vsync_len: u32,
    sync: u32,
    vmode: u32,
    rotate: u32,
    colorspace: u32,
    reserved: [u32; 4],
}

/// Mirror of the kernel's `fb_fix_screeninfo`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct FbFixScreeninfo {
    id: [u8; 16],
    smem_start: libc::c_ulong,
    smem_len: u32,
    type_: u32,
    type_aux: u32,
    visual: u32,
    xpanstep: u16,
    ypanstep: u16,
    ywrapstep: u16,
    line_length: u32,
    mmio_start: libc::c_ulong,
    mmio_len: u32,
    accel: u32,
    capabilities: u16,
    reserved: [u16; 2],
}

fn fb_ioctl<T>(
    file: &File,
    request: libc::c_ulong,
    arg: &mut T,
    op: &'static str,
) -> GratexResult<()> {
    let rc = unsafe { libc::ioctl(file.as_raw_fd(), request as _, arg as *mut T) };
    if rc == -1 {
        return Err(GratexError::device(op, io::Error::last_os_error()));
    }
    Ok(())
}

/// Memory-mapped Linux framebuffer, double-buffered through display panning
/// when the driver grants a doubled virtual resolution.
pub struct FramebufferDevice {
    file: File,
    map: *mut u8,
    map_len: usize,
    frame_len: usize,
    width: u32,
    height: u32,
    format: PixelFormat,
    vinfo: FbVarScreeninfo,
    saved: FbVarScreeninfo,
    back_index: u32,
    double_buffered: bool,
    restored: bool,
}

impl FramebufferDevice {
    /// Maps `path`, switching the device into the requested mode. The prior
    /// mode is put back by `restore` (or on drop).
    pub fn open(path: &Path, resolution: (u32, u32), format: PixelFormat) -> GratexResult<Self> {
        let (width, height) = resolution;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| GratexError::io("open", path, e))?;

        let mut saved = FbVarScreeninfo::default();
        fb_ioctl(&file, FBIOGET_VSCREENINFO, &mut saved, "query mode")?;

        let bits_per_pixel = format.bytes_per_pixel() as u32 * 8;
        let mut vinfo = saved;
        vinfo.xres = width;
        vinfo.yres = height;
        vinfo.xres_virtual = width;
        vinfo.yres_virtual = height * 2;
        vinfo.xoffset = 0;
        vinfo.yoffset = 0;
        vinfo.bits_per_pixel = bits_per_pixel;

        let mut double_buffered = true;
        if fb_ioctl(&file, FBIOPUT_VSCREENINFO, &mut vinfo, "set mode").is_err() {
            // Some drivers refuse a doubled virtual height. Fall back to a
            // single buffer and accept the tearing risk.
            vinfo.yres_virtual = height;
            double_buffered = false;
            fb_ioctl(&file, FBIOPUT_VSCREENINFO, &mut vinfo, "set mode")?;
        }
        fb_ioctl(&file, FBIOGET_VSCREENINFO, &mut vinfo, "query mode")?;
        if (vinfo.xres, vinfo.yres) != (width, height) || vinfo.bits_per_pixel != bits_per_pixel {
            return Err(GratexError::device(
                "set mode",
                io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!(
                        "driver kept {}x{} at {} bpp",
                        vinfo.xres, vinfo.yres, vinfo.bits_per_pixel
                    ),
                ),
            ));
        }
        if vinfo.yres_virtual < height * 2 {
            double_buffered = false;
        }

        let mut finfo = FbFixScreeninfo::default();
        fb_ioctl(&file, FBIOGET_FSCREENINFO, &mut finfo, "query layout")?;
        let line_length = finfo.line_length as usize;
        if line_length != width as usize * format.bytes_per_pixel() {
            return Err(GratexError::device(
                "map",
                io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!("padded scanlines ({line_length} byte stride) are not supported"),
                ),
            ));
        }

        let frame_len = line_length * height as usize;
        let map_len = line_length * vinfo.yres_virtual as usize;
        let map = unsafe {
            libc::mmap(
                ptr::null_mut(),
                map_len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };
        if map == libc::MAP_FAILED {
            let err = GratexError::device("map", io::Error::last_os_error());
            let mut prior = saved;
            let _ = fb_ioctl(&file, FBIOPUT_VSCREENINFO, &mut prior, "restore mode");
            return Err(err);
        }

        debug!(
            path = %path.display(),
            width,
            height,
            double_buffered,
            "framebuffer mapped"
        );
        Ok(FramebufferDevice {
            file,
            map: map.cast(),
            map_len,
            frame_len,
            width,
            height,
            format,
            vinfo,
            saved,
            back_index: u32::from(double_buffered),
            double_buffered,
            restored: false,
        })
    }
}

impl DisplayDevice for FramebufferDevice {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    fn frame_mut(&mut self) -> &mut [u8] {
        let offset = self.back_index as usize * self.frame_len;
        unsafe { slice::from_raw_parts_mut(self.map.add(offset), self.frame_len) }
    }

    fn present(&mut self) -> GratexResult<()> {
        if self.double_buffered {
            self.vinfo.yoffset = self.back_index * self.height;
            fb_ioctl(&self.file, FBIOPAN_DISPLAY, &mut self.vinfo, "pan")?;
            self.back_index ^= 1;
        }
        // Not every driver implements the vsync wait; its absence degrades
        // pacing, not correctness.
        let mut crtc: u32 = 0;
        let rc = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                FBIO_WAITFORVSYNC as _,
                &mut crtc as *mut u32,
            )
        };
        if rc == -1 {
            debug!("vsync wait unavailable");
        }
        Ok(())
    }

    fn restore(&mut self) -> GratexResult<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        let mut prior = self.saved;
        fb_ioctl(&self.file, FBIOPUT_VSCREENINFO, &mut prior, "restore mode")
    }
}

impl Drop for FramebufferDevice {
    fn drop(&mut self) {
        if !self.restored {
            let mut prior = self.saved;
            if fb_ioctl(&self.file, FBIOPUT_VSCREENINFO, &mut prior, "restore mode").is_err() {
                warn!("could not restore prior framebuffer mode");
            }
            self.restored = true;
        }
        unsafe {
            libc::munmap(self.map.cast(), self.map_len);
        }
    }
}
