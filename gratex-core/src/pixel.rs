use serde::{Deserialize, Serialize};

/// Pixel encodings the animation format can carry. The u8 tag values are part
/// of the on-disk header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    #[default]
    Rgb565,
    Rgb888,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb565 => 2,
            PixelFormat::Rgb888 => 3,
        }
    }

    pub const fn tag(self) -> u8 {
        match self {
            PixelFormat::Rgb565 => 0,
            PixelFormat::Rgb888 => 1,
        }
    }

    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(PixelFormat::Rgb565),
            1 => Some(PixelFormat::Rgb888),
            _ => None,
        }
    }

    /// Appends one pixel in this format. RGB565 pixels are stored as
    /// little-endian u16.
    pub fn write_pixel(self, out: &mut Vec<u8>, r: u8, g: u8, b: u8) {
        match self {
            PixelFormat::Rgb565 => out.extend_from_slice(&pack_rgb565(r, g, b).to_le_bytes()),
            PixelFormat::Rgb888 => out.extend_from_slice(&[r, g, b]),
        }
    }
}

/// Legacy 5-6-5 packing. The small per-channel biases (+4, +2, +4) predate
/// this implementation and are kept so existing files reproduce bit-exactly.
pub const fn pack_rgb565(r: u8, g: u8, b: u8) -> u16 {
    let r = (31 * (r as u32 + 4)) / 255;
    let g = (63 * (g as u32 + 2)) / 255;
    let b = (31 * (b as u32 + 4)) / 255;
    ((r << 11) | (g << 5) | b) as u16
}
