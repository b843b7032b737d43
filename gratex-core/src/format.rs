use crate::pixel::PixelFormat;

/// Byte length of the fixed header at the front of every animation file.
pub const HEADER_LEN: usize = 13;

/// On-disk header: frame count, width, height as little-endian u32, then the
/// pixel format tag byte. No magic, no padding; frame data follows directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationHeader {
    pub frame_count: u32,
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
}

impl AnimationHeader {
    /// Byte length of a single frame.
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * self.pixel_format.bytes_per_pixel()
    }

    /// Byte length of the frame data following the header.
    pub fn data_bytes(&self) -> u64 {
        self.frame_count as u64 * self.frame_bytes() as u64
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&self.frame_count.to_le_bytes());
        out[4..8].copy_from_slice(&self.width.to_le_bytes());
        out[8..12].copy_from_slice(&self.height.to_le_bytes());
        out[12] = self.pixel_format.tag();
        out
    }

    /// Returns `None` when the pixel format tag is unknown.
    pub fn decode(bytes: &[u8; HEADER_LEN]) -> Option<Self> {
        let pixel_format = PixelFormat::from_tag(bytes[12])?;
        Some(AnimationHeader {
            frame_count: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            width: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            height: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            pixel_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let header = AnimationHeader {
            frame_count: 120,
            width: 1280,
            height: 720,
            pixel_format: PixelFormat::Rgb888,
        };
        let decoded = AnimationHeader::decode(&header.encode()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn unknown_format_tag_rejected() {
        let mut bytes = AnimationHeader {
            frame_count: 1,
            width: 2,
            height: 2,
            pixel_format: PixelFormat::Rgb565,
        }
        .encode();
        bytes[12] = 7;
        assert!(AnimationHeader::decode(&bytes).is_none());
    }

    #[test]
    fn frame_bytes_follow_format() {
        let mut header = AnimationHeader {
            frame_count: 3,
            width: 100,
            height: 50,
            pixel_format: PixelFormat::Rgb565,
        };
        assert_eq!(header.frame_bytes(), 100 * 50 * 2);
        assert_eq!(header.data_bytes(), 3 * 100 * 50 * 2);
        header.pixel_format = PixelFormat::Rgb888;
        assert_eq!(header.frame_bytes(), 100 * 50 * 3);
    }
}
