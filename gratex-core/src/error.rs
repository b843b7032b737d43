use std::path::PathBuf;

use thiserror::Error;

use crate::pixel::PixelFormat;

pub type GratexResult<T> = Result<T, GratexError>;

/// Error taxonomy for the whole engine. Validation failures are raised before
/// any device or file I/O; operator aborts are not errors and never appear here.
#[derive(Debug, Error)]
pub enum GratexError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("display device is already claimed by a live surface")]
    SurfaceBusy,

    #[error("operation on a closed surface")]
    SurfaceClosed,

    #[error(
        "sequence is {sequence_width}x{sequence_height} but surface is {surface_width}x{surface_height}"
    )]
    GeometryMismatch {
        sequence_width: u32,
        sequence_height: u32,
        surface_width: u32,
        surface_height: u32,
    },

    #[error("sequence pixel format is {sequence:?} but surface expects {surface:?}")]
    PixelFormatMismatch {
        sequence: PixelFormat,
        surface: PixelFormat,
    },

    #[error("{}: expected {expected} bytes, found {actual}", .path.display())]
    StreamLength {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("{}: {reason}", .path.display())]
    MalformedHeader { path: PathBuf, reason: String },

    #[error("could not {op} {}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("display device {op} failed")]
    Device {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("could not serialize session results")]
    Results(#[from] serde_json::Error),
}

impl GratexError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    pub fn device(op: &'static str, source: std::io::Error) -> Self {
        Self::Device { op, source }
    }

    pub fn malformed_header(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedHeader {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_carries_context() {
        let err = GratexError::validation("contrast must lie in [0, 1], got 1.5");
        assert_eq!(
            err.to_string(),
            "validation error: contrast must lie in [0, 1], got 1.5"
        );
    }

    #[test]
    fn geometry_mismatch_reports_both_shapes() {
        let err = GratexError::GeometryMismatch {
            sequence_width: 640,
            sequence_height: 480,
            surface_width: 1280,
            surface_height: 720,
        };
        assert_eq!(
            err.to_string(),
            "sequence is 640x480 but surface is 1280x720"
        );
    }

    #[test]
    fn stream_length_reports_expected_and_actual() {
        let err = GratexError::StreamLength {
            path: PathBuf::from("clip.raw"),
            expected: 1_000,
            actual: 998,
        };
        assert_eq!(err.to_string(), "clip.raw: expected 1000 bytes, found 998");
    }

    #[test]
    fn io_error_keeps_source() {
        use std::error::Error as _;
        let err = GratexError::io(
            "read",
            "missing.anim",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.to_string(), "could not read missing.anim");
        assert!(err.source().is_some());
    }
}
