//! Encoder tests: spec -> disk -> header/bytes read back with plain std::fs.

use std::fs;
use std::path::Path;

use gratex_core::{
    AnimationHeader, GratexError, GratingSpec, HEADER_LEN, Modulation, PixelFormat, SweepAxis,
    Waveform,
};
use gratex_render::{encode_grating, encode_sweep};
use tempfile::TempDir;

fn scenario_spec() -> GratingSpec {
    GratingSpec {
        duration_secs: 2.0,
        angle_deg: 90.0,
        spatial_freq: 0.1,
        temporal_freq: 0.5,
        contrast: 1.0,
        background: 127,
        resolution: (100, 100),
        waveform: Waveform::Square,
        modulation: Modulation::FullField,
        pixel_format: PixelFormat::Rgb565,
    }
}

fn read_header(path: &Path) -> AnimationHeader {
    let bytes = fs::read(path).expect("read encoded file");
    let mut head = [0u8; HEADER_LEN];
    head.copy_from_slice(&bytes[..HEADER_LEN]);
    AnimationHeader::decode(&head).expect("valid header")
}

#[test]
fn two_second_square_grating_encodes_120_frames() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("square90");

    let header = encode_grating(&path, &scenario_spec(), 60.0).unwrap();
    assert_eq!(header.frame_count, 120);
    assert_eq!((header.width, header.height), (100, 100));
    assert_eq!(header.pixel_format, PixelFormat::Rgb565);

    let bytes = fs::read(&path).unwrap();
    assert_eq!(bytes.len(), HEADER_LEN + 120 * 100 * 100 * 2);
    assert_eq!(read_header(&path), header);

    // Square wave at full contrast: both extremes present in the frame data.
    let data = &bytes[HEADER_LEN..];
    assert!(data.contains(&0x00));
    assert!(data.contains(&0xFF));
}

#[test]
fn validation_fails_before_any_file_exists() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("never-written");
    let mut spec = scenario_spec();
    spec.contrast = 1.5;

    let err = encode_grating(&path, &spec, 60.0).unwrap_err();
    assert!(matches!(err, GratexError::Validation(_)));
    assert!(!path.exists());
}

#[test]
fn sub_pixel_wavelength_fails_before_any_file_exists() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("never-written");
    let mut spec = scenario_spec();
    spec.spatial_freq = 5.0;

    assert!(encode_grating(&path, &spec, 60.0).is_err());
    assert!(!path.exists());
}

#[test]
fn parent_directories_are_created() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("set_a/nested/square90");

    encode_grating(&path, &scenario_spec(), 60.0).unwrap();
    assert!(path.exists());
}

#[test]
fn sweep_writes_one_file_per_value() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("angles");
    let axis = SweepAxis::Angles(vec![0.0, 45.0, 90.0]);

    let written = encode_sweep(&dir, &scenario_spec(), &axis, 60.0).unwrap();
    assert_eq!(written.len(), 3);
    for (path, name) in written.iter().zip(["0", "45", "90"]) {
        assert_eq!(path.file_name().unwrap(), name);
        let header = read_header(path);
        assert_eq!(header.frame_count, 120);
    }
}

#[test]
fn empty_sweep_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let axis = SweepAxis::Contrasts(Vec::new());
    assert!(encode_sweep(&tmp.path().join("none"), &scenario_spec(), &axis, 60.0).is_err());
}
