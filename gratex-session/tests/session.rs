//! Directory-of-gratings sessions on an in-memory device.

use std::fs;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use gratex_core::{GratingSpec, Modulation, PixelFormat, SweepAxis, Waveform};
use gratex_display::{MemoryDevice, NullFeedback, Screen, signal_channel};
use gratex_render::encode_sweep;
use gratex_session::{
    OrderPolicy, PresentationLog, SessionConfig, export_results, hashed_order, run_on_trigger,
    run_ordered,
};
use tempfile::TempDir;

static CLAIM_GATE: Mutex<()> = Mutex::new(());

fn claim_lock() -> MutexGuard<'static, ()> {
    CLAIM_GATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn base_spec() -> GratingSpec {
    GratingSpec {
        duration_secs: 0.05,
        angle_deg: 0.0,
        spatial_freq: 0.1,
        temporal_freq: 0.0,
        contrast: 1.0,
        background: 127,
        resolution: (80, 80),
        waveform: Waveform::Sine,
        modulation: Modulation::FullField,
        pixel_format: PixelFormat::Rgb565,
    }
}

fn build_set(dir: &std::path::Path) -> Vec<String> {
    let axis = SweepAxis::Angles(vec![0.0, 45.0, 90.0]);
    let written = encode_sweep(dir, &base_spec(), &axis, 60.0).unwrap();
    written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn ordered_session_plays_the_whole_set_in_hash_order() {
    let _gate = claim_lock();
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("set");
    let names = build_set(&dir);

    let config = SessionConfig {
        dir: dir.clone(),
        stimulus_type: "grating".into(),
        order: OrderPolicy::Hashed,
        trial_interval: Duration::ZERO,
    };
    let mut screen = Screen::open(MemoryDevice::new(80, 80, PixelFormat::Rgb565), 127).unwrap();
    let (_source, mut port) = signal_channel();
    let log_path = tmp.path().join("logs/run.log");
    let mut log = PresentationLog::open(&log_path).unwrap();

    let outcome = run_ordered(&mut screen, &config, &mut port, &mut NullFeedback, Some(&mut log))
        .unwrap();

    assert!(!outcome.aborted);
    assert_eq!(outcome.presentations.len(), 3);

    // scan_animations sorts by name, so the session order is the hash
    // permutation of the sorted set.
    let mut sorted = names.clone();
    sorted.sort();
    let expected: Vec<&String> = hashed_order(&sorted).into_iter().map(|i| &sorted[i]).collect();
    let shown: Vec<&String> = outcome
        .presentations
        .iter()
        .map(|p| &p.identifier)
        .collect();
    assert_eq!(shown, expected);

    let log_text = fs::read_to_string(&log_path).unwrap();
    assert_eq!(log_text.lines().count(), 3);
    assert!(log_text.lines().all(|l| l.starts_with("grating\t")));

    let results = tmp.path().join("results.json");
    export_results(&results, &outcome.presentations).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&results).unwrap()).unwrap();
    assert_eq!(value.as_array().unwrap().len(), 3);

    screen.close().unwrap();
}

#[test]
fn empty_directory_is_rejected() {
    let _gate = claim_lock();
    let tmp = TempDir::new().unwrap();
    let config = SessionConfig {
        dir: tmp.path().to_path_buf(),
        stimulus_type: "grating".into(),
        order: OrderPolicy::Hashed,
        trial_interval: Duration::ZERO,
    };
    let mut screen = Screen::open(MemoryDevice::new(80, 80, PixelFormat::Rgb565), 127).unwrap();
    let (_source, mut port) = signal_channel();

    let err = run_ordered(&mut screen, &config, &mut port, &mut NullFeedback, None).unwrap_err();
    assert!(matches!(err, gratex_core::GratexError::Validation(_)));
}

#[test]
fn triggered_session_cycles_until_abort() {
    let _gate = claim_lock();
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("set");
    build_set(&dir);

    let config = SessionConfig {
        dir,
        stimulus_type: "grating".into(),
        order: OrderPolicy::Hashed,
        trial_interval: Duration::ZERO,
    };
    let mut screen = Screen::open(MemoryDevice::new(80, 80, PixelFormat::Rgb565), 127).unwrap();
    let (source, mut port) = signal_channel();

    let operator = thread::spawn(move || {
        for _ in 0..4 {
            thread::sleep(Duration::from_millis(20));
            source.edge(2);
        }
        thread::sleep(Duration::from_millis(20));
        source.abort();
    });

    let outcome = run_on_trigger(&mut screen, &config, 2, &mut port, &mut NullFeedback, None)
        .unwrap();
    operator.join().unwrap();

    assert!(outcome.aborted);
    assert!(!outcome.presentations.is_empty());
    assert!(outcome.presentations.len() <= 4);
}
