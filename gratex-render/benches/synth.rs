use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use gratex_core::{GratingSpec, Modulation, PixelFormat, Waveform};
use gratex_render::{drift_geometry, FramePainter};

fn harness(waveform: Waveform, modulation: Modulation) -> (FramePainter, Vec<u8>) {
    let spec = GratingSpec {
        duration_secs: 1.0,
        angle_deg: 135.0,
        spatial_freq: 0.2,
        temporal_freq: 2.0,
        contrast: 1.0,
        background: 127,
        resolution: (1280, 720),
        waveform,
        modulation,
        pixel_format: PixelFormat::Rgb565,
    };
    let geometry = drift_geometry(&spec, 60.0).unwrap();
    let painter = FramePainter::new(&spec, geometry);
    let out = vec![0u8; painter.frame_len()];
    (painter, out)
}

pub fn bench_paint_frame(c: &mut Criterion) {
    let mut g = c.benchmark_group("synthesis");
    g.sample_size(40);

    g.bench_function("sine_gabor_720p", |b| {
        b.iter_batched(
            || {
                harness(
                    Waveform::Sine,
                    Modulation::Gabor {
                        sigma_pct: 12.5,
                        center_left_pct: 50.0,
                        center_top_pct: 50.0,
                    },
                )
            },
            |(painter, mut out)| {
                painter.paint_into(black_box(3), &mut out);
                black_box(&out);
            },
            BatchSize::SmallInput,
        )
    });

    g.bench_function("square_masked_720p", |b| {
        b.iter_batched(
            || {
                harness(
                    Waveform::Square,
                    Modulation::CircularMask {
                        diameter_pct: 50.0,
                        center_left_pct: 50.0,
                        center_top_pct: 50.0,
                        fade_pct: 5.0,
                    },
                )
            },
            |(painter, mut out)| {
                painter.paint_into(black_box(3), &mut out);
                black_box(&out);
            },
            BatchSize::SmallInput,
        )
    });

    g.finish();
}

criterion_group!(benches, bench_paint_frame);
criterion_main!(benches);
