//! Pipeline Benchmarks
//!
//! # Running Benchmarks
//! ```bash
//! cargo bench --package poseq-core --bench pipeline
//! ```
//!
//! # Metrics Measured
//! - End-to-end throughput (frames/second) for clean and gappy streams
//! - Temporal smoothing cost per frame

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use poseq_core::{PosePipeline, SmoothingConfig, TemporalSmoother};
use poseq_models::{
    DetectionRecord, DetectionStream, Frame, Keypoint, NamedKeypoint, Point3, SkeletonTopology,
};
use std::time::Duration;

/// Synthetic SMPL-24 stream walking across a 1080p frame, with every
/// `gap_every`-th frame dropped (0 keeps all).
fn create_stream(frame_count: usize, gap_every: usize) -> DetectionStream {
    let topology = SkeletonTopology::smpl24();
    let frames = (0..frame_count)
        .filter(|i| gap_every == 0 || i % gap_every != 0)
        .map(|i| DetectionRecord {
            frame_index: i,
            keypoints: topology
                .names()
                .iter()
                .enumerate()
                .map(|(k, name)| {
                    let x = 700.0 + i as f64 * 0.5 + (k % 5) as f64 * 25.0;
                    let y = 300.0 + k as f64 * 18.0 + (i as f64 * 0.2).sin() * 3.0;
                    NamedKeypoint::new(name.clone(), x, y, 0.0, 0.85 + (k % 3) as f64 * 0.05)
                })
                .collect(),
            mesh: None,
            camera: None,
        })
        .collect();

    DetectionStream {
        frame_count,
        fps: 30.0,
        image_width: 1920,
        image_height: 1080,
        frames,
    }
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(5));

    let pipeline = PosePipeline::smpl24();
    for frame_count in [300usize, 1800] {
        for (label, gap_every) in [("clean", 0usize), ("gappy", 9)] {
            let stream = create_stream(frame_count, gap_every);
            group.throughput(Throughput::Elements(frame_count as u64));
            group.bench_with_input(
                BenchmarkId::new(label, frame_count),
                &stream,
                |b, stream| b.iter(|| pipeline.run(black_box(stream))),
            );
        }
    }
    group.finish();
}

fn bench_smoothing(c: &mut Criterion) {
    let mut group = c.benchmark_group("smoothing");
    let smoother = TemporalSmoother::new(SmoothingConfig::default(), 0.6);
    let frames: Vec<Frame> = (0..1800)
        .map(|i| {
            let kps = (0..24)
                .map(|k| Keypoint::new(Point3::new(i as f64, k as f64 * 10.0, 0.0), 0.9))
                .collect();
            Frame::source(i, 30.0, kps)
        })
        .collect();

    group.throughput(Throughput::Elements(frames.len() as u64));
    group.bench_function("weighted_median_1800", |b| {
        b.iter(|| {
            let mut work = frames.clone();
            smoother.smooth(black_box(&mut work))
        })
    });
    group.finish();
}

criterion_group!(benches, bench_pipeline, bench_smoothing);
criterion_main!(benches);
