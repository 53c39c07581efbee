use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use image::{DynamicImage, Rgb, RgbImage};
use video_datasets::readers::ClipLayout;
use video_datasets::transforms::vision::{FrameDepth, MotionFilter};
use video_datasets::{ClipDataset, Dataset, SequenceDatasetConfig};

/// Benchmarks for the sampling hot path.
///
/// This measures:
/// 1. The motion filter on windows of full Ms. Pac-Man sized frames
/// 2. A full `get_batch` over serialized clips (read, crop search, collate)
///
/// To run these, use:
/// ```bash
/// cargo bench --bench motion_bench
/// ```

/// Window lengths swept by the motion filter benchmark.
const WINDOWS: [usize; 3] = [4, 10, 20];

fn frames(count: usize, height: u32, width: u32) -> Vec<DynamicImage> {
    (0..count)
        .map(|t| {
            DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
                Rgb([((x as usize + t) % 256) as u8, (y % 256) as u8, (t * 40 % 256) as u8])
            }))
        })
        .collect()
}

/// Static windows walk every pair; moving windows exit early.
fn bench_motion_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("Motion Filter");
    let filter = MotionFilter::default();

    for &len in &WINDOWS {
        let moving = frames(len, 210, 160);
        let still = vec![moving[0].clone(); len];
        group.throughput(Throughput::Elements(len as u64));

        group.bench_with_input(BenchmarkId::new("moving", len), &moving, |b, window| {
            b.iter(|| black_box(filter.has_enough_motion(window)))
        });
        group.bench_with_input(BenchmarkId::new("static", len), &still, |b, window| {
            b.iter(|| black_box(filter.has_enough_motion(window)))
        });
    }
    group.finish();
}

/// End-to-end batch assembly from serialized clips on disk.
fn bench_clip_batches(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("temp dir");
    let layout = ClipLayout {
        sequence_length: 30,
        height: 120,
        width: 160,
        depth: FrameDepth::Rgb,
    };
    for i in 0..8 {
        let bytes: Vec<u8> = frames(layout.sequence_length, layout.height, layout.width)
            .iter()
            .flat_map(|frame| frame.as_bytes().to_vec())
            .collect();
        std::fs::write(dir.path().join(format!("v_{:02}.seq", i)), bytes).expect("write clip");
    }

    let config = SequenceDatasetConfig::builder()
        .input_seq_length(5)
        .target_seq_length(5)
        .crop_size(64, 64)
        .repetitions_per_epoch(64)
        .seed(0)
        .build();
    let mut dataset = ClipDataset::from_dir(dir.path(), None, layout, config).expect("dataset");

    c.bench_function("clip get_batch(8)", |b| {
        b.iter(|| black_box(dataset.get_batch(8).expect("batch")))
    });
}

criterion_group!(benches, bench_motion_filter, bench_clip_batches);
criterion_main!(benches);
