//! Benchmarks for recovery targets and recovery metrics.
//!
//! Run with: cargo bench --package spectral-recovery --bench metrics_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use geo::{LineString, Polygon};
use ndarray::Array3;
use spectral_recovery::{
    compute_metrics, compute_recovery_target, focal_mean, HistoricAverageTarget, MedianTarget,
    Metric, MetricParams, RasterStack, RecoveryTarget, ReferencePolygon, Site, TargetScale,
    TargetStrategy, WindowSpec, WindowedTarget,
};
use test_utils::{annual_dates, create_radial_recovery_stack, grid::GridSpec};

const PRE_YEARS: usize = 5;
const POST_YEARS: usize = 10;

fn grid(size: usize) -> GridSpec {
    GridSpec {
        rows: size,
        cols: size,
        top: size as f64,
        left: 0.0,
        cell_size: 1.0,
    }
}

fn radial_stack(bands: usize, size: usize) -> RasterStack {
    let spec = grid(size);
    RasterStack::new(
        create_radial_recovery_stack(bands, PRE_YEARS, POST_YEARS, size, size),
        (0..bands).map(|b| format!("B{}", b + 1)).collect(),
        annual_dates(2000, PRE_YEARS + 1 + POST_YEARS),
        spec.y(),
        spec.x(),
    )
    .unwrap()
}

/// Site covering all but a 4-cell margin of the grid.
fn inner_site(size: usize) -> Site {
    let ring = grid(size).cell_rect((4, size - 5), (4, size - 5)).to_vec();
    let polygon = Polygon::new(LineString::from(ring), vec![]);
    Site::single(ReferencePolygon::new("site", polygon), 2000, 2004).unwrap()
}

// =============================================================================
// FOCAL MEAN BENCHMARKS
// =============================================================================

fn bench_focal_mean(c: &mut Criterion) {
    let mut group = c.benchmark_group("focal_mean");

    for size in [64, 256, 512] {
        let data = Array3::from_shape_fn((1, size, size), |(_, r, c)| (r * size + c) as f64);
        group.throughput(Throughput::Elements((size * size) as u64));

        for n in [3, 7] {
            let spec = WindowSpec::new(n, false).unwrap();
            group.bench_with_input(
                BenchmarkId::new(format!("n{}", n), size),
                &data,
                |b, data| {
                    b.iter(|| focal_mean(black_box(data), black_box(&spec)));
                },
            );
        }
    }

    group.finish();
}

// =============================================================================
// RECOVERY TARGET BENCHMARKS
// =============================================================================

fn bench_recovery_target(c: &mut Criterion) {
    let mut group = c.benchmark_group("recovery_target");

    let strategies = [
        (
            "median_polygon",
            TargetStrategy::Median(MedianTarget::new(TargetScale::Polygon)),
        ),
        (
            "median_pixel",
            TargetStrategy::Median(MedianTarget::new(TargetScale::Pixel)),
        ),
        (
            "windowed_3",
            TargetStrategy::Windowed(WindowedTarget::new(3, false).unwrap()),
        ),
        (
            "historic_average",
            TargetStrategy::HistoricAverage(HistoricAverageTarget::new()),
        ),
    ];

    for size in [64, 256] {
        let stack = radial_stack(2, size);
        let site = inner_site(size);

        for (name, strategy) in &strategies {
            group.bench_with_input(BenchmarkId::new(*name, size), &stack, |b, stack| {
                b.iter(|| compute_recovery_target(black_box(stack), &site, strategy).unwrap());
            });
        }
    }

    group.finish();
}

// =============================================================================
// METRIC BENCHMARKS
// =============================================================================

fn bench_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("metrics");
    let params = MetricParams::new(2005).with_rest_end(2015);

    for size in [64, 256, 512] {
        let stack = radial_stack(2, size);
        let target = RecoveryTarget::per_band(vec!["B1".into(), "B2".into()], vec![100.0, 110.0])
            .unwrap();
        group.throughput(Throughput::Elements((2 * size * size) as u64));

        for metric in Metric::ALL {
            group.bench_with_input(BenchmarkId::new(metric.name(), size), &stack, |b, stack| {
                b.iter(|| compute_metrics(black_box(stack), Some(&target), &[metric], &params).unwrap());
            });
        }

        group.bench_with_input(BenchmarkId::new("all", size), &stack, |b, stack| {
            b.iter(|| compute_metrics(black_box(stack), Some(&target), &Metric::ALL, &params).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_focal_mean, bench_recovery_target, bench_metrics);

criterion_main!(benches);
