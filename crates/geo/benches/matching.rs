//! Benchmarks for grid construction and pair matching.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rowfinder_geo::{Coordinate, Feature, MatchThresholds, PairMatcher, SpatialGrid, distance_3d};

/// Parallel north-running traces spaced a few meters apart around Houston.
fn create_corridor(count: usize, points: usize) -> Vec<Feature> {
    (0..count)
        .map(|i| {
            let lon = -95.05 + (i as f64) * 0.00004;
            let coords = (0..points)
                .map(|p| Coordinate::new(29.90 + p as f64 * 0.0005, lon, 0.0))
                .collect();
            Feature::single(format!("Line {}", i), coords)
        })
        .collect()
}

fn bench_distance_3d(c: &mut Criterion) {
    let a = Coordinate::new(29.9500, -95.0500, 10.0);
    let b = Coordinate::new(29.9501, -95.0499, 12.0);

    c.bench_function("distance_3d_single", |bench| {
        bench.iter(|| distance_3d(black_box(&a), black_box(&b)))
    });
}

fn bench_grid_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_build");

    for size in [10, 100, 500].iter() {
        let features = create_corridor(*size, 50);
        group.bench_with_input(BenchmarkId::new("features", size), size, |bench, _| {
            bench.iter(|| SpatialGrid::build(black_box(&features), 0.001))
        });
    }

    group.finish();
}

fn bench_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("pair_matching");
    let matcher = PairMatcher::new(MatchThresholds::default());

    for size in [10, 100, 500].iter() {
        let features = create_corridor(*size, 50);
        let grid = SpatialGrid::build(&features, 0.001).expect("grid build");

        group.bench_with_input(BenchmarkId::new("sequential", size), size, |bench, _| {
            bench.iter(|| matcher.find_pairs_sequential(black_box(&grid)))
        });
        group.bench_with_input(BenchmarkId::new("default", size), size, |bench, _| {
            bench.iter(|| matcher.find_pairs(black_box(&grid)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_distance_3d, bench_grid_build, bench_matching);
criterion_main!(benches);
