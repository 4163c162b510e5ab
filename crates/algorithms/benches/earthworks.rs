//! Benchmarks for the earthworks engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use earthworks_algorithms::earthworks::{earthworks, EarthworksParams, Mode, Synthesis};
use earthworks_core::{Attractor, Grid, Region};
use earthworks_parallel::QuadtreeParams;

fn create_dem(size: usize) -> Grid {
    let region = Region::from_shape(size, size, 0.0, size as f64, 1.0, 1.0).unwrap();
    Grid::from_fn(region, |x, y| {
        let base = 0.05 * (x + y);
        let variation = ((x as usize * 7 + y as usize * 13) % 100) as f64 / 10.0;
        base + variation
    })
}

fn create_attractors(n: usize, extent: f64) -> Vec<Attractor> {
    (0..n)
        .map(|i| {
            let f = i as f64;
            Attractor::new(
                (f * 12.9898).sin().abs() * extent,
                (f * 78.233).sin().abs() * extent,
                (f * 4.1414).sin() * 2.0,
            )
        })
        .collect()
}

fn bench_segmentation(c: &mut Criterion) {
    let mut group = c.benchmark_group("earthworks");
    group.sample_size(10);

    for size in [128, 256, 512].iter() {
        let dem = create_dem(*size);
        let attractors = create_attractors(size / 2, *size as f64);

        for (label, enabled) in [("unsegmented", false), ("segmented", true)] {
            let params = EarthworksParams {
                mode: Mode::Relative,
                rate: 0.5,
                synthesis: Synthesis::Joint,
                quadtree: QuadtreeParams {
                    enabled,
                    threshold: 16,
                    min_cells: 0,
                    ..Default::default()
                },
                ..Default::default()
            };

            group.bench_with_input(BenchmarkId::new(label, size), size, |b, _| {
                b.iter(|| earthworks(black_box(&dem), black_box(&attractors), params.clone()).unwrap())
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_segmentation);
criterion_main!(benches);
