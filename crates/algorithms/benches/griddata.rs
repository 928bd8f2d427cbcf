//! Benchmarks for raster-to-point interpolation

use coastmesh_algorithms::interpolation::{Griddata, InterpolationMethod};
use coastmesh_core::{GeoTransform, Point, Raster, RasterHandle};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

fn create_raster(size: usize) -> RasterHandle {
    let mut dem = Raster::new(size, size);
    dem.set_transform(GeoTransform::new(0.0, size as f64 * 10.0, 10.0, -10.0));

    for row in 0..size {
        for col in 0..size {
            let base = (row + col) as f32;
            let variation = ((row * 7 + col * 13) % 100) as f32 / 10.0;
            dem.set(row, col, base + variation).unwrap();
        }
    }
    RasterHandle::from_raster(dem).unwrap()
}

fn create_points(size: usize, n: usize) -> Vec<Point> {
    let extent = size as f64 * 10.0;
    (0..n)
        .map(|i| {
            let t = i as f64 / n as f64;
            Point {
                x: extent * (0.05 + 0.9 * ((t * 37.0).fract())),
                y: extent * (0.05 + 0.9 * ((t * 53.0).fract())),
            }
        })
        .collect()
}

fn bench_methods(c: &mut Criterion) {
    let mut group = c.benchmark_group("griddata");
    let size = 1024;
    let points = create_points(size, 20_000);

    for method in [
        InterpolationMethod::Average,
        InterpolationMethod::BilskieAveraging,
        InterpolationMethod::InverseDistanceWeighted,
        InterpolationMethod::AverageNearestN,
    ] {
        let mut grid = Griddata::new(points.clone(), vec![60.0; points.len()]).unwrap();
        grid.set_raster(create_raster(size));
        grid.set_methods(method);
        grid.set_filters(if method.is_point_count() { 16.0 } else { 1.0 });

        group.bench_with_input(BenchmarkId::from_parameter(method), &method, |b, _| {
            b.iter(|| black_box(grid.compute_values(false).unwrap()))
        });
    }

    group.finish();
}

fn bench_directional(c: &mut Criterion) {
    let size = 512;
    let points = create_points(size, 2_000);
    let mut grid = Griddata::new(points.clone(), vec![60.0; points.len()]).unwrap();
    grid.set_raster(create_raster(size));
    grid.params_mut().directional.radius = 500.0;

    c.bench_function("directional", |b| {
        b.iter(|| black_box(grid.compute_directional(false).unwrap()))
    });
}

criterion_group!(benches, bench_methods, bench_directional);
criterion_main!(benches);
