use boardsight_calib::{
    check_empty, cluster_lines, extract_grid, ward_centroids, GridLine, GridParams, SquareGrid,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{GrayImage, Luma};
use nalgebra::Point2;

fn checkerboard(size: u32, margin: u32) -> GrayImage {
    let step = (size - 2 * margin) / 8;
    GrayImage::from_fn(size, size, |x, y| {
        let inside = |v: u32| v >= margin && v < margin + 8 * step;
        if !inside(x) || !inside(y) {
            return Luma([128]);
        }
        let (col, row) = ((x - margin) / step, (y - margin) / step);
        Luma([if (row + col) % 2 == 0 { 230 } else { 30 }])
    })
}

fn lattice(step: f32) -> SquareGrid {
    let points = (0..9)
        .flat_map(|r| (0..9).map(move |c| Point2::new(c as f32 * step, r as f32 * step)))
        .collect();
    SquareGrid::new(9, points).expect("9x9 lattice")
}

fn bench_extract_grid(c: &mut Criterion) {
    let img = checkerboard(640, 40);
    let params = GridParams::default();
    c.bench_function("extract_grid_640", |b| {
        b.iter(|| {
            let grid = extract_grid(black_box(&img), &params)
                .expect("synthetic board should always yield a grid");
            black_box(grid)
        })
    });
}

fn bench_cluster_lines(c: &mut Criterion) {
    let lines: Vec<GridLine> = (0..40)
        .map(|k| GridLine::new(k as f32 * 16.0 + (k % 3) as f32, 0.0))
        .collect();
    c.bench_function("cluster_lines_40", |b| {
        b.iter(|| black_box(cluster_lines(black_box(&lines), 9, 10.0)))
    });
}

fn bench_ward(c: &mut Criterion) {
    let points: Vec<Point2<f32>> = (0..9)
        .flat_map(|r| {
            (0..9).flat_map(move |col| {
                let (x, y) = (col as f32 * 70.0, r as f32 * 70.0);
                [Point2::new(x, y), Point2::new(x + 1.5, y - 1.0)]
            })
        })
        .collect();
    c.bench_function("ward_162_to_81", |b| {
        b.iter(|| black_box(ward_centroids(black_box(&points), 81)))
    });
}

fn bench_emptiness(c: &mut Criterion) {
    let img = GrayImage::from_pixel(640, 640, Luma([140]));
    let grid = lattice(79.875);
    c.bench_function("check_empty_640", |b| {
        b.iter(|| black_box(check_empty(black_box(&img), &grid, 0.15)))
    });
}

criterion_group!(
    grid_timing,
    bench_extract_grid,
    bench_cluster_lines,
    bench_ward,
    bench_emptiness
);
criterion_main!(grid_timing);
