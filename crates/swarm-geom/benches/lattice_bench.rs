use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::DVec3;
use swarm_geom::{decompose_boxes, Bounds, BoxExtractor, LatticeSpacing, TriangleMesh, TwelveTriangleBoxes};

/// A 20 x 20 grid of 1 m x 1 m x 10 m columns, like a voxelised forest.
fn column_field() -> Vec<Bounds> {
    let mut boxes = Vec::new();
    for i in 0..20 {
        for j in 0..20 {
            let min = DVec3::new(f64::from(i) * 3.0, f64::from(j) * 3.0, 0.0);
            boxes.push(Bounds::from_min_max(min, min + DVec3::new(1.0, 1.0, 10.0)));
        }
    }
    boxes
}

fn bench_decompose_boxes(c: &mut Criterion) {
    let boxes = column_field();
    let spacing = LatticeSpacing::new(0.45, 1.0).unwrap();

    c.bench_function("decompose_boxes", |b| {
        b.iter(|| black_box(decompose_boxes(black_box(&boxes), spacing).unwrap()))
    });
}

fn bench_extract_boxes(c: &mut Criterion) {
    let mesh = TriangleMesh::from_boxes(&column_field());
    let extractor = TwelveTriangleBoxes::default();

    c.bench_function("extract_boxes", |b| {
        b.iter(|| black_box(extractor.extract(black_box(&mesh)).unwrap()))
    });
}

fn bench_parse_binary_stl(c: &mut Criterion) {
    let bytes = TriangleMesh::from_boxes(&column_field()).to_stl_binary();

    c.bench_function("parse_binary_stl", |b| {
        b.iter(|| black_box(TriangleMesh::from_stl_bytes(black_box(&bytes)).unwrap()))
    });
}

criterion_group!(benches, bench_decompose_boxes, bench_extract_boxes, bench_parse_binary_stl);
criterion_main!(benches);
