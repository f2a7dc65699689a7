use criterion::{criterion_group, criterion_main, Criterion};
use lasstream::filter::{Filter, KeepZ};
use lasstream::point::Format;
use lasstream::{raw, Reader};
use std::io::Cursor;
use std::sync::Arc;

fn las_bytes(count: i32) -> Vec<u8> {
    let format = Format::new(0).unwrap();
    let raw_header = raw::Header {
        number_of_point_records: count as u32,
        x_scale_factor: 1.,
        y_scale_factor: 1.,
        z_scale_factor: 1.,
        max_x: f64::from(count),
        max_y: 100.,
        max_z: 100.,
        ..Default::default()
    };
    let mut cursor = Cursor::new(Vec::new());
    raw_header.write_to(&mut cursor).unwrap();
    for i in 0..count {
        raw::Point {
            x: i,
            y: i % 100,
            z: i % 100,
            ..Default::default()
        }
        .write_to(&mut cursor, format)
        .unwrap();
    }
    cursor.into_inner()
}

fn read(c: &mut Criterion) {
    let bytes = las_bytes(10_000);
    c.bench_function("read 10k points", |b| {
        b.iter(|| {
            let mut reader = Reader::open(Cursor::new(bytes.clone())).unwrap();
            let mut count = 0u64;
            while let Some(_point) = reader.read_point().unwrap() {
                count += 1;
            }
            assert_eq!(10_000, count);
        })
    });
}

fn read_filtered(c: &mut Criterion) {
    let bytes = las_bytes(10_000);
    c.bench_function("read 10k points, z-filtered", |b| {
        b.iter(|| {
            let mut reader = Reader::open(Cursor::new(bytes.clone())).unwrap();
            let mut filter = Filter::new();
            filter.push(KeepZ { min: 25., max: 75. });
            reader.set_filter(Arc::new(filter));
            reader.points().count()
        })
    });
}

criterion_group!(benches, read, read_filtered);
criterion_main!(benches);
