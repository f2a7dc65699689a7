//! Helpers for synthesizing in-memory las streams.
#![allow(dead_code)]

use lasstream::point::Format;
use lasstream::{raw, Reader};
use std::io::Cursor;

/// Writes a format-0 las stream with unit scale and the given raw
/// coordinates, bounds derived from the points.
pub fn las_bytes(points: &[(i32, i32, i32)]) -> Cursor<Vec<u8>> {
    las_bytes_with(points, |_, _| {})
}

/// Like [las_bytes], but lets the caller doctor each raw point (index,
/// point) before it is written.
pub fn las_bytes_with<F>(points: &[(i32, i32, i32)], mut doctor: F) -> Cursor<Vec<u8>>
where
    F: FnMut(usize, &mut raw::Point),
{
    let format = Format::new(0).unwrap();
    let raw_header = raw::Header {
        number_of_point_records: points.len() as u32,
        x_scale_factor: 1.,
        y_scale_factor: 1.,
        z_scale_factor: 1.,
        min_x: points.iter().map(|p| p.0).min().unwrap_or(0).into(),
        max_x: points.iter().map(|p| p.0).max().unwrap_or(0).into(),
        min_y: points.iter().map(|p| p.1).min().unwrap_or(0).into(),
        max_y: points.iter().map(|p| p.1).max().unwrap_or(0).into(),
        min_z: points.iter().map(|p| p.2).min().unwrap_or(0).into(),
        max_z: points.iter().map(|p| p.2).max().unwrap_or(0).into(),
        ..Default::default()
    };
    let mut cursor = Cursor::new(Vec::new());
    raw_header.write_to(&mut cursor).unwrap();
    for (index, &(x, y, z)) in points.iter().enumerate() {
        let mut raw_point = raw::Point {
            x,
            y,
            z,
            ..Default::default()
        };
        doctor(index, &mut raw_point);
        raw_point.write_to(&mut cursor, format).unwrap();
    }
    cursor.set_position(0);
    cursor
}

/// Opens a reader over a synthetic stream.
pub fn reader_over(points: &[(i32, i32, i32)]) -> Reader {
    Reader::open(las_bytes(points)).unwrap()
}
