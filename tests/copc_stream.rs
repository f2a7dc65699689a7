//! Streaming through a COPC octree index.
//!
//! The octree is synthesized directly (the entry list is public API) over
//! an uncompressed stream whose point order matches the octants'
//! cumulative positions, which is exactly the contract the index makes
//! with a real hierarchy.

mod common;

use common::las_bytes;
use lasstream::copc::{Entry, VoxelKey};
use lasstream::index::{CopcIndex, StreamOrder};
use lasstream::reader::LasSource;
use lasstream::{Bounds, Point, StreamReader};

/// Positions 0..2 belong to the root, 2..5 to the lower-left child,
/// 5..8 to the upper-right child.
fn octree_points() -> Vec<(i32, i32, i32)> {
    vec![
        (2, 2, 2),
        (6, 6, 2),
        (1, 1, 1),
        (2, 2, 1),
        (3, 3, 1),
        (5, 5, 1),
        (6, 6, 1),
        (7, 7, 1),
    ]
}

fn octree_index() -> CopcIndex {
    let root = VoxelKey::ROOT;
    let entries = vec![
        Entry {
            key: root,
            offset: 1000,
            byte_size: 100,
            point_count: 2,
        },
        Entry {
            key: root.child(0).unwrap(),
            offset: 1100,
            byte_size: 100,
            point_count: 3,
        },
        Entry {
            key: root.child(3).unwrap(),
            offset: 1200,
            byte_size: 100,
            point_count: 3,
        },
    ];
    CopcIndex::new(Bounds::new(0., 0., 0., 8., 8., 8.), 4., entries, 8)
}

fn octree_reader() -> StreamReader<LasSource<std::io::Cursor<Vec<u8>>>> {
    let source = LasSource::open(las_bytes(&octree_points())).unwrap();
    let mut reader = StreamReader::new(source);
    reader.set_copc_index(octree_index());
    reader
}

#[test]
fn default_query_streams_everything_in_octant_order() {
    let mut reader = octree_reader();
    let points: Vec<Point> = reader.points().map(|point| point.unwrap()).collect();
    assert_eq!(8, points.len());
    assert_eq!(8, reader.p_count());
    assert_eq!(2., points[0].x);
    assert_eq!(7., points[7].x);
}

#[test]
fn depth_limit_keeps_shallow_octants() {
    let mut reader = octree_reader();
    reader.set_depth_limit(0);
    assert_eq!(2, reader.points().count());
    reader.rewind().unwrap();
    reader.set_depth_limit(1);
    assert_eq!(8, reader.points().count());
}

#[test]
fn resolution_maps_to_depth() {
    let mut reader = octree_reader();
    // Root spacing is 4; asking for 5-unit resolution stays at the root.
    reader.set_resolution(5.);
    assert_eq!(2, reader.points().count());
    reader.rewind().unwrap();
    reader.set_resolution(2.);
    assert_eq!(8, reader.points().count());
}

#[test]
fn rectangle_prunes_octants_then_tests_points() {
    let mut reader = octree_reader();
    reader.inside_rectangle(0.5, 0.5, 3.5, 3.5).unwrap();
    let points: Vec<Point> = reader.points().map(|point| point.unwrap()).collect();
    // The upper-right child never gets decoded; the root's far point is
    // decoded but fails the per-point test.
    assert_eq!(4, points.len());
    assert!(points.iter().all(|point| point.x <= 3.5 && point.y <= 3.5));
}

#[test]
fn depth_and_region_compose() {
    let mut reader = octree_reader();
    reader.set_depth_limit(0);
    reader.inside_rectangle(0.5, 0.5, 3.5, 3.5).unwrap();
    let points: Vec<Point> = reader.points().map(|point| point.unwrap()).collect();
    assert_eq!(1, points.len());
    assert_eq!(2., points[0].x);
}

#[test]
fn circle_query_matches_brute_force() {
    let mut reader = octree_reader();
    reader.inside_circle(2., 2., 1.5).unwrap();
    let actual: Vec<f64> = reader
        .points()
        .map(|point| point.unwrap().x)
        .collect();
    let expected: Vec<f64> = octree_points()
        .iter()
        .filter(|&&(x, y, _)| {
            let dx = f64::from(x) - 2.;
            let dy = f64::from(y) - 2.;
            dx * dx + dy * dy < 1.5 * 1.5
        })
        .map(|&(x, _, _)| f64::from(x))
        .collect();
    assert_eq!(expected, actual);
}

#[test]
fn rewind_resets_the_interval_cursor() {
    let mut reader = octree_reader();
    assert_eq!(8, reader.points().count());
    reader.rewind().unwrap();
    assert_eq!(0, reader.p_count());
    assert_eq!(8, reader.points().count());
}

#[test]
fn stream_order_is_a_knob() {
    let mut reader = octree_reader();
    reader.set_stream_order(StreamOrder::Depth);
    assert_eq!(8, reader.points().count());
    reader.rewind().unwrap();
    reader.set_stream_order(StreamOrder::Spatial);
    assert_eq!(8, reader.points().count());
}
