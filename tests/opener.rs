//! Multi-file policy: merged streams, buffered neighbors, file lists.

mod common;

use common::las_bytes;
use lasstream::opener::FileSpec;
use lasstream::{Opener, Point};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// A scratch directory that cleans up after itself.
struct Scratch(PathBuf);

impl Scratch {
    fn new(name: &str) -> Scratch {
        let dir = std::env::temp_dir().join(format!(
            "lasstream-{name}-{}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        Scratch(dir)
    }

    fn write_las(&self, name: &str, points: &[(i32, i32, i32)]) -> PathBuf {
        let path = self.0.join(name);
        fs::write(&path, las_bytes(points).into_inner()).unwrap();
        path
    }

    fn write_text(&self, name: &str, text: &str) -> PathBuf {
        let path = self.0.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
        path
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

#[test]
fn one_reader_per_file() {
    let scratch = Scratch::new("per-file");
    let a = scratch.write_las("a.las", &[(0, 0, 0), (1, 0, 0)]);
    let b = scratch.write_las("b.las", &[(2, 0, 0)]);

    let mut opener = Opener::new();
    opener.add_file(a);
    opener.add_file(b);

    let mut counts = Vec::new();
    while let Some(mut reader) = opener.open_next().unwrap() {
        counts.push(reader.points().count());
    }
    assert_eq!(vec![2, 1], counts);
}

#[test]
fn merged_mode_is_one_transparent_stream() {
    let scratch = Scratch::new("merged");
    let a = scratch.write_las("a.las", &[(0, 0, 0), (1, 0, 0)]);
    let b = scratch.write_las("b.las", &[(2, 0, 0), (3, 0, 0)]);

    let mut opener = Opener::new();
    opener.add_file(a);
    opener.add_file(b);
    opener.set_merged(true);

    let mut reader = opener.open_next().unwrap().unwrap();
    assert_eq!(4, reader.header().number_of_points);
    let xs: Vec<f64> = reader.points().map(|point| point.unwrap().x).collect();
    assert_eq!(vec![0., 1., 2., 3.], xs);
    assert!(opener.open_next().unwrap().is_none());
}

#[test]
fn list_file_drives_the_batch() {
    let scratch = Scratch::new("list");
    let a = scratch.write_las("a.las", &[(0, 0, 0)]);
    let b = scratch.write_las("b.las", &[(10, 0, 0), (11, 0, 0)]);
    let list = scratch.write_text(
        "tiles.txt",
        &format!(
            "# a comment\n{}\n1,2,9.0,-1.0,12.0,1.0,{}  \n",
            a.display(),
            b.display()
        ),
    );

    let mut opener = Opener::new();
    opener.add_list(&list).unwrap();
    assert_eq!(2, opener.files().len());
    assert_eq!(None, opener.files()[0].rect);
    assert!(opener.files()[1].rect.is_some());
    assert_eq!(Some(2), opener.files()[1].number_of_points);

    let mut counts = Vec::new();
    while let Some(mut reader) = opener.open_next().unwrap() {
        counts.push(reader.points().count());
    }
    assert_eq!(vec![1, 2], counts);
}

#[test]
fn buffered_mode_streams_neighbor_context() {
    let scratch = Scratch::new("buffered");
    // Three 10-wide tiles in a row; the middle one is the interesting one.
    let left = scratch.write_las("left.las", &[(5, 5, 0), (9, 5, 0)]);
    let middle = scratch.write_las("middle.las", &[(15, 5, 0)]);
    let right = scratch.write_las("right.las", &[(21, 5, 0), (29, 5, 0)]);

    let mut opener = Opener::new();
    for (path, min_x) in [(&left, 0.), (&middle, 10.), (&right, 20.)] {
        opener.add_spec(FileSpec {
            path: path.clone(),
            id: None,
            number_of_points: None,
            rect: Some(lasstream::index::Rect::new(min_x, 0., min_x + 10., 10.)),
        });
    }
    opener.set_buffer_distance(2.).unwrap();

    // First reader: the left tile plus its only neighbor, the middle tile.
    let mut reader = opener.open_next().unwrap().unwrap();
    let xs: Vec<f64> = reader.points().map(|point| point.unwrap().x).collect();
    // Buffered AOI is [-2, 12] x [-2, 12]: both left points, no middle.
    assert_eq!(vec![5., 9.], xs);

    // Second reader: the middle tile with both neighbors' context.
    let mut reader = opener.open_next().unwrap().unwrap();
    let mut xs: Vec<f64> = reader.points().map(|point| point.unwrap().x).collect();
    xs.sort_by(f64::total_cmp);
    // Buffered AOI is [8, 22] x [-2, 12]: the middle point plus one point
    // of context from each side.
    assert_eq!(vec![9., 15., 21.], xs);
}

#[test]
fn explicit_aoi_wins_over_buffered_rect() {
    let scratch = Scratch::new("aoi-wins");
    let a = scratch.write_las("a.las", &[(0, 0, 0), (5, 0, 0)]);
    let b = scratch.write_las("b.las", &[(10, 0, 0)]);

    let mut opener = Opener::new();
    opener.add_spec(FileSpec {
        path: a,
        id: None,
        number_of_points: None,
        rect: Some(lasstream::index::Rect::new(0., -1., 6., 1.)),
    });
    opener.add_spec(FileSpec {
        path: b,
        id: None,
        number_of_points: None,
        rect: Some(lasstream::index::Rect::new(9., -1., 11., 1.)),
    });
    opener.set_buffer_distance(100.).unwrap();
    opener.set_inside_rectangle(4., -1., 20., 1.).unwrap();

    let mut reader = opener.open_next().unwrap().unwrap();
    let mut xs: Vec<f64> = reader.points().map(|point| point.unwrap().x).collect();
    xs.sort_by(f64::total_cmp);
    assert_eq!(vec![5., 10.], xs);
}

#[test]
fn chains_are_shared_across_readers() {
    use lasstream::mutate::{Mutator, SetPointSource};
    use std::sync::Arc;

    let scratch = Scratch::new("shared-chains");
    let a = scratch.write_las("a.las", &[(0, 0, 0)]);
    let b = scratch.write_las("b.las", &[(1, 0, 0)]);

    let mut mutator = Mutator::new();
    mutator.push(SetPointSource(7));
    let mutator = Arc::new(mutator);

    let mut opener = Opener::new();
    opener.add_file(a);
    opener.add_file(b);
    opener.set_mutator(mutator.clone());

    let mut points: Vec<Point> = Vec::new();
    while let Some(mut reader) = opener.open_next().unwrap() {
        points.extend(reader.points().map(|point| point.unwrap()));
    }
    assert_eq!(2, points.len());
    assert!(points.iter().all(|point| point.point_source_id == 7));
}
