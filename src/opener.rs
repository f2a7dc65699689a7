//! Resolves file names to configured readers.
//!
//! The [Opener] is where multi-file policy lives: merged streams, buffered
//! neighbor selection through the rectangle kd-tree, and the
//! COPC-before-legacy-index preference. Everything per-point -- the shared
//! ignore/filter/mutate chains, the area of interest, depth limits -- is
//! configured once on the opener and wired into every reader it produces.
//!
//! ```no_run
//! use lasstream::Opener;
//! # use lasstream::Result;
//! # fn example() -> Result<()> {
//! let mut opener = Opener::new();
//! opener.add_file("tile_1.las");
//! opener.add_file("tile_2.las");
//! while let Some(mut reader) = opener.open_next()? {
//!     while let Some(point) = reader.read_point()? {
//!         // ...
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use crate::index::{CopcIndex, RangeIndex, Rect, RectTree, RectTreeBuilder, StreamOrder};
use crate::reader::{
    source_from, AdjustedSource, Adjustment, ForwardSeek, MergedSource, PointSource, Reader,
    StreamReader,
};
use crate::{Error, Filter, Ignore, Mutator, Result, Vector};
use log::warn;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One input file, with whatever the file list knew about it.
#[derive(Clone, Debug)]
pub struct FileSpec {
    /// The file name, or "-" for stdin.
    pub path: PathBuf,
    /// The file's ID, when the list carried one.
    pub id: Option<u32>,
    /// The file's point count, when the list carried one.
    pub number_of_points: Option<u64>,
    /// The file's xy bounding rectangle, when the list carried one.
    ///
    /// Files with a rectangle participate in spatial pre-filtering; files
    /// without one are treated as potential neighbors of everything.
    pub rect: Option<Rect>,
}

impl FileSpec {
    /// Creates a spec holding only a file name.
    pub fn from_path<P: Into<PathBuf>>(path: P) -> FileSpec {
        FileSpec {
            path: path.into(),
            id: None,
            number_of_points: None,
            rect: None,
        }
    }

    /// Parses one line of the rectangle-list format.
    ///
    /// Three forms are accepted, trailing whitespace trimmed:
    ///
    /// ```text
    /// file_name
    /// ID,file_name
    /// ID,npoints,min_x,min_y,max_x,max_y,file_name
    /// ```
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::opener::FileSpec;
    /// let spec = FileSpec::parse("17,1200,0.0,0.0,100.0,100.0,tile_17.las").unwrap();
    /// assert_eq!(Some(17), spec.id);
    /// assert_eq!(Some(1200), spec.number_of_points);
    /// assert!(spec.rect.is_some());
    /// ```
    pub fn parse(line: &str) -> Result<FileSpec> {
        let line = line.trim_end();
        let fields: Vec<&str> = line.split(',').collect();
        let invalid = || Error::InvalidFileSpec(line.to_string());
        match fields.len() {
            1 if !fields[0].is_empty() => Ok(FileSpec::from_path(fields[0])),
            2 => Ok(FileSpec {
                path: PathBuf::from(fields[1]),
                id: Some(fields[0].trim().parse().map_err(|_| invalid())?),
                number_of_points: None,
                rect: None,
            }),
            7 => {
                let number = |index: usize| -> Result<f64> {
                    fields[index].trim().parse().map_err(|_| invalid())
                };
                Ok(FileSpec {
                    path: PathBuf::from(fields[6]),
                    id: Some(fields[0].trim().parse().map_err(|_| invalid())?),
                    number_of_points: Some(fields[1].trim().parse().map_err(|_| invalid())?),
                    rect: Some(Rect::new(number(2)?, number(3)?, number(4)?, number(5)?)),
                })
            }
            _ => Err(invalid()),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Aoi {
    Tile { ll_x: f64, ll_y: f64, size: f64 },
    Circle { x: f64, y: f64, radius: f64 },
    Rectangle { min_x: f64, min_y: f64, max_x: f64, max_y: f64 },
}

/// Resolves input files to configured [Reader]s, one per call (or one for
/// the whole batch in merged mode).
#[allow(missing_debug_implementations)]
#[derive(Default)]
pub struct Opener {
    files: Vec<FileSpec>,
    merged: bool,
    buffer: Option<f64>,
    aoi: Option<Aoi>,
    depth_limit: Option<i32>,
    resolution: Option<f64>,
    order: StreamOrder,
    raw_chunk_order: bool,
    filter: Option<Arc<Filter>>,
    mutator: Option<Arc<Mutator>>,
    ignore: Option<Arc<Ignore>>,
    index: Option<RangeIndex>,
    adjustment: Adjustment,
    neighbors: Option<RectTree>,
    current: usize,
}

impl Opener {
    /// Creates an opener with no inputs.
    pub fn new() -> Opener {
        Opener::default()
    }

    /// Appends one input file.
    ///
    /// Pass "-" to read from stdin (forward-only: no evlrs, no seeking).
    pub fn add_file<P: Into<PathBuf>>(&mut self, path: P) {
        self.add_spec(FileSpec::from_path(path));
    }

    /// Appends one input file with its list metadata.
    pub fn add_spec(&mut self, spec: FileSpec) {
        self.files.push(spec);
        self.neighbors = None;
    }

    /// Appends every file named by a rectangle-list file.
    ///
    /// Empty lines and lines starting with '#' are skipped.
    pub fn add_list<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let read = BufReader::new(File::open(path)?);
        for line in read.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            self.add_spec(FileSpec::parse(&line)?);
        }
        Ok(())
    }

    /// The input files.
    pub fn files(&self) -> &[FileSpec] {
        &self.files
    }

    /// Requests one composite reader presenting all files as one stream.
    pub fn set_merged(&mut self, merged: bool) {
        self.merged = merged;
    }

    /// Requests neighbor buffering: each file is read together with the
    /// points of every file whose rectangle is within `distance` of its
    /// own.
    ///
    /// Buffering needs something to buffer against, so a single input is
    /// rejected eagerly.
    pub fn set_buffer_distance(&mut self, distance: f64) -> Result<()> {
        if self.files.len() < 2 {
            return Err(Error::BufferWithoutNeighbors);
        }
        if !(distance >= 0.) {
            return Err(Error::InvalidAreaOfInterest(format!(
                "buffer distance must be non-negative, got {distance}"
            )));
        }
        self.buffer = Some(distance);
        Ok(())
    }

    /// Restricts every reader to a square tile.
    pub fn set_inside_tile(&mut self, ll_x: f64, ll_y: f64, size: f64) -> Result<()> {
        if !(size > 0.) {
            return Err(Error::InvalidAreaOfInterest(format!(
                "tile size must be positive, got {size}"
            )));
        }
        self.aoi = Some(Aoi::Tile { ll_x, ll_y, size });
        Ok(())
    }

    /// Restricts every reader to a circle.
    pub fn set_inside_circle(&mut self, x: f64, y: f64, radius: f64) -> Result<()> {
        if !(radius > 0.) {
            return Err(Error::InvalidAreaOfInterest(format!(
                "circle radius must be positive, got {radius}"
            )));
        }
        self.aoi = Some(Aoi::Circle { x, y, radius });
        Ok(())
    }

    /// Restricts every reader to an inclusive rectangle.
    pub fn set_inside_rectangle(
        &mut self,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    ) -> Result<()> {
        if min_x > max_x || min_y > max_y {
            return Err(Error::InvalidAreaOfInterest(format!(
                "rectangle is inverted: ({min_x}, {min_y}) to ({max_x}, {max_y})"
            )));
        }
        self.aoi = Some(Aoi::Rectangle {
            min_x,
            min_y,
            max_x,
            max_y,
        });
        Ok(())
    }

    /// Caps COPC queries at an octree depth.
    pub fn set_depth_limit(&mut self, depth: i32) {
        self.depth_limit = Some(depth);
        self.resolution = None;
    }

    /// Caps COPC queries at the shallowest depth resolving `resolution`.
    pub fn set_resolution(&mut self, resolution: f64) {
        self.resolution = Some(resolution);
        self.depth_limit = None;
    }

    /// Sets the octant stream order for COPC readers.
    pub fn set_stream_order(&mut self, order: StreamOrder) {
        self.order = order;
    }

    /// Streams COPC files in raw on-disk chunk order, skipping the index.
    ///
    /// Without this override a COPC file always gets the default
    /// depth-unlimited octree query, never raw chunk order.
    pub fn set_raw_chunk_order(&mut self, raw_chunk_order: bool) {
        self.raw_chunk_order = raw_chunk_order;
    }

    /// Sets the filter chain shared by every produced reader.
    pub fn set_filter(&mut self, filter: Arc<Filter>) {
        self.filter = Some(filter);
    }

    /// Sets the mutation chain shared by every produced reader.
    ///
    /// The chain carries per-pass state (the overflow counter); call
    /// [Mutator::zero_overflows] between independent passes.
    pub fn set_mutator(&mut self, mutator: Arc<Mutator>) {
        self.mutator = Some(mutator);
    }

    /// Sets the ignore engine shared by every produced reader.
    pub fn set_ignore(&mut self, ignore: Arc<Ignore>) {
        self.ignore = Some(ignore);
    }

    /// Rescales every produced reader's quantization grid.
    ///
    /// Points stream as real-world doubles regardless; the target scale is
    /// what coordinate mutations and downstream writers quantize against.
    pub fn set_rescale(&mut self, scale: Vector<f64>) {
        self.adjustment.scale = Some(scale);
    }

    /// Reoffsets every produced reader's quantization grid.
    pub fn set_reoffset(&mut self, offset: Vector<f64>) {
        self.adjustment.offset = Some(offset);
    }

    /// Supplies a legacy rectangle index for the next opened file.
    ///
    /// Consumed by the next [open_next](Opener::open_next). If that file
    /// turns out to be COPC, the octree index wins and this one is dropped
    /// with a warning.
    pub fn set_index(&mut self, index: RangeIndex) {
        self.index = Some(index);
    }

    /// Opens the next reader, or `None` when the batch is done.
    ///
    /// In merged mode the first call returns the single composite reader.
    pub fn open_next(&mut self) -> Result<Option<Reader>> {
        if self.files.is_empty() {
            return Err(Error::NoFiles);
        }
        if self.merged {
            if self.current > 0 {
                return Ok(None);
            }
            self.current = self.files.len();
            let mut sources = Vec::with_capacity(self.files.len());
            for file in &self.files {
                sources.push(open_source(&file.path, self.adjustment)?);
            }
            let merged: Box<dyn PointSource> = Box::new(MergedSource::new(sources)?);
            let mut reader = StreamReader::new(merged);
            self.configure(&mut reader, None)?;
            return Ok(Some(reader));
        }
        let Some(file) = self.files.get(self.current) else {
            return Ok(None);
        };
        let file = file.clone();
        let primary = self.current;
        self.current += 1;

        if let Some(distance) = self.buffer {
            let mut sources = vec![open_source(&file.path, self.adjustment)?];
            for neighbor in self.neighbors_of(primary, distance) {
                let path = self.files[neighbor].path.clone();
                sources.push(open_source(&path, self.adjustment)?);
            }
            let merged: Box<dyn PointSource> = Box::new(MergedSource::new(sources)?);
            let mut reader = StreamReader::new(merged);
            let buffered_rect = file.rect.map(|rect| rect.buffered(distance));
            self.configure(&mut reader, buffered_rect)?;
            Ok(Some(reader))
        } else {
            let mut reader = StreamReader::new(open_source(&file.path, self.adjustment)?);
            self.configure(&mut reader, None)?;
            Ok(Some(reader))
        }
    }

    /// The indices of every file whose rectangle is within `distance` of
    /// the primary file's, plus every file the list knows no rectangle
    /// for.
    fn neighbors_of(&mut self, primary: usize, distance: f64) -> Vec<usize> {
        let Some(rect) = self.files[primary].rect else {
            // No rectangle for the primary: every other file is a
            // potential neighbor.
            return (0..self.files.len())
                .filter(|&index| index != primary)
                .collect();
        };
        if self.neighbors.is_none() {
            let mut builder = RectTreeBuilder::new();
            for file in &self.files {
                // Files without a rectangle get an inverted one which can
                // never overlap; they are picked up below instead.
                builder.add(file.rect.unwrap_or_default());
            }
            self.neighbors = Some(builder.build());
        }
        let mut neighbors = Vec::new();
        if let Some(tree) = &self.neighbors {
            neighbors.extend(tree.overlap(rect.buffered(distance)).filter(|&hit| hit != primary));
        }
        for (index, file) in self.files.iter().enumerate() {
            if index != primary && file.rect.is_none() {
                neighbors.push(index);
            }
        }
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }

    fn configure(&mut self, reader: &mut Reader, buffered_rect: Option<Rect>) -> Result<()> {
        if let Some(ignore) = &self.ignore {
            reader.set_ignore(ignore.clone());
        }
        if let Some(filter) = &self.filter {
            reader.set_filter(filter.clone());
        }
        if let Some(mutator) = &self.mutator {
            reader.set_mutator(mutator.clone());
        }
        if reader.header().copc_info().is_ok() && !self.raw_chunk_order {
            match CopcIndex::from_header(reader.header()) {
                Ok(copc_index) => {
                    if self.index.take().is_some() {
                        warn!("the file carries a copc index, the supplied rectangle index is dropped");
                    }
                    reader.set_copc_index(copc_index);
                }
                Err(err) => warn!("the copc hierarchy could not be read: {err}"),
            }
        } else if let Some(index) = self.index.take() {
            reader.set_index(index);
        }
        if let Some(depth) = self.depth_limit {
            reader.set_depth_limit(depth);
        }
        if let Some(resolution) = self.resolution {
            reader.set_resolution(resolution);
        }
        reader.set_stream_order(self.order);
        match self.aoi {
            Some(Aoi::Tile { ll_x, ll_y, size }) => reader.inside_tile(ll_x, ll_y, size)?,
            Some(Aoi::Circle { x, y, radius }) => reader.inside_circle(x, y, radius)?,
            Some(Aoi::Rectangle {
                min_x,
                min_y,
                max_x,
                max_y,
            }) => reader.inside_rectangle(min_x, min_y, max_x, max_y)?,
            None => {
                if let Some(rect) = buffered_rect {
                    reader.inside_rectangle(rect.min_x, rect.min_y, rect.max_x, rect.max_y)?;
                }
            }
        }
        Ok(())
    }
}

fn open_source(path: &Path, adjustment: Adjustment) -> Result<Box<dyn PointSource>> {
    let source = if path == Path::new("-") {
        source_from(ForwardSeek::new(BufReader::new(io::stdin())))?
    } else {
        source_from(BufReader::new(File::open(path)?))?
    };
    if adjustment.is_identity() {
        Ok(source)
    } else {
        Ok(Box::new(AdjustedSource::new(source, adjustment)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_name_only() {
        let spec = FileSpec::parse("points.las \t").unwrap();
        assert_eq!(PathBuf::from("points.las"), spec.path);
        assert_eq!(None, spec.id);
        assert_eq!(None, spec.rect);
    }

    #[test]
    fn parse_id_and_name() {
        let spec = FileSpec::parse("3,points.las").unwrap();
        assert_eq!(Some(3), spec.id);
        assert_eq!(PathBuf::from("points.las"), spec.path);
    }

    #[test]
    fn parse_full_line() {
        let spec = FileSpec::parse("3,500,-10.0,-20.0,10.0,20.0,points.las").unwrap();
        assert_eq!(Some(3), spec.id);
        assert_eq!(Some(500), spec.number_of_points);
        assert_eq!(Some(Rect::new(-10., -20., 10., 20.)), spec.rect);
        assert_eq!(PathBuf::from("points.las"), spec.path);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(FileSpec::parse("").is_err());
        assert!(FileSpec::parse("a,b,c").is_err());
        assert!(FileSpec::parse("x,points.las").is_err());
        assert!(FileSpec::parse("1,2,3,4,5,oops,points.las").is_err());
    }

    #[test]
    fn buffer_needs_neighbors() {
        let mut opener = Opener::new();
        opener.add_file("only.las");
        assert!(matches!(
            opener.set_buffer_distance(10.),
            Err(Error::BufferWithoutNeighbors)
        ));
        opener.add_file("other.las");
        assert!(opener.set_buffer_distance(10.).is_ok());
    }

    #[test]
    fn neighbor_selection() {
        let mut opener = Opener::new();
        for i in 0..5 {
            let x = f64::from(i) * 100.;
            opener.add_spec(FileSpec {
                path: PathBuf::from(format!("tile_{i}.las")),
                id: Some(i as u32),
                number_of_points: None,
                rect: Some(Rect::new(x, 0., x + 100., 100.)),
            });
        }
        // Tiles touch, so a 10-unit buffer pulls in adjacent tiles only.
        assert_eq!(vec![1], opener.neighbors_of(0, 10.));
        assert_eq!(vec![1, 3], opener.neighbors_of(2, 10.));
        // A buffer spanning a whole tile reaches two tiles out.
        assert_eq!(vec![0, 1, 3, 4], opener.neighbors_of(2, 150.));
    }

    #[test]
    fn files_without_rects_are_always_neighbors() {
        let mut opener = Opener::new();
        opener.add_spec(FileSpec {
            path: PathBuf::from("a.las"),
            id: None,
            number_of_points: None,
            rect: Some(Rect::new(0., 0., 1., 1.)),
        });
        opener.add_file("no_rect.las");
        opener.add_spec(FileSpec {
            path: PathBuf::from("far.las"),
            id: None,
            number_of_points: None,
            rect: Some(Rect::new(1000., 1000., 1001., 1001.)),
        });
        assert_eq!(vec![1], opener.neighbors_of(0, 1.));
        assert_eq!(vec![0, 2], opener.neighbors_of(1, 1.));
    }

    #[test]
    fn no_files_is_an_error() {
        let mut opener = Opener::new();
        assert!(matches!(opener.open_next(), Err(Error::NoFiles)));
    }

    #[test]
    fn rescale_reaches_the_reader_header() {
        let mut opener = Opener::new();
        opener.add_file("whatever.las");
        opener.set_rescale(Vector {
            x: 0.01,
            y: 0.01,
            z: 0.01,
        });
        opener.set_reoffset(Vector {
            x: 1000.,
            y: 0.,
            z: 0.,
        });
        assert!(!opener.adjustment.is_identity());
        assert_eq!(
            Some(Vector {
                x: 0.01,
                y: 0.01,
                z: 0.01
            }),
            opener.adjustment.scale
        );
    }
}
