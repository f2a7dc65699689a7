//! The streaming point reader protocol.
//!
//! A [PointSource] is the decode boundary: something that can decode the
//! next record into a [Point], seek to a point position, and report that
//! position. [StreamReader] wraps a source with everything the rest of this
//! crate composes around it -- the area-of-interest scope, the spatial
//! indices, and the ignore/filter/mutate chain -- behind a single
//! [read_point](StreamReader::read_point) stepping operation.
//!
//! ```
//! use lasstream::Reader;
//! # use lasstream::Result;
//! # fn example() -> Result<()> {
//! let mut reader = Reader::from_path("tests/data/autzen.las")?;
//! reader.inside_rectangle(635577., 848882., 638945., 853538.)?;
//! while let Some(point) = reader.read_point()? {
//!     println!("({}, {}, {})", point.x, point.y, point.z);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! End-of-stream and failure are distinct: `read_point` returns `Ok(None)`
//! on clean exhaustion and `Err(_)` on an I/O or decode error. The hot loop
//! stays free of per-point error machinery either way.

mod adjust;
mod las;
#[cfg(feature = "laz")]
mod laz;
mod merge;
mod pipe;

pub use adjust::{AdjustedSource, Adjustment};
pub use las::LasSource;
#[cfg(feature = "laz")]
pub use laz::LazSource;
pub use merge::MergedSource;
pub use pipe::ForwardSeek;

use crate::index::{CopcIndex, Intervals, RangeIndex, Rect, StreamOrder};
use crate::{Bounds, Error, Filter, Header, Ignore, Mutator, Point, Result, Selective};
use log::warn;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::sync::Arc;

/// The decode boundary between the streaming core and a concrete format
/// backend.
///
/// Positions are point indices, not byte offsets -- index-to-offset
/// translation, if any, is the backend's responsibility.
pub trait PointSource {
    /// Returns the header of the underlying file.
    fn header(&self) -> &Header;

    /// Decodes the next record, advancing the cursor.
    ///
    /// Returns `Ok(None)` on clean end-of-stream.
    fn read_next(&mut self) -> Result<Option<Point>>;

    /// Seeks to the given point position, zero-indexed.
    fn seek(&mut self, position: u64) -> Result<()>;

    /// The position of the next point to decode.
    fn position(&self) -> u64;
}

impl<S: PointSource + ?Sized> PointSource for Box<S> {
    fn header(&self) -> &Header {
        (**self).header()
    }

    fn read_next(&mut self) -> Result<Option<Point>> {
        (**self).read_next()
    }

    fn seek(&mut self, position: u64) -> Result<()> {
        (**self).seek(position)
    }

    fn position(&self) -> u64 {
        (**self).position()
    }
}

/// Reads LAS data from a path, picking the backend by the header.
///
/// This is the alias most callers want; openers and tests that compose
/// their own sources use [StreamReader] directly.
pub type Reader = StreamReader<Box<dyn PointSource>>;

impl Reader {
    /// Opens a reader for the file at this path.
    ///
    /// The underlying `File` is wrapped in a `BufReader`. Compressed files
    /// need the `laz` feature; without it they are rejected at open.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use lasstream::Reader;
    /// let reader = Reader::from_path("tests/data/autzen.las").unwrap();
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Reader> {
        Reader::open(BufReader::new(File::open(path)?))
    }

    /// Opens a reader over anything that reads and seeks.
    ///
    /// This does *not* wrap the `Read` in a `BufRead`, so if you're
    /// concerned about performance you should do that wrapping yourself
    /// (or use [from_path](Reader::from_path)).
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Cursor;
    /// use lasstream::{raw, Reader};
    /// let mut cursor = Cursor::new(Vec::new());
    /// raw::Header::default().write_to(&mut cursor).unwrap();
    /// cursor.set_position(0);
    /// let reader = Reader::open(cursor).unwrap();
    /// assert_eq!(0, reader.npoints());
    /// ```
    pub fn open<R: Read + Seek + Send + 'static>(read: R) -> Result<Reader> {
        source_from(read).map(StreamReader::new)
    }
}

/// Resolves a stream to the concrete source its header calls for.
pub(crate) fn source_from<R: Read + Seek + Send + 'static>(
    mut read: R,
) -> Result<Box<dyn PointSource>> {
    let header = Header::read_from(&mut read)?;
    if header.point_format.is_compressed {
        #[cfg(feature = "laz")]
        {
            Ok(Box::new(LazSource::new(read, header)?))
        }
        #[cfg(not(feature = "laz"))]
        {
            Err(Error::LaszipNotEnabled)
        }
    } else {
        Ok(Box::new(LasSource::new(read, header)?))
    }
}

/// The area-of-interest scope of a reader.
///
/// Exactly one variant is active at a time; [StreamReader::inside_none]
/// restores `All`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum Scope {
    /// No restriction.
    #[default]
    All,
    Tile {
        ll_x: f64,
        ll_y: f64,
        size: f64,
    },
    Circle {
        x: f64,
        y: f64,
        radius: f64,
    },
    Rectangle {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    },
}

impl Scope {
    /// The xy rectangle covering this scope, `None` for `All`.
    fn rect(&self) -> Option<(f64, f64, f64, f64)> {
        match *self {
            Scope::All => None,
            Scope::Tile { ll_x, ll_y, size } => Some((ll_x, ll_y, ll_x + size, ll_y + size)),
            Scope::Circle { x, y, radius } => Some((x - radius, y - radius, x + radius, y + radius)),
            Scope::Rectangle {
                min_x,
                min_y,
                max_x,
                max_y,
            } => Some((min_x, min_y, max_x, max_y)),
        }
    }

    fn contains(&self, point: &Point) -> bool {
        match *self {
            Scope::All => true,
            // Half-open on the upper edge: a point exactly on the line
            // shared by two adjacent tiles belongs to the next tile over,
            // so tiled runs never count it twice.
            Scope::Tile { ll_x, ll_y, size } => {
                point.x >= ll_x
                    && point.y >= ll_y
                    && point.x < ll_x + size
                    && point.y < ll_y + size
            }
            Scope::Circle { x, y, radius } => {
                let dx = point.x - x;
                let dy = point.y - y;
                dx * dx + dy * dy < radius * radius
            }
            Scope::Rectangle {
                min_x,
                min_y,
                max_x,
                max_y,
            } => {
                point.x >= min_x && point.x <= max_x && point.y >= min_y && point.y <= max_y
            }
        }
    }
}

/// How to cap the octree depth of COPC queries.
#[derive(Clone, Copy, Debug)]
enum DepthCap {
    Levels(i32),
    Resolution(f64),
}

/// How the next `read_point` call steps the stream.
///
/// Re-resolved whenever the configuration changes, so the hot loop never
/// re-derives it per point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum ReadPlan {
    /// The scope cannot contain any point; don't even look.
    Exhausted,
    /// Decode records in stream order.
    #[default]
    Linear,
    /// Follow the active intervals, seeking between ranges.
    Interval,
}

/// A streaming reader composing scope, indices, and per-point rules around
/// a [PointSource].
#[allow(missing_debug_implementations)]
pub struct StreamReader<S: PointSource> {
    source: S,
    header: Header,
    orig_bounds: Bounds,
    p_count: u64,
    scope: Scope,
    plan: ReadPlan,
    copc_index: Option<CopcIndex>,
    range_index: Option<RangeIndex>,
    intervals: Option<Intervals>,
    depth_cap: Option<DepthCap>,
    order: StreamOrder,
    filter: Option<Arc<Filter>>,
    mutator: Option<Arc<Mutator>>,
    ignore: Option<Arc<Ignore>>,
}

impl<S: PointSource> StreamReader<S> {
    /// Creates a reader over a source.
    ///
    /// The source's header is cloned; the reader's copy is the one the
    /// area-of-interest calls rewrite.
    pub fn new(source: S) -> StreamReader<S> {
        let header = source.header().clone();
        let orig_bounds = header.bounds;
        StreamReader {
            source,
            header,
            orig_bounds,
            p_count: 0,
            scope: Scope::default(),
            plan: ReadPlan::default(),
            copc_index: None,
            range_index: None,
            intervals: None,
            depth_cap: None,
            order: StreamOrder::default(),
            filter: None,
            mutator: None,
            ignore: None,
        }
    }

    /// Returns a reference to this reader's header.
    ///
    /// While an area of interest is active the bounds are the intersected
    /// subregion, not the file's declared box.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The number of points yielded so far.
    ///
    /// Incremented once per accepted point, not per raw record scanned.
    pub fn p_count(&self) -> u64 {
        self.p_count
    }

    /// The total number of points the file declares.
    pub fn npoints(&self) -> u64 {
        self.header.number_of_points
    }

    /// Sets the filter chain, shared with the caller.
    pub fn set_filter(&mut self, filter: Arc<Filter>) {
        self.filter = Some(filter);
    }

    /// Sets the mutation chain, shared with the caller.
    pub fn set_mutator(&mut self, mutator: Arc<Mutator>) {
        self.mutator = Some(mutator);
    }

    /// Sets the ignore engine, shared with the caller.
    pub fn set_ignore(&mut self, ignore: Arc<Ignore>) {
        self.ignore = Some(ignore);
    }

    /// The union of the configured chains' field requirements, for a
    /// selectively-decompressing backend.
    pub fn decompress_selective(&self) -> Selective {
        let mut selective = Selective::empty();
        if let Some(ignore) = &self.ignore {
            selective |= ignore.decompress_selective();
        }
        if let Some(filter) = &self.filter {
            selective |= filter.decompress_selective();
        }
        if let Some(mutator) = &self.mutator {
            selective |= mutator.decompress_selective();
        }
        selective
    }

    /// Installs a rectangle index, replacing any previous one.
    ///
    /// The index only participates while a rectangular-ish area of
    /// interest is active; it is ignored when a COPC index is also
    /// installed.
    pub fn set_index(&mut self, index: RangeIndex) {
        if self.copc_index.is_some() {
            warn!("a copc index is installed, the rectangle index will not be used");
        }
        self.range_index = Some(index);
        self.replan();
    }

    /// Installs a COPC octree index, replacing any previous one.
    ///
    /// Installing the index immediately runs the default depth-unlimited
    /// full-volume query, so a COPC file streams in spatially-coherent
    /// octant order rather than raw chunk order even without an explicit
    /// area of interest.
    pub fn set_copc_index(&mut self, index: CopcIndex) {
        self.copc_index = Some(index);
        self.replan();
    }

    /// Caps COPC queries at an octree depth.
    pub fn set_depth_limit(&mut self, depth: i32) {
        self.depth_cap = Some(DepthCap::Levels(depth));
        self.replan();
    }

    /// Caps COPC queries at the shallowest depth resolving `resolution`.
    pub fn set_resolution(&mut self, resolution: f64) {
        self.depth_cap = Some(DepthCap::Resolution(resolution));
        self.replan();
    }

    /// Clears the depth/resolution cap.
    pub fn clear_depth_limit(&mut self) {
        self.depth_cap = None;
        self.replan();
    }

    /// Sets the order in which matched octants are streamed.
    pub fn set_stream_order(&mut self, order: StreamOrder) {
        self.order = order;
        self.replan();
    }

    /// Drops any area of interest, restoring the header's original bounds
    /// exactly.
    pub fn inside_none(&mut self) {
        self.header.bounds = self.orig_bounds;
        self.scope = Scope::All;
        self.replan();
    }

    /// Restricts the stream to a square tile.
    ///
    /// The tile is half-open: points exactly on the upper or right edge
    /// belong to the neighboring tile. The header's public bounds shrink
    /// to the tile, with the upper bound pulled in by one scale unit to
    /// keep it inside the half-open box.
    pub fn inside_tile(&mut self, ll_x: f64, ll_y: f64, size: f64) -> Result<()> {
        if !(size > 0.) {
            return Err(Error::InvalidAreaOfInterest(format!(
                "tile size must be positive, got {size}"
            )));
        }
        self.scope = Scope::Tile { ll_x, ll_y, size };
        self.clip_bounds(
            ll_x,
            ll_y,
            ll_x + size - self.header.transforms.x.scale,
            ll_y + size - self.header.transforms.y.scale,
        );
        self.replan();
        Ok(())
    }

    /// Restricts the stream to a circle.
    pub fn inside_circle(&mut self, x: f64, y: f64, radius: f64) -> Result<()> {
        if !(radius > 0.) {
            return Err(Error::InvalidAreaOfInterest(format!(
                "circle radius must be positive, got {radius}"
            )));
        }
        self.scope = Scope::Circle { x, y, radius };
        self.clip_bounds(x - radius, y - radius, x + radius, y + radius);
        self.replan();
        Ok(())
    }

    /// Restricts the stream to an inclusive rectangle.
    pub fn inside_rectangle(
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
        self.scope = Scope::Rectangle {
            min_x,
            min_y,
            max_x,
            max_y,
        };
        self.clip_bounds(min_x, min_y, max_x, max_y);
        self.replan();
        Ok(())
    }

    fn clip_bounds(&mut self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) {
        self.header.bounds = self.orig_bounds;
        self.header.bounds.min.x = self.orig_bounds.min.x.max(min_x);
        self.header.bounds.min.y = self.orig_bounds.min.y.max(min_y);
        self.header.bounds.max.x = self.orig_bounds.max.x.min(max_x);
        self.header.bounds.max.y = self.orig_bounds.max.y.min(max_y);
    }

    /// Re-resolves the read plan from the active configuration.
    ///
    /// The plan, not the points, absorbs configuration changes: a scope
    /// that cannot intersect the file becomes a constant "no more points"
    /// stub, an index turns the stream into interval-following, and
    /// everything else decodes linearly.
    fn replan(&mut self) {
        match self.scope.rect() {
            None => {
                if let Some(copc_index) = &self.copc_index {
                    let mut query = copc_index.query().order(self.order);
                    if let Some(depth) = self.effective_depth() {
                        query = query.depth_limit(depth);
                    }
                    self.intervals = Some(query.all());
                    self.plan = ReadPlan::Interval;
                } else {
                    self.intervals = None;
                    self.plan = ReadPlan::Linear;
                }
            }
            Some((min_x, min_y, max_x, max_y)) => {
                let disjoint = min_x > self.orig_bounds.max.x
                    || max_x < self.orig_bounds.min.x
                    || min_y > self.orig_bounds.max.y
                    || max_y < self.orig_bounds.min.y;
                if disjoint {
                    self.intervals = None;
                    self.plan = ReadPlan::Exhausted;
                } else if let Some(copc_index) = &self.copc_index {
                    let mut query = copc_index.query().order(self.order);
                    if let Some(depth) = self.effective_depth() {
                        query = query.depth_limit(depth);
                    }
                    let intervals = match self.scope {
                        Scope::Circle { x, y, radius } => query.circle(x, y, radius),
                        _ => query.rectangle(min_x, min_y, max_x, max_y),
                    };
                    self.intervals = Some(intervals);
                    self.plan = ReadPlan::Interval;
                } else if let Some(range_index) = &self.range_index {
                    self.intervals = Some(range_index.query(Rect::new(min_x, min_y, max_x, max_y)));
                    self.plan = ReadPlan::Interval;
                } else {
                    self.intervals = None;
                    self.plan = ReadPlan::Linear;
                }
            }
        }
    }

    fn effective_depth(&self) -> Option<i32> {
        let copc_index = self.copc_index.as_ref()?;
        match self.depth_cap? {
            DepthCap::Levels(depth) => Some(depth),
            DepthCap::Resolution(resolution) => Some(copc_index.depth_for_resolution(resolution)),
        }
    }

    /// Reads the next accepted point.
    ///
    /// Records are decoded (following the active intervals when an index
    /// is installed) and stepped through the composed chain -- ignore,
    /// filter, scope test, mutate -- until one is accepted or the stream is
    /// exhausted. `Ok(None)` is clean end-of-stream; errors are real I/O
    /// or decode failures.
    pub fn read_point(&mut self) -> Result<Option<Point>> {
        loop {
            match self.plan {
                ReadPlan::Exhausted => return Ok(None),
                ReadPlan::Interval => {
                    let Some(intervals) = self.intervals.as_mut() else {
                        return Ok(None);
                    };
                    if !intervals.seek_next(&mut self.source)? {
                        return Ok(None);
                    }
                }
                ReadPlan::Linear => {}
            }
            let Some(mut point) = self.source.read_next()? else {
                return Ok(None);
            };
            if let Some(ignore) = &self.ignore {
                if ignore.ignore(&point) {
                    continue;
                }
            }
            if let Some(filter) = &self.filter {
                if filter.filter(&point) {
                    continue;
                }
            }
            if !self.scope.contains(&point) {
                continue;
            }
            if let Some(mutator) = &self.mutator {
                mutator.mutate(&mut point, &self.header.transforms);
            }
            self.p_count += 1;
            return Ok(Some(point));
        }
    }

    /// Seeks the source to the given point position.
    ///
    /// The accepted-point counter is untouched; use
    /// [rewind](StreamReader::rewind) to start a fresh pass.
    pub fn seek(&mut self, position: u64) -> Result<()> {
        self.source.seek(position)
    }

    /// Resets per-pass state for another pass over the same stream.
    ///
    /// The configured scope, indices, and chains survive; only the
    /// position, the accepted-point count, and the interval cursor reset.
    pub fn rewind(&mut self) -> Result<()> {
        self.source.seek(0)?;
        self.p_count = 0;
        if let Some(intervals) = self.intervals.as_mut() {
            intervals.reset();
        }
        Ok(())
    }

    /// Returns an iterator over this reader's accepted points.
    pub fn points(&mut self) -> Points<'_, S> {
        Points { reader: self }
    }

    fn report_overflows(&self) {
        if let Some(mutator) = &self.mutator {
            let overflows = mutator.overflows();
            if overflows > 0 {
                warn!("{overflows} mutated coordinates were clamped to the fixed-point range");
            }
        }
    }
}

impl<S: PointSource> Drop for StreamReader<S> {
    fn drop(&mut self) {
        self.report_overflows();
    }
}

/// An iterator over a reader's accepted points.
///
/// This struct is created by [StreamReader::points].
#[allow(missing_debug_implementations)]
pub struct Points<'a, S: PointSource> {
    reader: &'a mut StreamReader<S>,
}

impl<S: PointSource> Iterator for Points<'_, S> {
    type Item = Result<Point>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_point().transpose()
    }
}
