//! Spatial indices and the merged point ranges they produce.
//!
//! Both indices -- the rectangle [kd-tree](RectTree) and the [COPC octree
//! ](CopcIndex) -- answer queries with [Intervals]: sorted, merged, half-open
//! ranges of point positions (plus file-address ranges when the index knows
//! them). A reader consumes intervals through [Intervals::seek_next], which
//! seeks the underlying source to each range start and reports readiness
//! until the source's position crosses the range end.

mod kdtree;
mod octree;

pub use kdtree::{Overlaps, Rect, RectTree, RectTreeBuilder};
pub use octree::{CopcIndex, Octant, Query, StreamOrder};

use crate::reader::PointSource;
use crate::Result;
use std::ops::Range;

/// Sorted, merged ranges of point positions to stream.
///
/// Ranges are half-open. Two ranges with a gap of at most one point are
/// merged -- reading a stray point is cheaper than an extra seek.
#[derive(Clone, Debug, Default)]
pub struct Intervals {
    points: Vec<Range<u64>>,
    addresses: Vec<Range<u64>>,
    current: usize,
    open: bool,
}

impl Intervals {
    pub(crate) fn push(&mut self, points: Range<u64>, addresses: Option<Range<u64>>) {
        if let Some(last) = self.points.last_mut() {
            if points.start <= last.end + 1 {
                last.end = last.end.max(points.end);
                if let (Some(last), Some(addresses)) = (self.addresses.last_mut(), &addresses) {
                    last.end = last.end.max(addresses.end);
                }
                return;
            }
        }
        self.points.push(points);
        if let Some(addresses) = addresses {
            self.addresses.push(addresses);
        }
    }

    /// The number of merged ranges.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if there is nothing to stream.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The total number of point positions covered.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::index::Intervals;
    /// assert_eq!(0, Intervals::default().total_points());
    /// ```
    pub fn total_points(&self) -> u64 {
        self.points.iter().map(|range| range.end - range.start).sum()
    }

    /// The merged point-position ranges.
    pub fn point_ranges(&self) -> &[Range<u64>] {
        &self.points
    }

    /// The merged file-address ranges, parallel to
    /// [point_ranges](Intervals::point_ranges).
    ///
    /// Empty when the index that produced these intervals does not know
    /// file addresses (e.g. the rectangle index).
    pub fn address_ranges(&self) -> &[Range<u64>] {
        &self.addresses
    }

    /// Rewinds the cursor to before the first range.
    pub fn reset(&mut self) {
        self.current = 0;
        self.open = false;
    }

    /// Positions the source for the next point, opening ranges as needed.
    ///
    /// While no range is open, the next one is popped and the source seeked
    /// to its start. Returns true when the source is inside the current
    /// range, false when every range is exhausted. The source's own
    /// position counter is the only position state consulted -- these
    /// intervals never track the stream independently.
    pub fn seek_next<S: PointSource + ?Sized>(&mut self, source: &mut S) -> Result<bool> {
        loop {
            if self.open {
                if source.position() < self.points[self.current].end {
                    return Ok(true);
                }
                self.open = false;
                self.current += 1;
            } else {
                let Some(range) = self.points.get(self.current) else {
                    return Ok(false);
                };
                if source.position() != range.start {
                    source.seek(range.start)?;
                }
                self.open = true;
            }
        }
    }
}

/// A rectangle-to-point-range index over a single file.
///
/// This is the uncompressed-file counterpart of the COPC octree: a kd-tree
/// over coarse spatial cells, each cell knowing which contiguous slice of
/// the file's points it holds. Querying with an area of interest yields the
/// merged [Intervals] covering every overlapping cell.
#[derive(Clone, Debug)]
pub struct RangeIndex {
    tree: RectTree,
    ranges: Vec<Range<u64>>,
}

/// Accumulates cells for a [RangeIndex].
#[derive(Clone, Debug, Default)]
pub struct RangeIndexBuilder {
    tree: RectTreeBuilder,
    ranges: Vec<Range<u64>>,
}

impl RangeIndexBuilder {
    /// Creates an empty builder.
    pub fn new() -> RangeIndexBuilder {
        RangeIndexBuilder::default()
    }

    /// Adds a cell covering `rect` and holding the points at `points`.
    pub fn add(&mut self, rect: Rect, points: Range<u64>) {
        self.tree.add(rect);
        self.ranges.push(points);
    }

    /// Builds the index, consuming this builder.
    pub fn build(self) -> RangeIndex {
        RangeIndex {
            tree: self.tree.build(),
            ranges: self.ranges,
        }
    }
}

impl RangeIndex {
    /// The number of cells.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Returns true if the index holds no cells.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Queries for the merged point ranges of every cell overlapping the
    /// query rectangle.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::index::{Rect, RangeIndexBuilder};
    /// let mut builder = RangeIndexBuilder::new();
    /// builder.add(Rect::new(0., 0., 1., 1.), 0..100);
    /// builder.add(Rect::new(1., 0., 2., 1.), 100..200);
    /// builder.add(Rect::new(5., 0., 6., 1.), 200..300);
    /// let index = builder.build();
    /// let intervals = index.query(Rect::new(0.5, 0.5, 1.5, 0.9));
    /// // The first two cells touch, so their ranges merge.
    /// assert_eq!(1, intervals.len());
    /// assert_eq!(200, intervals.total_points());
    /// ```
    pub fn query(&self, query: Rect) -> Intervals {
        let mut hits: Vec<usize> = self.tree.overlap(query).collect();
        hits.sort_by_key(|&hit| self.ranges[hit].start);
        let mut intervals = Intervals::default();
        for hit in hits {
            intervals.push(self.ranges[hit].clone(), None);
        }
        intervals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_touching_and_gap_of_one() {
        let mut intervals = Intervals::default();
        intervals.push(0..10, None);
        intervals.push(10..20, None);
        intervals.push(21..30, None);
        intervals.push(40..50, None);
        assert_eq!(2, intervals.len());
        assert_eq!(&[0..30, 40..50], intervals.point_ranges());
    }

    #[test]
    fn range_index_query() {
        let mut builder = RangeIndexBuilder::new();
        for i in 0..10u64 {
            let x = i as f64;
            builder.add(Rect::new(x, 0., x + 1., 1.), i * 50..(i + 1) * 50);
        }
        let index = builder.build();
        let intervals = index.query(Rect::new(2.5, 0.5, 4.5, 0.6));
        assert_eq!(&[100..250], intervals.point_ranges());
        assert!(index.query(Rect::new(20., 20., 21., 21.)).is_empty());
    }
}
