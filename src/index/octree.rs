//! The COPC octree index and its query machinery.

use super::Intervals;
use crate::copc::{Entry, VoxelKey};
use crate::{Bounds, Header, Result};
use log::warn;
use std::collections::HashMap;
use std::ops::Range;

/// The order in which matched octants are streamed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StreamOrder {
    /// By file address: minimizes seeking, the default.
    #[default]
    Address,
    /// By 2D spatial locality: row-major over the normalized x/y grid, ties
    /// broken by depth.
    Spatial,
    /// By octree level, root first.
    Depth,
}

/// One octree node with its addresses, point positions, and cube.
///
/// Octants with zero points stay in the registry -- their descendants may
/// still hold points, so the tree must remain navigable through them -- but
/// they are never streamed.
#[derive(Clone, Debug)]
pub struct Octant {
    /// The node's key.
    pub key: VoxelKey,
    /// The half-open file-address range of the node's chunk.
    ///
    /// `0..0` for empty, navigation-only nodes.
    pub offset: Range<u64>,
    /// The half-open point-position range of the node's points.
    pub position: Range<u64>,
    /// The node's cube, derived from the root cube and the key's depth.
    pub bounds: Bounds,
}

impl Octant {
    /// Does this octant hold points?
    ///
    /// An octant whose chunk address starts at zero holds no points and
    /// exists only so the tree can be navigated through it.
    pub fn is_loadable(&self) -> bool {
        self.offset.start != 0
    }

    /// The number of points in this octant.
    pub fn point_count(&self) -> u64 {
        self.position.end - self.position.start
    }
}

/// An octree index over a COPC file's persisted hierarchy.
#[derive(Clone, Debug)]
pub struct CopcIndex {
    root_bounds: Bounds,
    spacing: f64,
    max_depth: i32,
    octants: Vec<Octant>,
    by_key: HashMap<VoxelKey, usize>,
}

impl CopcIndex {
    /// Builds the index from a root cube, root point spacing, and the
    /// resolved hierarchy entries.
    ///
    /// Loadable entries are sorted by file address and assigned cumulative
    /// point-position ranges. The sum of the entries' point counts is
    /// checked against `declared_points` (the header's total); a mismatch
    /// is a warning, not a failure -- queries still work best-effort over
    /// the entries that are there.
    pub fn new(
        root_bounds: Bounds,
        spacing: f64,
        entries: Vec<Entry>,
        declared_points: u64,
    ) -> CopcIndex {
        let mut loadable = Vec::new();
        let mut empty = Vec::new();
        for entry in entries {
            if entry.point_count > 0 && entry.offset > 0 {
                loadable.push(entry);
            } else {
                empty.push(entry);
            }
        }
        loadable.sort_by_key(|entry| entry.offset);

        let mut octants = Vec::with_capacity(loadable.len() + empty.len());
        let mut position = 0u64;
        let mut max_depth = 0;
        for entry in loadable {
            let point_count = entry.point_count as u64;
            octants.push(Octant {
                key: entry.key,
                offset: entry.offset..entry.offset + entry.byte_size.max(0) as u64,
                position: position..position + point_count,
                bounds: entry.key.bounds(&root_bounds),
            });
            position += point_count;
            max_depth = max_depth.max(entry.key.depth);
        }
        for entry in empty {
            octants.push(Octant {
                key: entry.key,
                offset: 0..0,
                position: position..position,
                bounds: entry.key.bounds(&root_bounds),
            });
            max_depth = max_depth.max(entry.key.depth);
        }
        if position != declared_points {
            warn!(
                "the hierarchy holds {position} points but the header declares {declared_points}"
            );
        }
        let by_key = octants
            .iter()
            .enumerate()
            .map(|(index, octant)| (octant.key, index))
            .collect();
        CopcIndex {
            root_bounds,
            spacing,
            max_depth,
            octants,
            by_key,
        }
    }

    /// Builds the index from a header carrying COPC metadata.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::{index::CopcIndex, Header};
    /// assert!(CopcIndex::from_header(&Header::default()).is_err());
    /// ```
    pub fn from_header(header: &Header) -> Result<CopcIndex> {
        let info = header.copc_info()?;
        let entries = header.copc_hierarchy_entries()?;
        Ok(CopcIndex::new(
            info.root_bounds(),
            info.spacing,
            entries,
            header.number_of_points,
        ))
    }

    /// Builds the index over a header without COPC metadata, cubing the
    /// header's bounding box into the root node.
    ///
    /// This is the fallback for hierarchies recovered from elsewhere than
    /// an info vlr (e.g. external tooling over a pre-1.4 file).
    pub fn with_header_bounds(header: &Header, spacing: f64, entries: Vec<Entry>) -> CopcIndex {
        let bounds = header.bounds;
        let edge = (bounds.max.x - bounds.min.x)
            .max(bounds.max.y - bounds.min.y)
            .max(bounds.max.z - bounds.min.z);
        let root_bounds = Bounds::new(
            bounds.min.x,
            bounds.min.y,
            bounds.min.z,
            bounds.min.x + edge,
            bounds.min.y + edge,
            bounds.min.z + edge,
        );
        CopcIndex::new(root_bounds, spacing, entries, header.number_of_points)
    }

    /// The cube of the root node.
    pub fn root_bounds(&self) -> &Bounds {
        &self.root_bounds
    }

    /// The point spacing at the root node.
    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// The deepest level present in the hierarchy.
    pub fn max_depth(&self) -> i32 {
        self.max_depth
    }

    /// Every octant in the registry, loadable ones first, sorted by file
    /// address.
    pub fn octants(&self) -> &[Octant] {
        &self.octants
    }

    /// The shallowest depth whose point spacing is at most `resolution`.
    ///
    /// The root spacing halves at each level; the walk stops at the
    /// hierarchy's deepest level.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lasstream::{copc::{Entry, VoxelKey}, index::CopcIndex, Bounds};
    /// let entries = vec![
    ///     Entry { key: VoxelKey::ROOT, offset: 1000, byte_size: 100, point_count: 10 },
    ///     Entry { key: VoxelKey::ROOT.child(0).unwrap(), offset: 1100, byte_size: 100, point_count: 10 },
    /// ];
    /// let index = CopcIndex::new(Bounds::new(0., 0., 0., 8., 8., 8.), 4., entries, 20);
    /// assert_eq!(0, index.depth_for_resolution(5.));
    /// assert_eq!(1, index.depth_for_resolution(2.));
    /// assert_eq!(1, index.depth_for_resolution(0.001));
    /// ```
    pub fn depth_for_resolution(&self, resolution: f64) -> i32 {
        let mut spacing = self.spacing;
        let mut depth = 0;
        while spacing > resolution && depth < self.max_depth {
            spacing /= 2.;
            depth += 1;
        }
        depth
    }

    /// Starts building a query against this index.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lasstream::{copc::{Entry, VoxelKey}, index::CopcIndex, Bounds};
    /// # let entries = vec![
    /// #     Entry { key: VoxelKey::ROOT, offset: 1000, byte_size: 100, point_count: 10 },
    /// # ];
    /// # let index = CopcIndex::new(Bounds::new(0., 0., 0., 8., 8., 8.), 4., entries, 10);
    /// let intervals = index.query().depth_limit(1).all();
    /// assert_eq!(10, intervals.total_points());
    /// ```
    pub fn query(&self) -> Query<'_> {
        Query {
            index: self,
            depth_limit: None,
            order: StreamOrder::default(),
        }
    }
}

/// A builder for one octree query.
///
/// Configure the depth (or resolution) limit and the stream order, then
/// finish with one of the region methods to get the matching [Intervals].
#[derive(Clone, Copy, Debug)]
pub struct Query<'a> {
    index: &'a CopcIndex,
    depth_limit: Option<i32>,
    order: StreamOrder,
}

#[derive(Clone, Copy, Debug)]
enum Region {
    All,
    Rectangle {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    },
    Circle {
        x: f64,
        y: f64,
        radius: f64,
    },
    Cuboid(Bounds),
    Sphere {
        x: f64,
        y: f64,
        z: f64,
        radius: f64,
    },
}

impl Region {
    fn intersects(&self, bounds: &Bounds) -> bool {
        match *self {
            Region::All => true,
            Region::Rectangle {
                min_x,
                min_y,
                max_x,
                max_y,
            } => {
                bounds.min.x <= max_x
                    && bounds.max.x >= min_x
                    && bounds.min.y <= max_y
                    && bounds.max.y >= min_y
            }
            Region::Circle { x, y, radius } => {
                let dx = x - x.clamp(bounds.min.x, bounds.max.x);
                let dy = y - y.clamp(bounds.min.y, bounds.max.y);
                dx * dx + dy * dy <= radius * radius
            }
            Region::Cuboid(cuboid) => bounds.intersects(&cuboid),
            Region::Sphere { x, y, z, radius } => {
                let dx = x - x.clamp(bounds.min.x, bounds.max.x);
                let dy = y - y.clamp(bounds.min.y, bounds.max.y);
                let dz = z - z.clamp(bounds.min.z, bounds.max.z);
                dx * dx + dy * dy + dz * dz <= radius * radius
            }
        }
    }
}

impl<'a> Query<'a> {
    /// Limits the query to octree levels at most `depth`.
    pub fn depth_limit(mut self, depth: i32) -> Query<'a> {
        self.depth_limit = Some(depth);
        self
    }

    /// Limits the query to the shallowest depth resolving `resolution`.
    pub fn resolution(mut self, resolution: f64) -> Query<'a> {
        self.depth_limit = Some(self.index.depth_for_resolution(resolution));
        self
    }

    /// Sets the stream order of the matched octants.
    pub fn order(mut self, order: StreamOrder) -> Query<'a> {
        self.order = order;
        self
    }

    /// Matches the whole volume.
    pub fn all(self) -> Intervals {
        self.intervals(Region::All)
    }

    /// Matches octants intersecting an xy rectangle.
    pub fn rectangle(self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Intervals {
        self.intervals(Region::Rectangle {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    /// Matches octants intersecting an xy circle.
    pub fn circle(self, x: f64, y: f64, radius: f64) -> Intervals {
        self.intervals(Region::Circle { x, y, radius })
    }

    /// Matches octants intersecting a cuboid.
    pub fn cuboid(self, bounds: Bounds) -> Intervals {
        self.intervals(Region::Cuboid(bounds))
    }

    /// Matches octants intersecting a sphere.
    pub fn sphere(self, x: f64, y: f64, z: f64, radius: f64) -> Intervals {
        self.intervals(Region::Sphere { x, y, z, radius })
    }

    fn intervals(self, region: Region) -> Intervals {
        let mut matches = Vec::new();
        self.descend(VoxelKey::ROOT, &region, &mut matches);
        let octants = &self.index.octants;
        match self.order {
            StreamOrder::Address => {
                matches.sort_by_key(|&index| octants[index].offset.start);
            }
            StreamOrder::Spatial => {
                let max_depth = self.index.max_depth.min(31);
                matches.sort_by_key(|&index| {
                    let key = &octants[index].key;
                    let shift = (max_depth - key.depth).clamp(0, 31) as u32;
                    (
                        (key.y as u64) << shift,
                        (key.x as u64) << shift,
                        key.depth,
                    )
                });
            }
            StreamOrder::Depth => {
                matches.sort_by_key(|&index| (octants[index].key.depth, octants[index].offset.start));
            }
        }
        let mut intervals = Intervals::default();
        for index in matches {
            let octant = &octants[index];
            intervals.push(octant.position.clone(), Some(octant.offset.clone()));
        }
        intervals
    }

    fn descend(&self, key: VoxelKey, region: &Region, matches: &mut Vec<usize>) {
        if let Some(limit) = self.depth_limit {
            if key.depth > limit {
                return;
            }
        }
        let Some(&index) = self.index.by_key.get(&key) else {
            return;
        };
        let octant = &self.index.octants[index];
        if !region.intersects(&octant.bounds) {
            return;
        }
        if octant.is_loadable() {
            matches.push(index);
        }
        for direction in 0..8 {
            if let Ok(child) = key.child(direction) {
                self.descend(child, region, matches);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: VoxelKey, offset: u64, byte_size: i32, point_count: i32) -> Entry {
        Entry {
            key,
            offset,
            byte_size,
            point_count,
        }
    }

    /// A two-level octree: a root with 10 points and four populated
    /// children in the lower-z half, laid out contiguously on disk.
    fn two_level_index() -> CopcIndex {
        let root = VoxelKey::ROOT;
        let mut entries = vec![entry(root, 1000, 100, 10)];
        for direction in 0..4 {
            entries.push(entry(
                root.child(direction).unwrap(),
                1100 + u64::from(direction as u32) * 100,
                100,
                25,
            ));
        }
        // An empty interior node with a populated child below it.
        let empty = root.child(4).unwrap();
        entries.push(entry(empty, 0, 0, 0));
        entries.push(entry(empty.child(0).unwrap(), 1500, 100, 5));
        CopcIndex::new(Bounds::new(0., 0., 0., 8., 8., 8.), 4., entries, 115)
    }

    #[test]
    fn full_volume_coverage() {
        let index = two_level_index();
        let intervals = index.query().all();
        assert_eq!(115, intervals.total_points());
        // Contiguous on disk, so everything merges into one range.
        assert_eq!(1, intervals.len());
        assert_eq!(&[0..115], intervals.point_ranges());
    }

    #[test]
    fn depth_limit_prunes() {
        let index = two_level_index();
        assert_eq!(10, index.query().depth_limit(0).all().total_points());
        assert_eq!(110, index.query().depth_limit(1).all().total_points());
        assert_eq!(115, index.query().depth_limit(2).all().total_points());
    }

    #[test]
    fn depth_coverage_is_monotonic() {
        let index = two_level_index();
        let mut last = 0;
        for depth in 0..=index.max_depth() {
            let points = index.query().depth_limit(depth).all().total_points();
            assert!(points >= last, "depth {depth}");
            last = points;
        }
    }

    #[test]
    fn region_prunes_but_navigates_empty_nodes() {
        let index = two_level_index();
        // The lower-z half holds the root and its four populated children;
        // the empty node's subtree sits entirely above it.
        let lower = index
            .query()
            .cuboid(Bounds::new(0., 0., 0., 8., 8., 3.9))
            .total_points();
        assert_eq!(110, lower);
        // The upper-z half only ever intersects the root and the empty
        // node's subtree.
        let upper = index
            .query()
            .cuboid(Bounds::new(0., 0., 6., 8., 8., 8.))
            .total_points();
        assert_eq!(15, upper);
    }

    #[test]
    fn disjoint_region_matches_nothing() {
        let index = two_level_index();
        assert!(index.query().rectangle(100., 100., 101., 101.).is_empty());
        assert!(index.query().circle(100., 100., 1.).is_empty());
        assert!(index.query().sphere(100., 100., 100., 1.).is_empty());
    }

    #[test]
    fn stream_orders() {
        let index = two_level_index();
        let by_address = index.query().order(StreamOrder::Address).all();
        assert_eq!(&[1000..1600], by_address.address_ranges());
        let by_depth = index.query().order(StreamOrder::Depth).all();
        assert_eq!(115, by_depth.total_points());
        let spatial = index.query().order(StreamOrder::Spatial).all();
        assert_eq!(115, spatial.total_points());
    }

    #[test]
    fn header_bounds_fallback_cubes_the_box() {
        let header = Header {
            bounds: Bounds::new(0., 0., 0., 8., 4., 2.),
            number_of_points: 10,
            ..Default::default()
        };
        let entries = vec![entry(VoxelKey::ROOT, 1000, 100, 10)];
        let index = CopcIndex::with_header_bounds(&header, 4., entries);
        assert_eq!(&Bounds::new(0., 0., 0., 8., 8., 8.), index.root_bounds());
        assert_eq!(10, index.query().all().total_points());
    }

    #[test]
    fn count_mismatch_still_queries() {
        let entries = vec![entry(VoxelKey::ROOT, 1000, 100, 10)];
        // Declared 999 points; the hierarchy only holds 10. Warn, proceed.
        let index = CopcIndex::new(Bounds::new(0., 0., 0., 1., 1., 1.), 1., entries, 999);
        assert_eq!(10, index.query().all().total_points());
    }
}
