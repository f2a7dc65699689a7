//! Per-point predicates, composed into an ordered chain.
//!
//! A [Filter] is a list of independent [Criterion] objects; a point is
//! dropped by the first criterion that matches it. Criteria are configured
//! once when a reader is opened and reused, unchanged, across every point
//! of every pass -- they carry no per-point state.

use crate::point::AttributeTable;
use crate::{Point, Selective};
use std::fmt;

/// One per-point predicate.
///
/// Implementations must also report, via [decompress_selective
/// ](Criterion::decompress_selective), which on-disk fields they read, so a
/// compressed backend can skip materializing everything else.
pub trait Criterion: fmt::Debug + Send + Sync {
    /// The name of this criterion.
    fn name(&self) -> &'static str;

    /// Returns true if the point should be dropped.
    fn filter(&self, point: &Point) -> bool;

    /// Which on-disk fields this criterion reads.
    fn decompress_selective(&self) -> Selective {
        Selective::CHANNEL_RETURNS_XY
    }
}

/// An ordered chain of criteria.
///
/// # Examples
///
/// ```
/// use lasstream::filter::{Filter, KeepZ};
/// use lasstream::Point;
///
/// let mut filter = Filter::new();
/// filter.push(KeepZ { min: 0., max: 10. });
/// assert!(!filter.filter(&Point { z: 5., ..Default::default() }));
/// assert!(filter.filter(&Point { z: 15., ..Default::default() }));
/// ```
#[derive(Debug, Default)]
pub struct Filter {
    criteria: Vec<Box<dyn Criterion>>,
}

impl Filter {
    /// Creates an empty filter which keeps everything.
    pub fn new() -> Filter {
        Filter::default()
    }

    /// Appends a criterion to the chain.
    pub fn push<C: Criterion + 'static>(&mut self, criterion: C) {
        self.criteria.push(Box::new(criterion));
    }

    /// Returns true if the chain holds no criteria.
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// The number of criteria in the chain.
    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    /// Returns true if the point should be dropped.
    pub fn filter(&self, point: &Point) -> bool {
        self.criteria.iter().any(|criterion| criterion.filter(point))
    }

    /// The union of every criterion's field requirements.
    pub fn decompress_selective(&self) -> Selective {
        self.criteria
            .iter()
            .fold(Selective::empty(), |selective, criterion| {
                selective | criterion.decompress_selective()
            })
    }
}

/// Keeps points inside an inclusive xy rectangle.
#[derive(Clone, Copy, Debug)]
pub struct KeepXy {
    /// The minimum x value.
    pub min_x: f64,
    /// The minimum y value.
    pub min_y: f64,
    /// The maximum x value.
    pub max_x: f64,
    /// The maximum y value.
    pub max_y: f64,
}

impl Criterion for KeepXy {
    fn name(&self) -> &'static str {
        "keep_xy"
    }

    fn filter(&self, point: &Point) -> bool {
        point.x < self.min_x || point.x > self.max_x || point.y < self.min_y || point.y > self.max_y
    }
}

/// Keeps points with z inside an inclusive range.
#[derive(Clone, Copy, Debug)]
pub struct KeepZ {
    /// The minimum z value.
    pub min: f64,
    /// The maximum z value.
    pub max: f64,
}

impl Criterion for KeepZ {
    fn name(&self) -> &'static str {
        "keep_z"
    }

    fn filter(&self, point: &Point) -> bool {
        point.z < self.min || point.z > self.max
    }

    fn decompress_selective(&self) -> Selective {
        Selective::CHANNEL_RETURNS_XY | Selective::Z
    }
}

/// Drops points with z inside an inclusive range.
#[derive(Clone, Copy, Debug)]
pub struct DropZ {
    /// The minimum z value.
    pub min: f64,
    /// The maximum z value.
    pub max: f64,
}

impl Criterion for DropZ {
    fn name(&self) -> &'static str {
        "drop_z"
    }

    fn filter(&self, point: &Point) -> bool {
        point.z >= self.min && point.z <= self.max
    }

    fn decompress_selective(&self) -> Selective {
        Selective::CHANNEL_RETURNS_XY | Selective::Z
    }
}

/// Keeps points whose classification is in the set.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeepClassification([u32; 8]);

impl KeepClassification {
    /// Creates a criterion keeping the given classifications.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::filter::{Criterion, KeepClassification};
    /// use lasstream::Point;
    /// let keep = KeepClassification::new([2, 6]);
    /// assert!(!keep.filter(&Point { classification: 2, ..Default::default() }));
    /// assert!(keep.filter(&Point { classification: 3, ..Default::default() }));
    /// ```
    pub fn new<I: IntoIterator<Item = u8>>(classifications: I) -> KeepClassification {
        let mut masks = [0u32; 8];
        for classification in classifications {
            masks[usize::from(classification >> 5)] |= 1 << (classification & 31);
        }
        KeepClassification(masks)
    }

    fn contains(&self, point: &Point) -> bool {
        let classification = if point.is_extended {
            point.classification
        } else {
            point.classification & 31
        };
        self.0[usize::from(classification >> 5)] & (1 << (classification & 31)) != 0
    }
}

impl Criterion for KeepClassification {
    fn name(&self) -> &'static str {
        "keep_classification"
    }

    fn filter(&self, point: &Point) -> bool {
        !self.contains(point)
    }

    fn decompress_selective(&self) -> Selective {
        Selective::CHANNEL_RETURNS_XY | Selective::CLASSIFICATION
    }
}

/// Drops points whose classification is in the set.
#[derive(Clone, Copy, Debug, Default)]
pub struct DropClassification(KeepClassification);

impl DropClassification {
    /// Creates a criterion dropping the given classifications.
    pub fn new<I: IntoIterator<Item = u8>>(classifications: I) -> DropClassification {
        DropClassification(KeepClassification::new(classifications))
    }
}

impl Criterion for DropClassification {
    fn name(&self) -> &'static str {
        "drop_classification"
    }

    fn filter(&self, point: &Point) -> bool {
        self.0.contains(point)
    }

    fn decompress_selective(&self) -> Selective {
        Selective::CHANNEL_RETURNS_XY | Selective::CLASSIFICATION
    }
}

/// Keeps points with intensity inside an inclusive range.
#[derive(Clone, Copy, Debug)]
pub struct KeepIntensity {
    /// The minimum intensity.
    pub min: u16,
    /// The maximum intensity.
    pub max: u16,
}

impl Criterion for KeepIntensity {
    fn name(&self) -> &'static str {
        "keep_intensity"
    }

    fn filter(&self, point: &Point) -> bool {
        point.intensity < self.min || point.intensity > self.max
    }

    fn decompress_selective(&self) -> Selective {
        Selective::CHANNEL_RETURNS_XY | Selective::INTENSITY
    }
}

/// Keeps first returns (the first of many, or the only return).
#[derive(Clone, Copy, Debug)]
pub struct KeepFirst;

impl Criterion for KeepFirst {
    fn name(&self) -> &'static str {
        "keep_first"
    }

    fn filter(&self, point: &Point) -> bool {
        point.return_number > 1
    }
}

/// Keeps last returns (the last of many, or the only return).
#[derive(Clone, Copy, Debug)]
pub struct KeepLast;

impl Criterion for KeepLast {
    fn name(&self) -> &'static str {
        "keep_last"
    }

    fn filter(&self, point: &Point) -> bool {
        point.return_number < point.number_of_returns
    }
}

/// Drops withheld points.
#[derive(Clone, Copy, Debug)]
pub struct DropWithheld;

impl Criterion for DropWithheld {
    fn name(&self) -> &'static str {
        "drop_withheld"
    }

    fn filter(&self, point: &Point) -> bool {
        point.is_withheld
    }

    fn decompress_selective(&self) -> Selective {
        Selective::CHANNEL_RETURNS_XY | Selective::FLAGS
    }
}

/// Keeps points with gps time inside an inclusive range.
#[derive(Clone, Copy, Debug)]
pub struct KeepGpsTime {
    /// The minimum gps time.
    pub min: f64,
    /// The maximum gps time.
    pub max: f64,
}

impl Criterion for KeepGpsTime {
    fn name(&self) -> &'static str {
        "keep_gps_time"
    }

    fn filter(&self, point: &Point) -> bool {
        point
            .gps_time
            .map_or(true, |gps_time| gps_time < self.min || gps_time > self.max)
    }

    fn decompress_selective(&self) -> Selective {
        Selective::CHANNEL_RETURNS_XY | Selective::GPS_TIME
    }
}

/// Keeps points from the given point source.
#[derive(Clone, Copy, Debug)]
pub struct KeepPointSource(pub u16);

impl Criterion for KeepPointSource {
    fn name(&self) -> &'static str {
        "keep_point_source"
    }

    fn filter(&self, point: &Point) -> bool {
        point.point_source_id != self.0
    }

    fn decompress_selective(&self) -> Selective {
        Selective::CHANNEL_RETURNS_XY | Selective::POINT_SOURCE
    }
}

/// Keeps points whose extra-bytes attribute is inside an inclusive range.
///
/// Points without a decodable value (truncated record, no-data sentinel)
/// are dropped.
#[derive(Debug)]
pub struct KeepAttributeBetween {
    /// The attribute table of the file being read.
    pub table: AttributeTable,
    /// The attribute index in the table.
    pub index: usize,
    /// The minimum attribute value.
    pub min: f64,
    /// The maximum attribute value.
    pub max: f64,
}

impl Criterion for KeepAttributeBetween {
    fn name(&self) -> &'static str {
        "keep_attribute_between"
    }

    fn filter(&self, point: &Point) -> bool {
        self.table
            .value(self.index, point)
            .map_or(true, |value| value < self.min || value > self.max)
    }

    fn decompress_selective(&self) -> Selective {
        Selective::CHANNEL_RETURNS_XY | Selective::extra_byte(self.index)
    }
}
