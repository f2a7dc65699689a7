//! Per-point mutating operations, composed into an ordered chain.
//!
//! A [Mutator] rewrites points in place: translations, rescales, affine
//! transforms, attribute edits. Coordinate mutations must land inside the
//! file's fixed-point range; a result that doesn't is clamped and counted
//! rather than failing the read, and the accumulated overflow count is
//! surfaced when the owning reader shuts down.
//!
//! A mutator can also take ownership of a [Filter]: in that mode the
//! mutations apply only to points the filter keeps, but every point is
//! still yielded downstream.

use crate::{Filter, Point, Selective, Transform, Vector};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// One per-point mutating operation.
pub trait Mutation: fmt::Debug + Send + Sync {
    /// The name of this mutation.
    fn name(&self) -> &'static str;

    /// Mutates the point in place.
    ///
    /// Returns true if the result had to be clamped to the fixed-point
    /// range described by `transforms`.
    fn mutate(&self, point: &mut Point, transforms: &Vector<Transform>) -> bool;

    /// Which on-disk fields this mutation touches.
    fn decompress_selective(&self) -> Selective {
        Selective::CHANNEL_RETURNS_XY
    }
}

/// An ordered chain of mutations with an overflow counter.
///
/// Mutators are shared by reference across the (possibly many) readers of a
/// batch, so the counter is internally synchronized and `mutate` takes
/// `&self`.
///
/// # Examples
///
/// ```
/// use lasstream::mutate::{Mutator, Translate};
/// use lasstream::Point;
///
/// let mut mutator = Mutator::new();
/// mutator.push(Translate { x: 1., y: 0., z: 0. });
/// let mut point = Point::default();
/// mutator.mutate(&mut point, &Default::default());
/// assert_eq!(1., point.x);
/// assert_eq!(0, mutator.overflows());
/// ```
#[derive(Debug, Default)]
pub struct Mutator {
    mutations: Vec<Box<dyn Mutation>>,
    filter: Option<Filter>,
    overflows: AtomicU64,
}

impl Mutator {
    /// Creates an empty mutator.
    pub fn new() -> Mutator {
        Mutator::default()
    }

    /// Appends a mutation to the chain.
    pub fn push<M: Mutation + 'static>(&mut self, mutation: M) {
        self.mutations.push(Box::new(mutation));
    }

    /// Makes this a filtered mutator, taking ownership of the filter.
    ///
    /// The filter decides which points get mutated; unmatched points pass
    /// through unchanged (they are *not* dropped). A filter moved in here
    /// is no longer available as an independent drop-filter -- wire it into
    /// exactly one of the two roles.
    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = Some(filter);
    }

    /// Returns true if this mutator owns a filter.
    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    /// Returns true if the chain holds no mutations.
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Mutates the point in place, counting overflows.
    pub fn mutate(&self, point: &mut Point, transforms: &Vector<Transform>) {
        if let Some(filter) = &self.filter {
            if filter.filter(point) {
                return;
            }
        }
        for mutation in &self.mutations {
            if mutation.mutate(point, transforms) {
                let _ = self.overflows.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// The number of clamped (overflowed) mutation results so far.
    pub fn overflows(&self) -> u64 {
        self.overflows.load(Ordering::Relaxed)
    }

    /// Resets the overflow counter to zero.
    ///
    /// Subsequent points are unaffected; only the diagnostic count is
    /// cleared.
    pub fn zero_overflows(&self) {
        self.overflows.store(0, Ordering::Relaxed);
    }

    /// The union of every mutation's (and the owned filter's) field
    /// requirements.
    pub fn decompress_selective(&self) -> Selective {
        let mut selective = self
            .mutations
            .iter()
            .fold(Selective::empty(), |selective, mutation| {
                selective | mutation.decompress_selective()
            });
        if let Some(filter) = &self.filter {
            selective |= filter.decompress_selective();
        }
        selective
    }
}

fn clamp(transform: &Transform, n: f64) -> (f64, bool) {
    if transform.inverse(n).is_ok() {
        (n, false)
    } else {
        let a = transform.direct(i32::MIN);
        let b = transform.direct(i32::MAX);
        (n.clamp(a.min(b), a.max(b)), true)
    }
}

/// Translates xyz coordinates.
#[derive(Clone, Copy, Debug, Default)]
pub struct Translate {
    /// The x displacement.
    pub x: f64,
    /// The y displacement.
    pub y: f64,
    /// The z displacement.
    pub z: f64,
}

impl Mutation for Translate {
    fn name(&self) -> &'static str {
        "translate"
    }

    fn mutate(&self, point: &mut Point, transforms: &Vector<Transform>) -> bool {
        let (x, x_overflowed) = clamp(&transforms.x, point.x + self.x);
        let (y, y_overflowed) = clamp(&transforms.y, point.y + self.y);
        let (z, z_overflowed) = clamp(&transforms.z, point.z + self.z);
        point.x = x;
        point.y = y;
        point.z = z;
        x_overflowed || y_overflowed || z_overflowed
    }

    fn decompress_selective(&self) -> Selective {
        Selective::CHANNEL_RETURNS_XY | Selective::Z
    }
}

/// Scales xyz coordinates about the origin.
#[derive(Clone, Copy, Debug)]
pub struct Scale {
    /// The x factor.
    pub x: f64,
    /// The y factor.
    pub y: f64,
    /// The z factor.
    pub z: f64,
}

impl Mutation for Scale {
    fn name(&self) -> &'static str {
        "scale"
    }

    fn mutate(&self, point: &mut Point, transforms: &Vector<Transform>) -> bool {
        let (x, x_overflowed) = clamp(&transforms.x, point.x * self.x);
        let (y, y_overflowed) = clamp(&transforms.y, point.y * self.y);
        let (z, z_overflowed) = clamp(&transforms.z, point.z * self.z);
        point.x = x;
        point.y = y;
        point.z = z;
        x_overflowed || y_overflowed || z_overflowed
    }

    fn decompress_selective(&self) -> Selective {
        Selective::CHANNEL_RETURNS_XY | Selective::Z
    }
}

/// A 3×3 matrix plus translation applied to xyz coordinates.
#[derive(Clone, Copy, Debug)]
pub struct Affine {
    /// The row-major 3×3 matrix.
    pub matrix: [[f64; 3]; 3],
    /// The translation, applied after the matrix.
    pub translation: Vector<f64>,
}

impl Default for Affine {
    fn default() -> Affine {
        Affine {
            matrix: [[1., 0., 0.], [0., 1., 0.], [0., 0., 1.]],
            translation: Vector::default(),
        }
    }
}

impl Mutation for Affine {
    fn name(&self) -> &'static str {
        "affine"
    }

    fn mutate(&self, point: &mut Point, transforms: &Vector<Transform>) -> bool {
        let m = &self.matrix;
        let x = m[0][0] * point.x + m[0][1] * point.y + m[0][2] * point.z + self.translation.x;
        let y = m[1][0] * point.x + m[1][1] * point.y + m[1][2] * point.z + self.translation.y;
        let z = m[2][0] * point.x + m[2][1] * point.y + m[2][2] * point.z + self.translation.z;
        let (x, x_overflowed) = clamp(&transforms.x, x);
        let (y, y_overflowed) = clamp(&transforms.y, y);
        let (z, z_overflowed) = clamp(&transforms.z, z);
        point.x = x;
        point.y = y;
        point.z = z;
        x_overflowed || y_overflowed || z_overflowed
    }

    fn decompress_selective(&self) -> Selective {
        Selective::CHANNEL_RETURNS_XY | Selective::Z
    }
}

/// Clamps z into an inclusive range.
#[derive(Clone, Copy, Debug)]
pub struct ClampZ {
    /// The minimum z value.
    pub min: f64,
    /// The maximum z value.
    pub max: f64,
}

impl Mutation for ClampZ {
    fn name(&self) -> &'static str {
        "clamp_z"
    }

    fn mutate(&self, point: &mut Point, _: &Vector<Transform>) -> bool {
        point.z = point.z.clamp(self.min, self.max);
        false
    }

    fn decompress_selective(&self) -> Selective {
        Selective::CHANNEL_RETURNS_XY | Selective::Z
    }
}

/// Overwrites the classification.
#[derive(Clone, Copy, Debug)]
pub struct SetClassification(pub u8);

impl Mutation for SetClassification {
    fn name(&self) -> &'static str {
        "set_classification"
    }

    fn mutate(&self, point: &mut Point, _: &Vector<Transform>) -> bool {
        point.classification = if point.is_extended { self.0 } else { self.0 & 31 };
        false
    }

    fn decompress_selective(&self) -> Selective {
        Selective::CHANNEL_RETURNS_XY | Selective::CLASSIFICATION
    }
}

/// Overwrites the point source id.
#[derive(Clone, Copy, Debug)]
pub struct SetPointSource(pub u16);

impl Mutation for SetPointSource {
    fn name(&self) -> &'static str {
        "set_point_source"
    }

    fn mutate(&self, point: &mut Point, _: &Vector<Transform>) -> bool {
        point.point_source_id = self.0;
        false
    }

    fn decompress_selective(&self) -> Selective {
        Selective::CHANNEL_RETURNS_XY | Selective::POINT_SOURCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::KeepZ;

    fn meter_transforms() -> Vector<Transform> {
        let transform = Transform {
            scale: 0.001,
            offset: 0.,
        };
        Vector {
            x: transform,
            y: transform,
            z: transform,
        }
    }

    #[test]
    fn overflow_counting() {
        // i32 under a millimeter scale tops out around 2.147e6, so the
        // translation below overflows exactly on the three far points.
        let mut mutator = Mutator::new();
        mutator.push(Translate {
            x: 1.5e6,
            y: 0.,
            z: 0.,
        });
        let transforms = meter_transforms();
        for i in 0..100 {
            let mut point = Point {
                x: if i % 40 == 0 { 1.0e6 } else { 0. },
                ..Default::default()
            };
            mutator.mutate(&mut point, &transforms);
        }
        assert_eq!(3, mutator.overflows());
        mutator.zero_overflows();
        assert_eq!(0, mutator.overflows());

        let mut point = Point::default();
        mutator.mutate(&mut point, &transforms);
        assert_eq!(1.5e6, point.x);
        assert_eq!(0, mutator.overflows());
    }

    #[test]
    fn overflow_clamps() {
        let mut mutator = Mutator::new();
        mutator.push(Translate {
            x: 1e10,
            y: 0.,
            z: 0.,
        });
        let transforms = meter_transforms();
        let mut point = Point::default();
        mutator.mutate(&mut point, &transforms);
        assert_eq!(1, mutator.overflows());
        assert_eq!(transforms.x.direct(i32::MAX), point.x);
    }

    #[test]
    fn filtered_mutation_edits_kept_points_only() {
        let mut filter = Filter::new();
        filter.push(KeepZ { min: 0., max: 10. });
        let mut mutator = Mutator::new();
        mutator.push(SetClassification(2));
        mutator.set_filter(filter);

        let transforms = meter_transforms();
        let mut low = Point {
            z: 5.,
            classification: 1,
            ..Default::default()
        };
        let mut high = Point {
            z: 50.,
            classification: 1,
            ..Default::default()
        };
        mutator.mutate(&mut low, &transforms);
        mutator.mutate(&mut high, &transforms);
        assert_eq!(2, low.classification);
        assert_eq!(1, high.classification);
    }

    #[test]
    fn affine_identity() {
        let mut point = Point {
            x: 1.,
            y: 2.,
            z: 3.,
            ..Default::default()
        };
        assert!(!Affine::default().mutate(&mut point, &meter_transforms()));
        assert_eq!(1., point.x);
        assert_eq!(3., point.z);
    }
}
