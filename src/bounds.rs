use crate::transform::RoundingMode;
use crate::{Point, Result, Transform, Vector};

/// Minimum and maximum bounds in three dimensions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    /// The minimum values.
    pub min: Vector<f64>,

    /// The maximum values.
    pub max: Vector<f64>,
}

impl Bounds {
    /// Creates bounds from min and max corner values.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lasstream::Bounds;
    /// let bounds = Bounds::new(0., 0., 0., 1., 1., 1.);
    /// assert_eq!(1., bounds.max.z);
    /// ```
    pub fn new(min_x: f64, min_y: f64, min_z: f64, max_x: f64, max_y: f64, max_z: f64) -> Bounds {
        Bounds {
            min: Vector {
                x: min_x,
                y: min_y,
                z: min_z,
            },
            max: Vector {
                x: max_x,
                y: max_y,
                z: max_z,
            },
        }
    }

    /// Grows the bounds to encompass this point in xyz space.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lasstream::{Bounds, Point};
    /// let point = Point { x: 1., y: 2., z: 3., ..Default::default() };
    /// let mut bounds = Bounds::default();
    /// bounds.grow(&point);
    /// assert_eq!(1., bounds.min.x);
    /// ```
    pub fn grow(&mut self, point: &Point) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    /// Grows the bounds to encompass other bounds.
    pub fn extend(&mut self, other: &Bounds) {
        self.min.x = self.min.x.min(other.min.x);
        self.min.y = self.min.y.min(other.min.y);
        self.min.z = self.min.z.min(other.min.z);
        self.max.x = self.max.x.max(other.max.x);
        self.max.y = self.max.y.max(other.max.y);
        self.max.z = self.max.z.max(other.max.z);
    }

    /// Returns true if these bounds intersect the other bounds.
    ///
    /// Touching bounds intersect.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lasstream::Bounds;
    /// let a = Bounds::new(0., 0., 0., 1., 1., 1.);
    /// let b = Bounds::new(1., 1., 1., 2., 2., 2.);
    /// let c = Bounds::new(1.5, 1.5, 1.5, 2., 2., 2.);
    /// assert!(a.intersects(&b));
    /// assert!(!a.intersects(&c));
    /// ```
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Returns the intersection of these bounds with the other bounds.
    ///
    /// If the bounds are disjoint the result has an inverted extent on at
    /// least one axis.
    pub fn intersection(&self, other: &Bounds) -> Bounds {
        Bounds {
            min: Vector {
                x: self.min.x.max(other.min.x),
                y: self.min.y.max(other.min.y),
                z: self.min.z.max(other.min.z),
            },
            max: Vector {
                x: self.max.x.min(other.max.x),
                y: self.max.y.min(other.max.y),
                z: self.max.z.min(other.max.z),
            },
        }
    }

    /// Snaps the bounds outward onto the transforms' quantization grid.
    ///
    /// Minimums floor and maximums ceil, so no point that quantizes cleanly
    /// can land outside the adapted box due to floating-point fuzz.
    /// Infinite bounds (an empty default box) pass through untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::Bounds;
    ///
    /// let bounds = Bounds::new(-2.7868, -0.9322, -5.8063, 0.6091, 1.5428, -0.0944);
    /// // The default scale is 0.001.
    /// let adapted = bounds.adapt(&Default::default()).unwrap();
    /// assert_eq!(-0.094, adapted.max.z);
    /// ```
    pub fn adapt(&self, transforms: &Vector<Transform>) -> Result<Bounds> {
        fn snap(transform: &Transform, n: f64, mode: RoundingMode) -> Result<f64> {
            if n.is_infinite() {
                return Ok(n);
            }
            Ok(transform.direct(transform.inverse_with_rounding_mode(n, mode)?))
        }

        Ok(Bounds {
            min: Vector {
                x: snap(&transforms.x, self.min.x, RoundingMode::Floor)?,
                y: snap(&transforms.y, self.min.y, RoundingMode::Floor)?,
                z: snap(&transforms.z, self.min.z, RoundingMode::Floor)?,
            },
            max: Vector {
                x: snap(&transforms.x, self.max.x, RoundingMode::Ceil)?,
                y: snap(&transforms.y, self.max.y, RoundingMode::Ceil)?,
                z: snap(&transforms.z, self.max.z, RoundingMode::Ceil)?,
            },
        })
    }

    /// Returns true if the point (in xyz space) lies inside or on these bounds.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lasstream::Bounds;
    /// let bounds = Bounds::new(0., 0., 0., 1., 1., 1.);
    /// assert!(bounds.contains(0.5, 0.5, 1.));
    /// assert!(!bounds.contains(0.5, 0.5, 1.1));
    /// ```
    pub fn contains(&self, x: f64, y: f64, z: f64) -> bool {
        self.min.x <= x
            && x <= self.max.x
            && self.min.y <= y
            && y <= self.max.y
            && self.min.z <= z
            && z <= self.max.z
    }
}

impl Default for Bounds {
    fn default() -> Bounds {
        Bounds {
            min: Vector {
                x: f64::INFINITY,
                y: f64::INFINITY,
                z: f64::INFINITY,
            },
            max: Vector {
                x: f64::NEG_INFINITY,
                y: f64::NEG_INFINITY,
                z: f64::NEG_INFINITY,
            },
        }
    }
}
