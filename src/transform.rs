use crate::{Error, Result};
use std::fmt;

/// A scale and an offset that transforms xyz coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// The scale.
    pub scale: f64,
    /// The offset.
    pub offset: f64,
}

/// How to round a real-world value when quantizing it.
#[derive(Clone, Copy, Debug)]
pub(crate) enum RoundingMode {
    /// Round to the nearest integer.
    Round,
    /// Round down.
    Floor,
    /// Round up.
    Ceil,
}

impl Transform {
    /// Applies this transform to an i32, returning a float.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lasstream::Transform;
    /// let transform = Transform { scale: 2., offset: 1. };
    /// assert_eq!(3., transform.direct(1));
    /// ```
    pub fn direct(&self, n: i32) -> f64 {
        self.scale * f64::from(n) + self.offset
    }

    /// Applies the inverse transform, rounding the result.
    ///
    /// Returns an error if the resultant value can't be represented as an i32.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lasstream::Transform;
    /// let transform = Transform { scale: 2., offset: 1. };
    /// assert_eq!(1, transform.inverse(2.9).unwrap());
    /// ```
    pub fn inverse(&self, n: f64) -> Result<i32> {
        self.inverse_with_rounding_mode(n, RoundingMode::Round)
    }

    pub(crate) fn inverse_with_rounding_mode(&self, n: f64, mode: RoundingMode) -> Result<i32> {
        let n = match mode {
            RoundingMode::Round => ((n - self.offset) / self.scale).round(),
            RoundingMode::Floor => ((n - self.offset) / self.scale).floor(),
            RoundingMode::Ceil => ((n - self.offset) / self.scale).ceil(),
        };
        if n > f64::from(i32::MAX) || n < f64::from(i32::MIN) || n.is_nan() {
            Err(Error::InverseTransform {
                value: n,
                transform: *self,
            })
        } else {
            Ok(n as i32)
        }
    }
}

impl Default for Transform {
    fn default() -> Transform {
        Transform {
            scale: 0.001,
            offset: 0.,
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{} * x + {}`", self.scale, self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let transform = Transform {
            scale: 0.01,
            offset: 100.,
        };
        assert_eq!(142, transform.inverse(transform.direct(142)).unwrap());
    }

    #[test]
    fn overflow() {
        let transform = Transform {
            scale: 1e-9,
            offset: 0.,
        };
        assert!(transform.inverse(1e10).is_err());
        assert!(transform.inverse(-1e10).is_err());
    }
}
