//! Three-dimensional points with additional attributes.

mod extra;
mod format;

pub use extra::{Attribute, AttributeKind, AttributeTable};
pub use format::Format;

use crate::raw::point::{Flags, ScanAngle, SCAN_ANGLE_SCALE_FACTOR};
use crate::{raw, Color, Result, Transform, Vector};

/// A point is the basic unit of information in LAS data.
///
/// The coordinates are real-world `f64` values -- the file-local fixed-point
/// integers have already been sent through the header's
/// [Transforms](crate::Transform). Two generations of point records exist:
/// legacy (formats 0 to 3, five-bit classifications and up to five returns)
/// and extended (formats 6 and up). `is_extended` records which generation a
/// point was decoded from, and every predicate in this crate dispatches on
/// it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Point {
    /// The x coordinate, as a float.
    pub x: f64,

    /// The y coordinate, as a float.
    pub y: f64,

    /// The z coordinate, as a float.
    pub z: f64,

    /// The integer representation of the pulse return magnitude.
    ///
    /// This value is optional and system specific, but should be included
    /// when available. Since zero could be valid intensity, we don't wrap
    /// this in an `Option`.
    pub intensity: u16,

    /// The pulse return number for a given output pulse.
    pub return_number: u8,

    /// The total number of returns for a given pulse.
    pub number_of_returns: u8,

    /// The direction at which the scanner mirror was traveling at the time
    /// of the output pulse.
    pub scan_direction: ScanDirection,

    /// True if the point is at the end of a scan.
    pub is_edge_of_flight_line: bool,

    /// The ASPRS classification of this point.
    ///
    /// Legacy points only use the lower five bits; extended points use the
    /// whole byte.
    pub classification: u8,

    /// This point was created by a technique other than LiDAR collection.
    pub is_synthetic: bool,

    /// The point should be considered a model key-point.
    pub is_key_point: bool,

    /// The point should be considered withheld (i.e. it's deleted).
    pub is_withheld: bool,

    /// The point lies in the overlap region of two or more swaths.
    pub is_overlap: bool,

    /// The channel (scanner head) of a multi-channel system.
    ///
    /// Always zero for legacy points.
    pub scanner_channel: u8,

    /// The angle of the output of the laser pulse, in degrees.
    ///
    /// Zero degrees is nadir, -90° is to the left. Legacy points round this
    /// to whole degrees, extended points store it in 0.006° increments.
    pub scan_angle: f32,

    /// Used at the user's discretion.
    pub user_data: u8,

    /// The file from which this point originated.
    pub point_source_id: u16,

    /// The time at which the point was acquired.
    pub gps_time: Option<f64>,

    /// This point's color.
    pub color: Option<Color>,

    /// This point's near-infrared value.
    pub nir: Option<u16>,

    /// This point's extra bytes, still raw.
    ///
    /// Use an [AttributeTable] to interpret them.
    pub extra_bytes: Vec<u8>,

    /// Was this point decoded from an extended point record (format 6+)?
    pub is_extended: bool,
}

impl Point {
    /// Creates a point from a raw point and the header's transforms.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lasstream::{raw, Point};
    /// let point = Point::new(raw::Point::default(), &Default::default());
    /// assert_eq!(0., point.x);
    /// ```
    pub fn new(raw_point: raw::Point, transforms: &Vector<Transform>) -> Point {
        let flags = raw_point.flags;
        Point {
            x: transforms.x.direct(raw_point.x),
            y: transforms.y.direct(raw_point.y),
            z: transforms.z.direct(raw_point.z),
            intensity: raw_point.intensity,
            return_number: flags.return_number(),
            number_of_returns: flags.number_of_returns(),
            scan_direction: if flags.is_scan_direction_left_to_right() {
                ScanDirection::LeftToRight
            } else {
                ScanDirection::RightToLeft
            },
            is_edge_of_flight_line: flags.is_edge_of_flight_line(),
            classification: flags.classification(),
            is_synthetic: flags.is_synthetic(),
            is_key_point: flags.is_key_point(),
            is_withheld: flags.is_withheld(),
            is_overlap: flags.is_overlap(),
            scanner_channel: flags.scanner_channel(),
            scan_angle: raw_point.scan_angle.into(),
            user_data: raw_point.user_data,
            point_source_id: raw_point.point_source_id,
            gps_time: raw_point.gps_time,
            color: raw_point.color,
            nir: raw_point.nir,
            extra_bytes: raw_point.extra_bytes,
            is_extended: matches!(flags, Flags::ThreeByte(..)),
        }
    }

    /// Converts this point into a raw point, quantizing the coordinates.
    ///
    /// Returns an error if a coordinate does not fit the fixed-point range.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lasstream::Point;
    /// let point = Point { x: 1., ..Default::default() };
    /// let raw_point = point.into_raw(&Default::default()).unwrap();
    /// assert_eq!(1000, raw_point.x);
    /// ```
    pub fn into_raw(self, transforms: &Vector<Transform>) -> Result<raw::Point> {
        let flags = if self.is_extended {
            let mut b = 0;
            if self.is_synthetic {
                b |= 1;
            }
            if self.is_key_point {
                b |= 2;
            }
            if self.is_withheld {
                b |= 4;
            }
            if self.is_overlap {
                b |= 8;
            }
            b |= (self.scanner_channel & 3) << 4;
            if self.scan_direction == ScanDirection::LeftToRight {
                b |= 0x40;
            }
            if self.is_edge_of_flight_line {
                b |= 0x80;
            }
            Flags::ThreeByte(
                (self.return_number & 15) | (self.number_of_returns << 4),
                b,
                self.classification,
            )
        } else {
            let mut a = (self.return_number & 7) | ((self.number_of_returns & 7) << 3);
            if self.scan_direction == ScanDirection::LeftToRight {
                a |= 0x40;
            }
            if self.is_edge_of_flight_line {
                a |= 0x80;
            }
            let mut b = self.classification & 0b1_1111;
            if self.is_synthetic {
                b |= 0x20;
            }
            if self.is_key_point {
                b |= 0x40;
            }
            if self.is_withheld {
                b |= 0x80;
            }
            Flags::TwoByte(a, b)
        };
        let scan_angle = if self.is_extended {
            ScanAngle::Scaled((self.scan_angle / SCAN_ANGLE_SCALE_FACTOR).round() as i16)
        } else {
            ScanAngle::Rank(self.scan_angle.round() as i8)
        };
        Ok(raw::Point {
            x: transforms.x.inverse(self.x)?,
            y: transforms.y.inverse(self.y)?,
            z: transforms.z.inverse(self.z)?,
            intensity: self.intensity,
            flags,
            scan_angle,
            user_data: self.user_data,
            point_source_id: self.point_source_id,
            gps_time: self.gps_time,
            color: self.color,
            nir: self.nir,
            extra_bytes: self.extra_bytes,
        })
    }

    /// Is this the only return of its pulse?
    ///
    /// # Examples
    ///
    /// ```
    /// # use lasstream::Point;
    /// let point = Point { return_number: 1, number_of_returns: 1, ..Default::default() };
    /// assert!(point.is_only_return());
    /// ```
    pub fn is_only_return(&self) -> bool {
        self.number_of_returns <= 1
    }

    /// Is this the first of several returns?
    pub fn is_first_of_many(&self) -> bool {
        self.number_of_returns > 1 && self.return_number == 1
    }

    /// Is this the last of several returns?
    pub fn is_last_of_many(&self) -> bool {
        self.number_of_returns > 1 && self.return_number >= self.number_of_returns
    }

    /// Is this neither the first nor the last of several returns?
    ///
    /// # Examples
    ///
    /// ```
    /// # use lasstream::Point;
    /// let point = Point { return_number: 2, number_of_returns: 3, ..Default::default() };
    /// assert!(point.is_intermediate());
    /// ```
    pub fn is_intermediate(&self) -> bool {
        self.number_of_returns > 1
            && self.return_number > 1
            && self.return_number < self.number_of_returns
    }
}

/// The direction at which the scanner mirror was traveling at the time of
/// pulse output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScanDirection {
    /// The scan is moving from the right to the left.
    #[default]
    RightToLeft,
    /// The scan is moving from the left to the right.
    LeftToRight,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_classes() {
        let mut point = Point {
            return_number: 1,
            number_of_returns: 1,
            ..Default::default()
        };
        assert!(point.is_only_return());
        assert!(!point.is_first_of_many());
        assert!(!point.is_last_of_many());
        assert!(!point.is_intermediate());

        point.number_of_returns = 3;
        assert!(point.is_first_of_many());
        point.return_number = 2;
        assert!(point.is_intermediate());
        point.return_number = 3;
        assert!(point.is_last_of_many());
    }

    #[test]
    fn raw_round_trip() {
        let point = Point {
            x: 1.,
            y: -2.,
            z: 3.,
            intensity: 11,
            return_number: 2,
            number_of_returns: 7,
            classification: 200,
            is_withheld: true,
            is_overlap: true,
            scanner_channel: 1,
            scan_angle: 30.0f32,
            gps_time: Some(42.),
            is_extended: true,
            ..Default::default()
        };
        let transform = Transform {
            scale: 0.001,
            offset: 0.,
        };
        let transforms = Vector {
            x: transform,
            y: transform,
            z: transform,
        };
        let round_tripped = Point::new(point.clone().into_raw(&transforms).unwrap(), &transforms);
        assert_eq!(point, round_tripped);
    }
}
