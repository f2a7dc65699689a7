//! Raw las points and the bit-packed structures inside them.

use crate::utils::some_or_none_if_zero;
use crate::{point::Format, Color, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

pub(crate) const SCAN_ANGLE_SCALE_FACTOR: f32 = 0.006;
const OVERLAP_CLASSIFICATION_CODE: u8 = 12;

/// A raw, uninterpreted point.
///
/// The x, y, and z values are fixed-point integers, to be interpreted via
/// the header's scale factors and offsets.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Point {
    /// The x value, in file-local fixed-point units.
    pub x: i32,
    /// The y value, in file-local fixed-point units.
    pub y: i32,
    /// The z value, in file-local fixed-point units.
    pub z: i32,
    /// The integer representation of the pulse return magnitude.
    pub intensity: u16,
    /// The bit-packed return, classification, and scan flags.
    ///
    /// Legacy formats pack these into two bytes, extended formats into
    /// three.
    pub flags: Flags,
    /// The scan angle, stored as a whole-degree rank (legacy) or in 0.006°
    /// increments (extended).
    pub scan_angle: ScanAngle,
    /// Used at the user's discretion.
    pub user_data: u8,
    /// The file from which this point originated.
    pub point_source_id: u16,
    /// The gps time, if this format has one.
    pub gps_time: Option<f64>,
    /// The color, if this format has one.
    pub color: Option<Color>,
    /// The near-infrared value, if this format has one.
    pub nir: Option<u16>,
    /// Any extra bytes.
    pub extra_bytes: Vec<u8>,
}

/// Scan angle can be stored as an i8 (rank) or i16 (scaled).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ScanAngle {
    Rank(i8),
    Scaled(i16),
}

/// The bit-packed flags of a point record.
///
/// Legacy point formats use two bytes (three-bit return numbers, five-bit
/// classifications), extended formats use three (four-bit return numbers, a
/// dedicated flag nibble, a scanner channel, and a full classification
/// byte).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flags {
    /// Two byte flags, used for point formats zero through five.
    TwoByte(u8, u8),
    /// Three byte flags, used for point formats six through ten.
    ThreeByte(u8, u8, u8),
}

impl Point {
    /// Reads a raw point in the given format.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Cursor;
    /// use lasstream::point::Format;
    /// use lasstream::raw::Point;
    /// let mut cursor = Cursor::new(vec![0; 20]);
    /// let point = Point::read_from(&mut cursor, Format::new(0).unwrap()).unwrap();
    /// ```
    pub fn read_from<R: Read>(read: &mut R, format: Format) -> Result<Point> {
        let x = read.read_i32::<LittleEndian>()?;
        let y = read.read_i32::<LittleEndian>()?;
        let z = read.read_i32::<LittleEndian>()?;
        let intensity = read.read_u16::<LittleEndian>()?;
        let flags = if format.is_extended {
            Flags::ThreeByte(read.read_u8()?, read.read_u8()?, read.read_u8()?)
        } else {
            Flags::TwoByte(read.read_u8()?, read.read_u8()?)
        };
        let scan_angle = if format.is_extended {
            ScanAngle::Scaled(read.read_i16::<LittleEndian>()?)
        } else {
            ScanAngle::Rank(read.read_i8()?)
        };
        let user_data = read.read_u8()?;
        let point_source_id = read.read_u16::<LittleEndian>()?;
        let gps_time = if format.has_gps_time {
            some_or_none_if_zero(read.read_f64::<LittleEndian>()?)
        } else {
            None
        };
        let color = if format.has_color {
            let red = read.read_u16::<LittleEndian>()?;
            let green = read.read_u16::<LittleEndian>()?;
            let blue = read.read_u16::<LittleEndian>()?;
            Some(Color::new(red, green, blue))
        } else {
            None
        };
        let nir = if format.has_nir {
            some_or_none_if_zero(read.read_u16::<LittleEndian>()?)
        } else {
            None
        };
        let mut extra_bytes = vec![0; format.extra_bytes as usize];
        read.read_exact(&mut extra_bytes)?;
        Ok(Point {
            x,
            y,
            z,
            intensity,
            flags,
            scan_angle,
            user_data,
            point_source_id,
            gps_time,
            color,
            nir,
            extra_bytes,
        })
    }

    /// Writes a raw point in the given format.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Cursor;
    /// use lasstream::point::Format;
    /// use lasstream::raw::Point;
    /// let mut cursor = Cursor::new(Vec::new());
    /// let point = Point::default();
    /// point.write_to(&mut cursor, Format::new(0).unwrap()).unwrap();
    /// ```
    pub fn write_to<W: Write>(&self, write: &mut W, format: Format) -> Result<()> {
        write.write_i32::<LittleEndian>(self.x)?;
        write.write_i32::<LittleEndian>(self.y)?;
        write.write_i32::<LittleEndian>(self.z)?;
        write.write_u16::<LittleEndian>(self.intensity)?;
        if format.is_extended {
            let (a, b, c) = self.flags.to_three_bytes();
            write.write_u8(a)?;
            write.write_u8(b)?;
            write.write_u8(c)?;
            match self.scan_angle {
                ScanAngle::Rank(n) => write.write_i16::<LittleEndian>(i16::from(n))?,
                ScanAngle::Scaled(n) => write.write_i16::<LittleEndian>(n)?,
            }
        } else {
            let (a, b) = self.flags.to_two_bytes();
            write.write_u8(a)?;
            write.write_u8(b)?;
            match self.scan_angle {
                ScanAngle::Rank(n) => write.write_i8(n)?,
                ScanAngle::Scaled(n) => write.write_i8(n as i8)?,
            }
        }
        write.write_u8(self.user_data)?;
        write.write_u16::<LittleEndian>(self.point_source_id)?;
        if format.has_gps_time {
            write.write_f64::<LittleEndian>(self.gps_time.unwrap_or(0.))?;
        }
        if format.has_color {
            let color = self.color.unwrap_or_default();
            write.write_u16::<LittleEndian>(color.red)?;
            write.write_u16::<LittleEndian>(color.green)?;
            write.write_u16::<LittleEndian>(color.blue)?;
        }
        if format.has_nir {
            write.write_u16::<LittleEndian>(self.nir.unwrap_or(0))?;
        }
        write.write_all(&self.extra_bytes)?;
        Ok(())
    }
}

impl Default for Flags {
    fn default() -> Flags {
        Flags::TwoByte(0, 0)
    }
}

impl Default for ScanAngle {
    fn default() -> ScanAngle {
        ScanAngle::Rank(0)
    }
}

impl From<ScanAngle> for f32 {
    fn from(scan_angle: ScanAngle) -> f32 {
        match scan_angle {
            ScanAngle::Rank(n) => f32::from(n),
            ScanAngle::Scaled(n) => f32::from(n) * SCAN_ANGLE_SCALE_FACTOR,
        }
    }
}

impl Flags {
    /// Returns the return number.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::raw::point::Flags;
    /// assert_eq!(1, Flags::TwoByte(1, 0).return_number());
    /// assert_eq!(1, Flags::ThreeByte(1, 0, 0).return_number());
    /// ```
    pub fn return_number(&self) -> u8 {
        match *self {
            Flags::TwoByte(a, _) => a & 7,
            Flags::ThreeByte(a, _, _) => a & 15,
        }
    }

    /// Returns the number of returns.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::raw::point::Flags;
    /// assert_eq!(1, Flags::TwoByte(8, 0).number_of_returns());
    /// assert_eq!(1, Flags::ThreeByte(16, 0, 0).number_of_returns());
    /// ```
    pub fn number_of_returns(&self) -> u8 {
        match *self {
            Flags::TwoByte(a, _) => (a >> 3) & 7,
            Flags::ThreeByte(a, _, _) => (a >> 4) & 15,
        }
    }

    /// Is the scan direction left-to-right?
    pub fn is_scan_direction_left_to_right(&self) -> bool {
        let n = match *self {
            Flags::TwoByte(a, _) => a,
            Flags::ThreeByte(_, b, _) => b,
        };
        (n >> 6) & 1 == 1
    }

    /// Is this point at the edge of a flight line?
    pub fn is_edge_of_flight_line(&self) -> bool {
        let n = match *self {
            Flags::TwoByte(a, _) => a,
            Flags::ThreeByte(_, b, _) => b,
        };
        (n >> 7) == 1
    }

    /// Is this point synthetic?
    pub fn is_synthetic(&self) -> bool {
        match *self {
            Flags::TwoByte(_, b) => (b >> 5) & 1 == 1,
            Flags::ThreeByte(_, b, _) => b & 1 == 1,
        }
    }

    /// Is this point a model key-point?
    pub fn is_key_point(&self) -> bool {
        match *self {
            Flags::TwoByte(_, b) => (b >> 6) & 1 == 1,
            Flags::ThreeByte(_, b, _) => b & 2 == 2,
        }
    }

    /// Is this point withheld?
    pub fn is_withheld(&self) -> bool {
        match *self {
            Flags::TwoByte(_, b) => (b >> 7) & 1 == 1,
            Flags::ThreeByte(_, b, _) => b & 4 == 4,
        }
    }

    /// Is this point in an overlap region?
    ///
    /// Legacy points have no overlap bit; classification code 12 stands in
    /// for it.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::raw::point::Flags;
    /// assert!(Flags::TwoByte(0, 12).is_overlap());
    /// assert!(Flags::ThreeByte(0, 8, 0).is_overlap());
    /// ```
    pub fn is_overlap(&self) -> bool {
        match *self {
            Flags::TwoByte(_, b) => b & 0b1_1111 == OVERLAP_CLASSIFICATION_CODE,
            Flags::ThreeByte(_, b, _) => b & 8 == 8,
        }
    }

    /// Returns the scanner channel, always zero for legacy points.
    pub fn scanner_channel(&self) -> u8 {
        match *self {
            Flags::TwoByte(_, _) => 0,
            Flags::ThreeByte(_, b, _) => (b >> 4) & 3,
        }
    }

    /// Returns the classification.
    ///
    /// Legacy points only carry the lower five bits.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::raw::point::Flags;
    /// assert_eq!(2, Flags::TwoByte(0, 0b0100_0010).classification());
    /// assert_eq!(200, Flags::ThreeByte(0, 0, 200).classification());
    /// ```
    pub fn classification(&self) -> u8 {
        match *self {
            Flags::TwoByte(_, b) => b & 0b1_1111,
            Flags::ThreeByte(_, _, c) => c,
        }
    }

    fn to_two_bytes(self) -> (u8, u8) {
        match self {
            Flags::TwoByte(a, b) => (a, b),
            Flags::ThreeByte(..) => {
                let mut a = (self.return_number() & 7) | (self.number_of_returns() << 3);
                if self.is_scan_direction_left_to_right() {
                    a |= 0x40;
                }
                if self.is_edge_of_flight_line() {
                    a |= 0x80;
                }
                let mut b = if self.is_overlap() {
                    OVERLAP_CLASSIFICATION_CODE
                } else {
                    self.classification() & 0b1_1111
                };
                if self.is_synthetic() {
                    b |= 0x20;
                }
                if self.is_key_point() {
                    b |= 0x40;
                }
                if self.is_withheld() {
                    b |= 0x80;
                }
                (a, b)
            }
        }
    }

    fn to_three_bytes(self) -> (u8, u8, u8) {
        match self {
            Flags::TwoByte(..) => {
                let a = self.return_number() | (self.number_of_returns() << 4);
                let mut b = 0;
                if self.is_synthetic() {
                    b |= 1;
                }
                if self.is_key_point() {
                    b |= 2;
                }
                if self.is_withheld() {
                    b |= 4;
                }
                if self.is_overlap() {
                    b |= 8;
                }
                if self.is_scan_direction_left_to_right() {
                    b |= 0x40;
                }
                if self.is_edge_of_flight_line() {
                    b |= 0x80;
                }
                (a, b, self.classification())
            }
            Flags::ThreeByte(a, b, c) => (a, b, c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip_legacy() {
        let format = Format::new(3).unwrap();
        let point = Point {
            x: -1,
            y: 2,
            z: 3,
            intensity: 4,
            flags: Flags::TwoByte(0b0100_1001, 0b0010_0010),
            scan_angle: ScanAngle::Rank(-5),
            user_data: 6,
            point_source_id: 7,
            gps_time: Some(8.),
            color: Some(Color::new(9, 10, 11)),
            ..Default::default()
        };
        let mut cursor = Cursor::new(Vec::new());
        point.write_to(&mut cursor, format).unwrap();
        assert_eq!(u64::from(format.len()), cursor.position());
        cursor.set_position(0);
        assert_eq!(point, Point::read_from(&mut cursor, format).unwrap());
    }

    #[test]
    fn round_trip_extended() {
        let mut format = Format::new(8).unwrap();
        format.extra_bytes = 2;
        let point = Point {
            flags: Flags::ThreeByte(0b0011_0010, 0b0101_1111, 200),
            scan_angle: ScanAngle::Scaled(3000),
            gps_time: Some(42.),
            color: Some(Color::new(1, 2, 3)),
            nir: Some(4),
            extra_bytes: vec![5, 6],
            ..Default::default()
        };
        let mut cursor = Cursor::new(Vec::new());
        point.write_to(&mut cursor, format).unwrap();
        assert_eq!(u64::from(format.len()), cursor.position());
        cursor.set_position(0);
        assert_eq!(point, Point::read_from(&mut cursor, format).unwrap());
    }

    #[test]
    fn flags_two_bytes() {
        let flags = Flags::TwoByte(0b1101_0010, 0b1110_0011);
        assert_eq!(2, flags.return_number());
        assert_eq!(2, flags.number_of_returns());
        assert!(flags.is_scan_direction_left_to_right());
        assert!(flags.is_edge_of_flight_line());
        assert_eq!(3, flags.classification());
        assert!(flags.is_synthetic());
        assert!(flags.is_key_point());
        assert!(flags.is_withheld());
        assert!(!flags.is_overlap());
    }
}
