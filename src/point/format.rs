use crate::{Error, Result};
use std::fmt;

/// Point record format.
///
/// As of LAS 1.4, there are eleven point formats (0 to 10). A format is
/// described by a combination of properties rather than by its raw format
/// number, since many operations (e.g. wire length calculations, field
/// dispatch) care about the properties, not the number:
///
/// ```
/// use lasstream::point::Format;
///
/// let format = Format::new(1).unwrap();
/// assert!(format.has_gps_time);
/// assert!(!format.has_color);
/// assert!(!format.is_extended);
/// assert_eq!(28, format.len());
/// ```
///
/// The waveform formats (4, 5, 9, and 10) are recognized but rejected --
/// waveform packet decoding is out of the scope of this crate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Format {
    /// Does this format include gps time?
    pub has_gps_time: bool,

    /// Does this format include red, green, and blue colors?
    pub has_color: bool,

    /// Does this format include a near-infrared channel?
    pub has_nir: bool,

    /// Is this an extended point format (6 and up)?
    ///
    /// Extended formats carry three flag bytes (fifteen returns, a full
    /// 8-bit classification, scanner channel) and a scaled scan angle.
    pub is_extended: bool,

    /// Is the point data compressed?
    pub is_compressed: bool,

    /// The number of extra bytes on each point record.
    pub extra_bytes: u16,
}

impl Format {
    /// Creates a new point format from its format number.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::point::Format;
    ///
    /// assert!(Format::new(6).unwrap().is_extended);
    /// assert!(Format::new(4).is_err()); // waveforms are not supported
    /// assert!(Format::new(11).is_err());
    /// ```
    pub fn new(n: u8) -> Result<Format> {
        match n {
            0 => Ok(Format::default()),
            1 => Ok(Format {
                has_gps_time: true,
                ..Default::default()
            }),
            2 => Ok(Format {
                has_color: true,
                ..Default::default()
            }),
            3 => Ok(Format {
                has_gps_time: true,
                has_color: true,
                ..Default::default()
            }),
            6 => Ok(Format {
                is_extended: true,
                has_gps_time: true,
                ..Default::default()
            }),
            7 => Ok(Format {
                is_extended: true,
                has_gps_time: true,
                has_color: true,
                ..Default::default()
            }),
            8 => Ok(Format {
                is_extended: true,
                has_gps_time: true,
                has_color: true,
                has_nir: true,
                ..Default::default()
            }),
            4 | 5 | 9 | 10 => Err(Error::UnsupportedPointFormat(n)),
            _ => Err(Error::InvalidPointFormat(n)),
        }
    }

    /// Returns this format's format number.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::point::Format;
    /// assert_eq!(7, Format::new(7).unwrap().to_u8());
    /// ```
    pub fn to_u8(&self) -> u8 {
        if self.is_extended {
            if self.has_nir {
                8
            } else if self.has_color {
                7
            } else {
                6
            }
        } else {
            match (self.has_gps_time, self.has_color) {
                (false, false) => 0,
                (true, false) => 1,
                (false, true) => 2,
                (true, true) => 3,
            }
        }
    }

    /// The total length of a point record in this format, extra bytes included.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::point::Format;
    /// assert_eq!(20, Format::new(0).unwrap().len());
    /// assert_eq!(38, Format::new(8).unwrap().len());
    /// ```
    pub fn len(&self) -> u16 {
        let mut len = if self.is_extended { 22 } else { 20 };
        if self.has_gps_time {
            len += 8;
        }
        if self.has_color {
            len += 6;
        }
        if self.has_nir {
            len += 2;
        }
        len + self.extra_bytes
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "point format {}", self.to_u8())
    }
}
