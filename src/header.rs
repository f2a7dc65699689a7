//! File-level metadata: the layout and interpretation of the points.
//!
//! The header owns the three [Transforms](Transform) that turn the
//! fixed-point integers on disk into real-world coordinates, the declared
//! bounding box, the point counts, and the (extended) variable length
//! records. Readers clone the header once at open and hand out references to
//! their copy.

use crate::utils::AsLasStr;
use crate::{
    point::Format, raw, Bounds, Error, GpsTimeType, Result, Transform, Vector, Version, Vlr,
};
use chrono::NaiveDate;
use log::{debug, warn};
use std::io::{Read, Seek, SeekFrom};
use uuid::Uuid;

/// Metadata describing the layout, source, and interpretation of the points.
#[derive(Clone, Debug)]
pub struct Header {
    /// A project-wide unique ID for the file.
    pub file_source_id: u16,

    /// The time type for GPS time.
    pub gps_time_type: GpsTimeType,

    /// Optional globally-unique identifier.
    pub guid: Uuid,

    /// The LAS version of this file.
    pub version: Version,

    /// The system that produced this file.
    pub system_identifier: String,

    /// The software which generated these data.
    pub generating_software: String,

    /// The date these data were collected.
    ///
    /// If the date in the header was crap, this is `None`.
    pub date: Option<NaiveDate>,

    /// The format of the point records.
    pub point_format: Format,

    /// The three transforms used to convert xyz coordinates from signed
    /// integers to floats.
    pub transforms: Vector<Transform>,

    /// The bounds of these data, in real-world units.
    pub bounds: Bounds,

    /// The total number of points.
    pub number_of_points: u64,

    /// The number of points of each return number (1-15).
    pub number_of_points_by_return: [u64; 15],

    /// Variable length records.
    pub vlrs: Vec<Vlr>,

    /// Extended variable length records.
    ///
    /// Empty when the source could not be seeked (e.g. a pipe).
    pub evlrs: Vec<Vlr>,
}

impl Header {
    /// Reads a header from a `Read`, leaving the stream at the first point
    /// byte.
    ///
    /// All regular vlrs are read. Extended vlrs live past the point records,
    /// so they are only read when the source genuinely supports seeking --
    /// the probe is a `SeekFrom::End(0)`, which forward-only adapters
    /// reject. A pipe therefore silently loses its evlrs.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Cursor;
    /// use lasstream::{raw, Header};
    /// let mut cursor = Cursor::new(Vec::new());
    /// raw::Header::default().write_to(&mut cursor).unwrap();
    /// cursor.set_position(0);
    /// let header = Header::read_from(&mut cursor).unwrap();
    /// assert_eq!(0, header.number_of_points);
    /// ```
    pub fn read_from<R: Read + Seek>(read: &mut R) -> Result<Header> {
        let start = read.stream_position()?;
        let raw_header = raw::Header::read_from(read)?;
        if raw_header.file_signature != raw::LASF {
            return Err(Error::InvalidFileSignature(raw_header.file_signature));
        }
        let mut point_format = Format::new(raw_header.point_data_record_format & 0x3f)?;
        point_format.is_compressed = raw_header.point_data_record_format & 0x80 != 0;
        let base_len = point_format.len();
        if raw_header.point_data_record_length < base_len {
            return Err(Error::InvalidPointDataRecordLength {
                format: point_format,
                len: raw_header.point_data_record_length,
            });
        }
        point_format.extra_bytes = raw_header.point_data_record_length - base_len;

        let mut vlrs = Vec::with_capacity(raw_header.number_of_variable_length_records as usize);
        for _ in 0..raw_header.number_of_variable_length_records {
            vlrs.push(Vlr::new(raw::Vlr::read_from(read, false)?)?);
        }
        let point_data_start = start + u64::from(raw_header.offset_to_point_data);
        let _ = read.seek(SeekFrom::Start(point_data_start))?;

        let mut evlrs = Vec::new();
        if let Some(evlr) = raw_header.evlr {
            if evlr.number_of_evlrs > 0 {
                match read.seek(SeekFrom::End(0)) {
                    Ok(_) => {
                        let _ = read.seek(SeekFrom::Start(evlr.start_of_first_evlr))?;
                        for _ in 0..evlr.number_of_evlrs {
                            evlrs.push(Vlr::new(raw::Vlr::read_from(read, true)?)?);
                        }
                        let _ = read.seek(SeekFrom::Start(point_data_start))?;
                    }
                    Err(_) => debug!("source is not seekable, skipping evlrs"),
                }
            }
        }

        let number_of_points = raw_header
            .large_file
            .map(|large_file| large_file.number_of_point_records)
            .unwrap_or(u64::from(raw_header.number_of_point_records));
        let mut number_of_points_by_return = [0; 15];
        if let Some(large_file) = raw_header.large_file {
            number_of_points_by_return = large_file.number_of_points_by_return;
        } else {
            for (a, b) in number_of_points_by_return
                .iter_mut()
                .zip(raw_header.number_of_points_by_return)
            {
                *a = u64::from(b);
            }
        }

        let header = Header {
            file_source_id: raw_header.file_source_id,
            gps_time_type: raw_header.global_encoding.into(),
            guid: Uuid::from_bytes_le(raw_header.guid),
            version: raw_header.version,
            system_identifier: raw_header
                .system_identifier
                .as_ref()
                .as_las_str()?
                .to_string(),
            generating_software: raw_header
                .generating_software
                .as_ref()
                .as_las_str()?
                .to_string(),
            date: NaiveDate::from_yo_opt(
                i32::from(raw_header.file_creation_year),
                u32::from(raw_header.file_creation_day_of_year),
            ),
            point_format,
            transforms: Vector {
                x: Transform {
                    scale: raw_header.x_scale_factor,
                    offset: raw_header.x_offset,
                },
                y: Transform {
                    scale: raw_header.y_scale_factor,
                    offset: raw_header.y_offset,
                },
                z: Transform {
                    scale: raw_header.z_scale_factor,
                    offset: raw_header.z_offset,
                },
            },
            bounds: Bounds::new(
                raw_header.min_x,
                raw_header.min_y,
                raw_header.min_z,
                raw_header.max_x,
                raw_header.max_y,
                raw_header.max_z,
            ),
            number_of_points,
            number_of_points_by_return,
            vlrs,
            evlrs,
        };
        if header.quantization_flips_sign() {
            warn!(
                "quantizing the declared bounds flips a sign under {}, {}, {}",
                header.transforms.x, header.transforms.y, header.transforms.z
            );
        }
        Ok(header)
    }

    /// Returns true if quantizing any declared bound would wreck it.
    ///
    /// The bounding box must survive a round trip through the fixed-point
    /// representation. A bound outside the i32 range of its scale/offset
    /// pair would wrap (flipping its sign on the way), and a bound whose
    /// round trip comes back with the opposite sign indicates a bogus
    /// scale/offset pair; either way any geometry test against the box
    /// becomes suspect.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::{Bounds, Header};
    /// let mut header = Header {
    ///     bounds: Bounds::new(1., 1., 1., 2., 2., 2.),
    ///     ..Default::default()
    /// };
    /// assert!(!header.quantization_flips_sign());
    /// header.transforms.x.scale = 1e-12; // 2.0 / 1e-12 overflows an i32
    /// assert!(header.quantization_flips_sign());
    /// ```
    pub fn quantization_flips_sign(&self) -> bool {
        fn flips(transform: &Transform, n: f64) -> bool {
            match transform.inverse(n) {
                Ok(quantized) => {
                    let round_tripped = transform.direct(quantized);
                    n != 0. && round_tripped != 0. && n.signum() != round_tripped.signum()
                }
                Err(_) => true,
            }
        }
        let t = &self.transforms;
        flips(&t.x, self.bounds.min.x)
            || flips(&t.x, self.bounds.max.x)
            || flips(&t.y, self.bounds.min.y)
            || flips(&t.y, self.bounds.max.y)
            || flips(&t.z, self.bounds.min.z)
            || flips(&t.z, self.bounds.max.z)
    }
}

impl Default for Header {
    fn default() -> Header {
        Header {
            file_source_id: 0,
            gps_time_type: GpsTimeType::Week,
            guid: Uuid::nil(),
            version: Version::default(),
            system_identifier: "lasstream".to_string(),
            generating_software: format!("lasstream {}", env!("CARGO_PKG_VERSION")),
            date: None,
            point_format: Format::default(),
            transforms: Vector {
                x: Transform::default(),
                y: Transform::default(),
                z: Transform::default(),
            },
            bounds: Bounds::new(0., 0., 0., 0., 0., 0.),
            number_of_points: 0,
            number_of_points_by_return: [0; 15],
            vlrs: Vec::new(),
            evlrs: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_from_round_trips_the_basics() {
        let raw_header = raw::Header {
            file_source_id: 42,
            number_of_point_records: 2,
            x_scale_factor: 0.01,
            min_x: -1.,
            max_x: 1.,
            ..Default::default()
        };
        let mut cursor = Cursor::new(Vec::new());
        raw_header.write_to(&mut cursor).unwrap();
        cursor.set_position(0);
        let header = Header::read_from(&mut cursor).unwrap();
        assert_eq!(42, header.file_source_id);
        assert_eq!(2, header.number_of_points);
        assert_eq!(0.01, header.transforms.x.scale);
        assert_eq!(-1., header.bounds.min.x);
    }

    #[test]
    fn rejects_bad_signature() {
        let raw_header = raw::Header {
            file_signature: *b"LASX",
            ..Default::default()
        };
        let mut cursor = Cursor::new(Vec::new());
        raw_header.write_to(&mut cursor).unwrap();
        cursor.set_position(0);
        assert!(matches!(
            Header::read_from(&mut cursor),
            Err(Error::InvalidFileSignature(_))
        ));
    }

    #[test]
    fn rejects_short_record_length() {
        let raw_header = raw::Header {
            point_data_record_format: 1,
            point_data_record_length: 20,
            ..Default::default()
        };
        let mut cursor = Cursor::new(Vec::new());
        raw_header.write_to(&mut cursor).unwrap();
        cursor.set_position(0);
        assert!(matches!(
            Header::read_from(&mut cursor),
            Err(Error::InvalidPointDataRecordLength { .. })
        ));
    }

    #[test]
    fn extra_bytes_from_record_length() {
        let raw_header = raw::Header {
            point_data_record_format: 1,
            point_data_record_length: 32,
            ..Default::default()
        };
        let mut cursor = Cursor::new(Vec::new());
        raw_header.write_to(&mut cursor).unwrap();
        cursor.set_position(0);
        let header = Header::read_from(&mut cursor).unwrap();
        assert_eq!(4, header.point_format.extra_bytes);
    }

    #[test]
    fn quantization_sign_flip() {
        let mut header = Header {
            bounds: Bounds::new(0.5, 0.5, 0.5, 2., 2., 2.),
            ..Default::default()
        };
        assert!(!header.quantization_flips_sign());
        // A micro-scale pushes these bounds far outside the i32 range.
        header.transforms.y.scale = 1e-12;
        assert!(header.quantization_flips_sign());
    }
}
