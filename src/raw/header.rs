//! Raw file metadata.

use crate::{raw::LASF, Result, Version};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

pub(crate) const HEADER_SIZE_1_2: u16 = 227;
pub(crate) const HEADER_SIZE_1_3: u16 = 235;
pub(crate) const HEADER_SIZE_1_4: u16 = 375;

/// A las header that maps directly onto the specification, versions 1.0
/// through 1.4.
///
/// Optional blocks at the end of the header (the waveform record start, the
/// evlr pointer, and the 64-bit point counts) are modeled as `Option`s and
/// are present exactly when the version says they should be.
#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    /// The file signature, always "LASF".
    pub file_signature: [u8; 4],
    /// A numeric identifier for the source of this file.
    pub file_source_id: u16,
    /// A bit field with global properties, notably the gps time type.
    pub global_encoding: u16,
    /// The project id.
    pub guid: [u8; 16],
    /// The las format version.
    pub version: Version,
    /// The hardware or algorithm that produced these data.
    pub system_identifier: [u8; 32],
    /// The software that produced this file.
    pub generating_software: [u8; 32],
    /// The day of the year, indexed to 1.
    pub file_creation_day_of_year: u16,
    /// The year of file creation.
    pub file_creation_year: u16,
    /// The size of this header in bytes.
    pub header_size: u16,
    /// The byte offset to the beginning of point data.
    pub offset_to_point_data: u32,
    /// The number of variable length records.
    pub number_of_variable_length_records: u32,
    /// The point data record format number.
    pub point_data_record_format: u8,
    /// The length of one point data record, in bytes.
    pub point_data_record_length: u16,
    /// The total number of point records (legacy 32-bit field).
    ///
    /// Zero in 1.4 files with more than `u32::MAX` points; see
    /// [LargeFile](Header::large_file).
    pub number_of_point_records: u32,
    /// The number of point records of each return number (legacy field).
    pub number_of_points_by_return: [u32; 5],
    /// The x scale factor.
    pub x_scale_factor: f64,
    /// The y scale factor.
    pub y_scale_factor: f64,
    /// The z scale factor.
    pub z_scale_factor: f64,
    /// The x offset.
    pub x_offset: f64,
    /// The y offset.
    pub y_offset: f64,
    /// The z offset.
    pub z_offset: f64,
    /// The maximum x value.
    pub max_x: f64,
    /// The minimum x value.
    pub min_x: f64,
    /// The maximum y value.
    pub max_y: f64,
    /// The minimum y value.
    pub min_y: f64,
    /// The maximum z value.
    pub max_z: f64,
    /// The minimum z value.
    pub min_z: f64,
    /// The offset to the start of the waveform data package record.
    ///
    /// Present in las 1.3 and later.
    pub start_of_waveform_data_packet_record: Option<u64>,
    /// The extended variable length record block, las 1.4 and later.
    pub evlr: Option<Evlr>,
    /// The 64-bit point count block, las 1.4 and later.
    pub large_file: Option<LargeFile>,
    /// Discouraged extra bytes between the end of the standard header and
    /// `header_size`.
    pub padding: Vec<u8>,
}

/// The extended variable length record block.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Evlr {
    /// The byte offset of the first evlr.
    pub start_of_first_evlr: u64,
    /// The number of evlrs.
    pub number_of_evlrs: u32,
}

/// The large file block, holding 64-bit point counts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LargeFile {
    /// The total number of point records.
    pub number_of_point_records: u64,
    /// The number of points of each return number, up to fifteen returns.
    pub number_of_points_by_return: [u64; 15],
}

impl Header {
    /// Reads a raw header from a `Read`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Cursor;
    /// use lasstream::raw::Header;
    /// let header = Header::default();
    /// let mut cursor = Cursor::new(Vec::new());
    /// header.write_to(&mut cursor).unwrap();
    /// cursor.set_position(0);
    /// assert_eq!(header, Header::read_from(&mut cursor).unwrap());
    /// ```
    pub fn read_from<R: Read>(read: &mut R) -> Result<Header> {
        let mut file_signature = [0; 4];
        read.read_exact(&mut file_signature)?;
        let file_source_id = read.read_u16::<LittleEndian>()?;
        let global_encoding = read.read_u16::<LittleEndian>()?;
        let mut guid = [0; 16];
        read.read_exact(&mut guid)?;
        let version = Version::new(read.read_u8()?, read.read_u8()?);
        let mut system_identifier = [0; 32];
        read.read_exact(&mut system_identifier)?;
        let mut generating_software = [0; 32];
        read.read_exact(&mut generating_software)?;
        let file_creation_day_of_year = read.read_u16::<LittleEndian>()?;
        let file_creation_year = read.read_u16::<LittleEndian>()?;
        let header_size = read.read_u16::<LittleEndian>()?;
        let offset_to_point_data = read.read_u32::<LittleEndian>()?;
        let number_of_variable_length_records = read.read_u32::<LittleEndian>()?;
        let point_data_record_format = read.read_u8()?;
        let point_data_record_length = read.read_u16::<LittleEndian>()?;
        let number_of_point_records = read.read_u32::<LittleEndian>()?;
        let mut number_of_points_by_return = [0; 5];
        for n in &mut number_of_points_by_return {
            *n = read.read_u32::<LittleEndian>()?;
        }
        let x_scale_factor = read.read_f64::<LittleEndian>()?;
        let y_scale_factor = read.read_f64::<LittleEndian>()?;
        let z_scale_factor = read.read_f64::<LittleEndian>()?;
        let x_offset = read.read_f64::<LittleEndian>()?;
        let y_offset = read.read_f64::<LittleEndian>()?;
        let z_offset = read.read_f64::<LittleEndian>()?;
        let max_x = read.read_f64::<LittleEndian>()?;
        let min_x = read.read_f64::<LittleEndian>()?;
        let max_y = read.read_f64::<LittleEndian>()?;
        let min_y = read.read_f64::<LittleEndian>()?;
        let max_z = read.read_f64::<LittleEndian>()?;
        let min_z = read.read_f64::<LittleEndian>()?;
        let mut standard_size = HEADER_SIZE_1_2;
        let start_of_waveform_data_packet_record = if version.minor >= 3 {
            standard_size = HEADER_SIZE_1_3;
            Some(read.read_u64::<LittleEndian>()?)
        } else {
            None
        };
        let (evlr, large_file) = if version.minor >= 4 {
            standard_size = HEADER_SIZE_1_4;
            let evlr = Evlr {
                start_of_first_evlr: read.read_u64::<LittleEndian>()?,
                number_of_evlrs: read.read_u32::<LittleEndian>()?,
            };
            let number_of_point_records = read.read_u64::<LittleEndian>()?;
            let mut number_of_points_by_return = [0; 15];
            for n in &mut number_of_points_by_return {
                *n = read.read_u64::<LittleEndian>()?;
            }
            (
                Some(evlr),
                Some(LargeFile {
                    number_of_point_records,
                    number_of_points_by_return,
                }),
            )
        } else {
            (None, None)
        };
        let mut padding = Vec::new();
        if header_size > standard_size {
            let _ = read
                .take(u64::from(header_size - standard_size))
                .read_to_end(&mut padding)?;
        }
        Ok(Header {
            file_signature,
            file_source_id,
            global_encoding,
            guid,
            version,
            system_identifier,
            generating_software,
            file_creation_day_of_year,
            file_creation_year,
            header_size,
            offset_to_point_data,
            number_of_variable_length_records,
            point_data_record_format,
            point_data_record_length,
            number_of_point_records,
            number_of_points_by_return,
            x_scale_factor,
            y_scale_factor,
            z_scale_factor,
            x_offset,
            y_offset,
            z_offset,
            max_x,
            min_x,
            max_y,
            min_y,
            max_z,
            min_z,
            start_of_waveform_data_packet_record,
            evlr,
            large_file,
            padding,
        })
    }

    /// Writes a raw header to a `Write`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Cursor;
    /// use lasstream::raw::Header;
    /// let header = Header::default();
    /// header.write_to(&mut Cursor::new(Vec::new())).unwrap();
    /// ```
    pub fn write_to<W: Write>(&self, write: &mut W) -> Result<()> {
        write.write_all(&self.file_signature)?;
        write.write_u16::<LittleEndian>(self.file_source_id)?;
        write.write_u16::<LittleEndian>(self.global_encoding)?;
        write.write_all(&self.guid)?;
        write.write_u8(self.version.major)?;
        write.write_u8(self.version.minor)?;
        write.write_all(&self.system_identifier)?;
        write.write_all(&self.generating_software)?;
        write.write_u16::<LittleEndian>(self.file_creation_day_of_year)?;
        write.write_u16::<LittleEndian>(self.file_creation_year)?;
        write.write_u16::<LittleEndian>(self.header_size)?;
        write.write_u32::<LittleEndian>(self.offset_to_point_data)?;
        write.write_u32::<LittleEndian>(self.number_of_variable_length_records)?;
        write.write_u8(self.point_data_record_format)?;
        write.write_u16::<LittleEndian>(self.point_data_record_length)?;
        write.write_u32::<LittleEndian>(self.number_of_point_records)?;
        for n in &self.number_of_points_by_return {
            write.write_u32::<LittleEndian>(*n)?;
        }
        write.write_f64::<LittleEndian>(self.x_scale_factor)?;
        write.write_f64::<LittleEndian>(self.y_scale_factor)?;
        write.write_f64::<LittleEndian>(self.z_scale_factor)?;
        write.write_f64::<LittleEndian>(self.x_offset)?;
        write.write_f64::<LittleEndian>(self.y_offset)?;
        write.write_f64::<LittleEndian>(self.z_offset)?;
        write.write_f64::<LittleEndian>(self.max_x)?;
        write.write_f64::<LittleEndian>(self.min_x)?;
        write.write_f64::<LittleEndian>(self.max_y)?;
        write.write_f64::<LittleEndian>(self.min_y)?;
        write.write_f64::<LittleEndian>(self.max_z)?;
        write.write_f64::<LittleEndian>(self.min_z)?;
        if let Some(n) = self.start_of_waveform_data_packet_record {
            write.write_u64::<LittleEndian>(n)?;
        }
        if let Some(evlr) = self.evlr {
            write.write_u64::<LittleEndian>(evlr.start_of_first_evlr)?;
            write.write_u32::<LittleEndian>(evlr.number_of_evlrs)?;
        }
        if let Some(large_file) = self.large_file {
            write.write_u64::<LittleEndian>(large_file.number_of_point_records)?;
            for n in &large_file.number_of_points_by_return {
                write.write_u64::<LittleEndian>(*n)?;
            }
        }
        write.write_all(&self.padding)?;
        Ok(())
    }
}

impl Default for Header {
    fn default() -> Header {
        Header {
            file_signature: LASF,
            file_source_id: 0,
            global_encoding: 0,
            guid: [0; 16],
            version: Version::default(),
            system_identifier: [0; 32],
            generating_software: [0; 32],
            file_creation_day_of_year: 0,
            file_creation_year: 0,
            header_size: HEADER_SIZE_1_2,
            offset_to_point_data: u32::from(HEADER_SIZE_1_2),
            number_of_variable_length_records: 0,
            point_data_record_format: 0,
            point_data_record_length: 20,
            number_of_point_records: 0,
            number_of_points_by_return: [0; 5],
            x_scale_factor: 0.001,
            y_scale_factor: 0.001,
            z_scale_factor: 0.001,
            x_offset: 0.,
            y_offset: 0.,
            z_offset: 0.,
            max_x: 0.,
            min_x: 0.,
            max_y: 0.,
            min_y: 0.,
            max_z: 0.,
            min_z: 0.,
            start_of_waveform_data_packet_record: None,
            evlr: None,
            large_file: None,
            padding: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip_1_2() {
        let header = Header {
            number_of_point_records: 42,
            min_x: -1.,
            max_x: 1.,
            ..Default::default()
        };
        let mut cursor = Cursor::new(Vec::new());
        header.write_to(&mut cursor).unwrap();
        assert_eq!(u64::from(HEADER_SIZE_1_2), cursor.position());
        cursor.set_position(0);
        assert_eq!(header, Header::read_from(&mut cursor).unwrap());
    }

    #[test]
    fn round_trip_1_4() {
        let header = Header {
            version: Version::new(1, 4),
            header_size: HEADER_SIZE_1_4,
            offset_to_point_data: u32::from(HEADER_SIZE_1_4),
            start_of_waveform_data_packet_record: Some(0),
            evlr: Some(Evlr::default()),
            large_file: Some(LargeFile {
                number_of_point_records: 42,
                number_of_points_by_return: [0; 15],
            }),
            ..Default::default()
        };
        let mut cursor = Cursor::new(Vec::new());
        header.write_to(&mut cursor).unwrap();
        assert_eq!(u64::from(HEADER_SIZE_1_4), cursor.position());
        cursor.set_position(0);
        assert_eq!(header, Header::read_from(&mut cursor).unwrap());
    }

    #[test]
    fn padding() {
        let header = Header {
            header_size: HEADER_SIZE_1_2 + 2,
            padding: vec![1, 2],
            ..Default::default()
        };
        let mut cursor = Cursor::new(Vec::new());
        header.write_to(&mut cursor).unwrap();
        cursor.set_position(0);
        let read = Header::read_from(&mut cursor).unwrap();
        assert_eq!(vec![1, 2], read.padding);
    }
}
