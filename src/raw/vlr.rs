//! Raw variable length records.

use crate::Result;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// A raw variable length record.
#[derive(Clone, Debug, PartialEq)]
pub struct Vlr {
    /// Reserved for future use.
    pub reserved: u16,
    /// ASCII data which identifies the user associated with the record.
    pub user_id: [u8; 16],
    /// Dependent on the user id, identifies the type of the record.
    pub record_id: u16,
    /// The number of bytes of payload that follow the vlr header.
    ///
    /// Regular vlrs can only hold `u16::MAX` bytes, extended vlrs hold more.
    pub record_length_after_header: RecordLength,
    /// A textual description of these data.
    pub description: [u8; 32],
    /// The payload.
    pub data: Vec<u8>,
}

/// The payload length of a regular or extended vlr.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RecordLength {
    /// A regular vlr's u16 length.
    Vlr(u16),
    /// An extended vlr's u64 length.
    Evlr(u64),
}

impl Vlr {
    /// Reads a raw vlr.
    ///
    /// Pass `true` to read an extended vlr.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Cursor;
    /// use lasstream::raw::Vlr;
    /// let vlr = Vlr::default();
    /// let mut cursor = Cursor::new(Vec::new());
    /// vlr.write_to(&mut cursor).unwrap();
    /// cursor.set_position(0);
    /// assert_eq!(vlr, Vlr::read_from(&mut cursor, false).unwrap());
    /// ```
    pub fn read_from<R: Read>(read: &mut R, extended: bool) -> Result<Vlr> {
        let reserved = read.read_u16::<LittleEndian>()?;
        let mut user_id = [0; 16];
        read.read_exact(&mut user_id)?;
        let record_id = read.read_u16::<LittleEndian>()?;
        let record_length_after_header = if extended {
            RecordLength::Evlr(read.read_u64::<LittleEndian>()?)
        } else {
            RecordLength::Vlr(read.read_u16::<LittleEndian>()?)
        };
        let mut description = [0; 32];
        read.read_exact(&mut description)?;
        let mut data = Vec::new();
        let _ = read
            .take(u64::from(record_length_after_header))
            .read_to_end(&mut data)?;
        Ok(Vlr {
            reserved,
            user_id,
            record_id,
            record_length_after_header,
            description,
            data,
        })
    }

    /// Writes a raw vlr.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Cursor;
    /// use lasstream::raw::Vlr;
    /// let vlr = Vlr::default();
    /// vlr.write_to(&mut Cursor::new(Vec::new())).unwrap();
    /// ```
    pub fn write_to<W: Write>(&self, write: &mut W) -> Result<()> {
        write.write_u16::<LittleEndian>(self.reserved)?;
        write.write_all(&self.user_id)?;
        write.write_u16::<LittleEndian>(self.record_id)?;
        match self.record_length_after_header {
            RecordLength::Vlr(n) => write.write_u16::<LittleEndian>(n)?,
            RecordLength::Evlr(n) => write.write_u64::<LittleEndian>(n)?,
        }
        write.write_all(&self.description)?;
        write.write_all(&self.data)?;
        Ok(())
    }

    /// The total length of this vlr on disk, header included.
    pub fn len(&self) -> usize {
        let header_len = match self.record_length_after_header {
            RecordLength::Vlr(_) => 54,
            RecordLength::Evlr(_) => 60,
        };
        header_len + self.data.len()
    }

    /// Returns true if this vlr carries no payload.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Default for Vlr {
    fn default() -> Vlr {
        Vlr {
            reserved: 0,
            user_id: [0; 16],
            record_id: 0,
            record_length_after_header: RecordLength::Vlr(0),
            description: [0; 32],
            data: Vec::new(),
        }
    }
}

impl From<RecordLength> for u64 {
    fn from(record_length: RecordLength) -> u64 {
        match record_length {
            RecordLength::Vlr(n) => u64::from(n),
            RecordLength::Evlr(n) => n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip_evlr() {
        let vlr = Vlr {
            record_id: 7,
            record_length_after_header: RecordLength::Evlr(3),
            data: vec![1, 2, 3],
            ..Default::default()
        };
        let mut cursor = Cursor::new(Vec::new());
        vlr.write_to(&mut cursor).unwrap();
        assert_eq!(vlr.len() as u64, cursor.position());
        cursor.set_position(0);
        assert_eq!(vlr, Vlr::read_from(&mut cursor, true).unwrap());
    }
}
