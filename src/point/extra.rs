//! Typed access to the extra bytes at the end of point records.
//!
//! Extra bytes are described by a `LASF_Spec`/4 vlr holding one 192-byte
//! descriptor per attribute: a name, a data type, and optional scale, offset,
//! and no-data values. Up to 32 attributes are supported; any surplus
//! descriptors are ignored with a warning.

use crate::{Header, Point, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use log::warn;
use num_traits::ToPrimitive;
use std::io::Read;

const DESCRIPTOR_SIZE: usize = 192;
const MAX_ATTRIBUTES: usize = 32;

const NO_DATA_BIT: u8 = 0x01;
const SCALE_BIT: u8 = 0x08;
const OFFSET_BIT: u8 = 0x10;

/// The data type of an extra bytes attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum AttributeKind {
    /// Raw bytes with no prescribed interpretation.
    Undocumented(u8),
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl AttributeKind {
    fn new(data_type: u8, options: u8) -> Option<AttributeKind> {
        match data_type {
            0 => Some(AttributeKind::Undocumented(options)),
            1 => Some(AttributeKind::U8),
            2 => Some(AttributeKind::I8),
            3 => Some(AttributeKind::U16),
            4 => Some(AttributeKind::I16),
            5 => Some(AttributeKind::U32),
            6 => Some(AttributeKind::I32),
            7 => Some(AttributeKind::U64),
            8 => Some(AttributeKind::I64),
            9 => Some(AttributeKind::F32),
            10 => Some(AttributeKind::F64),
            _ => None,
        }
    }

    /// The number of bytes a value of this kind occupies in a point record.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::point::AttributeKind;
    /// assert_eq!(2, AttributeKind::U16.byte_size());
    /// assert_eq!(3, AttributeKind::Undocumented(3).byte_size());
    /// ```
    pub fn byte_size(&self) -> usize {
        match *self {
            AttributeKind::Undocumented(n) => n as usize,
            AttributeKind::U8 | AttributeKind::I8 => 1,
            AttributeKind::U16 | AttributeKind::I16 => 2,
            AttributeKind::U32 | AttributeKind::I32 | AttributeKind::F32 => 4,
            AttributeKind::U64 | AttributeKind::I64 | AttributeKind::F64 => 8,
        }
    }

    fn decode(&self, bytes: &[u8]) -> Option<f64> {
        let mut read = bytes;
        match *self {
            AttributeKind::Undocumented(_) => None,
            AttributeKind::U8 => read.read_u8().ok().and_then(|n| n.to_f64()),
            AttributeKind::I8 => read.read_i8().ok().and_then(|n| n.to_f64()),
            AttributeKind::U16 => read.read_u16::<LittleEndian>().ok().and_then(|n| n.to_f64()),
            AttributeKind::I16 => read.read_i16::<LittleEndian>().ok().and_then(|n| n.to_f64()),
            AttributeKind::U32 => read.read_u32::<LittleEndian>().ok().and_then(|n| n.to_f64()),
            AttributeKind::I32 => read.read_i32::<LittleEndian>().ok().and_then(|n| n.to_f64()),
            AttributeKind::U64 => read.read_u64::<LittleEndian>().ok().and_then(|n| n.to_f64()),
            AttributeKind::I64 => read.read_i64::<LittleEndian>().ok().and_then(|n| n.to_f64()),
            AttributeKind::F32 => read.read_f32::<LittleEndian>().ok().and_then(|n| n.to_f64()),
            AttributeKind::F64 => read.read_f64::<LittleEndian>().ok(),
        }
    }
}

/// One extra bytes attribute descriptor.
#[derive(Clone, Debug)]
pub struct Attribute {
    /// The attribute name.
    pub name: String,

    /// The textual description.
    pub description: String,

    /// The data type.
    pub kind: AttributeKind,

    /// The scale to apply to raw values, if any.
    pub scale: Option<f64>,

    /// The offset to apply to raw values, if any.
    pub offset: Option<f64>,

    /// The raw value marking "no data", if any.
    pub no_data: Option<f64>,
}

impl Attribute {
    fn read_from<R: Read>(mut read: R) -> Result<Option<Attribute>> {
        let _reserved = read.read_u16::<LittleEndian>()?;
        let data_type = read.read_u8()?;
        let options = read.read_u8()?;
        let mut name = [0; 32];
        read.read_exact(&mut name)?;
        let _unused = read.read_u32::<LittleEndian>()?;
        let mut no_data_bytes = [0; 8];
        read.read_exact(&mut no_data_bytes)?;
        let mut skipped = [0; 16 + 24 + 24];
        read.read_exact(&mut skipped)?;
        let scale = read.read_f64::<LittleEndian>()?;
        read.read_exact(&mut skipped[0..16])?;
        let offset = read.read_f64::<LittleEndian>()?;
        read.read_exact(&mut skipped[0..16])?;
        let mut description = [0; 32];
        read.read_exact(&mut description)?;

        let Some(kind) = AttributeKind::new(data_type, options) else {
            warn!("skipping extra bytes attribute with data type {data_type}");
            return Ok(None);
        };
        // The sentinel is stored in the attribute's own type, upcast to
        // eight bytes.
        let no_data = match kind {
            AttributeKind::F32 | AttributeKind::F64 => f64::from_le_bytes(no_data_bytes),
            AttributeKind::I8
            | AttributeKind::I16
            | AttributeKind::I32
            | AttributeKind::I64 => i64::from_le_bytes(no_data_bytes) as f64,
            _ => u64::from_le_bytes(no_data_bytes) as f64,
        };
        Ok(Some(Attribute {
            name: as_nul_trimmed_string(&name)?,
            description: as_nul_trimmed_string(&description)?,
            kind,
            scale: (options & SCALE_BIT != 0).then_some(scale),
            offset: (options & OFFSET_BIT != 0).then_some(offset),
            no_data: (options & NO_DATA_BIT != 0).then_some(no_data),
        }))
    }

    /// Decodes this attribute from a slice of a point's extra bytes.
    ///
    /// Returns `None` for undocumented bytes, truncated records, and no-data
    /// sentinels. The scale and offset, when present, are applied to the raw
    /// value.
    pub fn value(&self, bytes: &[u8]) -> Option<f64> {
        let raw = self.kind.decode(bytes)?;
        if self.no_data == Some(raw) {
            return None;
        }
        Some(raw * self.scale.unwrap_or(1.) + self.offset.unwrap_or(0.))
    }
}

/// All extra bytes attributes of a file, with their record offsets.
#[derive(Clone, Debug, Default)]
pub struct AttributeTable {
    attributes: Vec<Attribute>,
    offsets: Vec<usize>,
}

impl AttributeTable {
    /// Builds the attribute table from a header's vlrs.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::{point::AttributeTable, Header};
    /// let table = AttributeTable::from_header(&Header::default()).unwrap();
    /// assert!(table.is_empty());
    /// ```
    pub fn from_header(header: &Header) -> Result<AttributeTable> {
        let mut attributes = Vec::new();
        for vlr in header.vlrs.iter().chain(header.evlrs.iter()) {
            if !(vlr.user_id == "LASF_Spec" && vlr.record_id == 4) {
                continue;
            }
            for chunk in vlr.data.chunks_exact(DESCRIPTOR_SIZE) {
                if let Some(attribute) = Attribute::read_from(chunk)? {
                    attributes.push(attribute);
                }
            }
        }
        if attributes.len() > MAX_ATTRIBUTES {
            warn!(
                "{} extra bytes attributes described, keeping the first {}",
                attributes.len(),
                MAX_ATTRIBUTES
            );
            attributes.truncate(MAX_ATTRIBUTES);
        }
        let mut offsets = Vec::with_capacity(attributes.len());
        let mut offset = 0;
        for attribute in &attributes {
            offsets.push(offset);
            offset += attribute.kind.byte_size();
        }
        Ok(AttributeTable {
            attributes,
            offsets,
        })
    }

    /// Returns true if no attributes are described.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// The number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns an attribute by index.
    pub fn get(&self, index: usize) -> Option<&Attribute> {
        self.attributes.get(index)
    }

    /// Returns the index of the attribute with this name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    /// Decodes one attribute value from a point.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::{point::AttributeTable, Point};
    /// let table = AttributeTable::default();
    /// let point = Point::default();
    /// assert_eq!(None, table.value(0, &point));
    /// ```
    pub fn value(&self, index: usize, point: &Point) -> Option<f64> {
        let attribute = self.attributes.get(index)?;
        let offset = self.offsets[index];
        point
            .extra_bytes
            .get(offset..)
            .and_then(|bytes| attribute.value(bytes))
    }
}

fn as_nul_trimmed_string(bytes: &[u8]) -> Result<String> {
    let end = bytes
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(bytes.len());
    Ok(std::str::from_utf8(&bytes[0..end])?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, data_type: u8, options: u8, scale: f64, no_data: [u8; 8]) -> Vec<u8> {
        let mut data = vec![0; DESCRIPTOR_SIZE];
        data[2] = data_type;
        data[3] = options;
        data[4..4 + name.len()].copy_from_slice(name.as_bytes());
        data[40..48].copy_from_slice(&no_data);
        data[112..120].copy_from_slice(&scale.to_le_bytes());
        data
    }

    #[test]
    fn decode_scaled_u16() {
        let attribute =
            Attribute::read_from(descriptor("height", 3, SCALE_BIT, 0.1, [0; 8]).as_slice())
                .unwrap()
                .unwrap();
        assert_eq!("height", attribute.name);
        assert_eq!(AttributeKind::U16, attribute.kind);
        assert_eq!(Some(10.0), attribute.value(&100u16.to_le_bytes()));
    }

    #[test]
    fn no_data_sentinel() {
        let attribute = Attribute::read_from(
            descriptor("gap", 6, NO_DATA_BIT, 1., (-9999i64).to_le_bytes()).as_slice(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(None, attribute.value(&(-9999i32).to_le_bytes()));
        assert_eq!(Some(3.), attribute.value(&3i32.to_le_bytes()));
    }

    #[test]
    fn undocumented_bytes_have_no_value() {
        let attribute = Attribute::read_from(descriptor("blob", 0, 4, 1., [0; 8]).as_slice())
            .unwrap()
            .unwrap();
        assert_eq!(4, attribute.kind.byte_size());
        assert_eq!(None, attribute.value(&[1, 2, 3, 4]));
    }
}
