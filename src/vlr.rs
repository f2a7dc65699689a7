//! Variable length records store metadata not defined in the header.
//!
//! "Regular" vlrs are stored right after the header, before the point
//! records. "Extended" vlrs (evlrs) are stored at the end of the file, after
//! the point records, and can hold much larger payloads. A [Header] keeps
//! the two kinds in separate lists.
//!
//! ```
//! use lasstream::Vlr;
//! let vlr = Vlr {
//!     user_id: "gadget".to_string(),
//!     record_id: 42,
//!     description: "Some really important data".to_string(),
//!     data: vec![1, 2, 3],
//! };
//! ```

use crate::utils::{AsLasStr, FromLasStr};
use crate::{raw, Header, Result};

/// A variable length record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Vlr {
    /// The user that created this record.
    ///
    /// This value is often an official, "registered" user id, such as
    /// "LASF_Spec" or "LASF_Projection".
    pub user_id: String,

    /// This value specifies the type of record, and depends on the user id.
    pub record_id: u16,

    /// Textual description of these data.
    pub description: String,

    /// The data themselves.
    pub data: Vec<u8>,
}

impl Vlr {
    /// Creates a vlr from a raw vlr.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::{raw, Vlr};
    /// let raw_vlr = raw::Vlr::default();
    /// let vlr = Vlr::new(raw_vlr).unwrap();
    /// ```
    pub fn new(raw_vlr: raw::Vlr) -> Result<Vlr> {
        Ok(Vlr {
            user_id: raw_vlr.user_id.as_ref().as_las_str()?.to_string(),
            record_id: raw_vlr.record_id,
            description: raw_vlr.description.as_ref().as_las_str()?.to_string(),
            data: raw_vlr.data,
        })
    }

    /// Converts this vlr into a raw vlr.
    ///
    /// Pass `true` to produce an extended vlr.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::Vlr;
    /// let raw_vlr = Vlr::default().into_raw(false);
    /// let raw_evlr = Vlr::default().into_raw(true);
    /// ```
    pub fn into_raw(self, extended: bool) -> raw::Vlr {
        let mut user_id = [0; 16];
        user_id.as_mut().from_las_str(&self.user_id);
        let mut description = [0; 32];
        description.as_mut().from_las_str(&self.description);
        let record_length_after_header = if extended || self.data.len() > usize::from(u16::MAX) {
            raw::vlr::RecordLength::Evlr(self.data.len() as u64)
        } else {
            raw::vlr::RecordLength::Vlr(self.data.len() as u16)
        };
        raw::Vlr {
            reserved: 0,
            user_id,
            record_id: self.record_id,
            record_length_after_header,
            description,
            data: self.data,
        }
    }
}

impl Header {
    /// Returns the first vlr or evlr matching the user and record ids, if
    /// any.
    ///
    /// # Examples
    ///
    /// ```
    /// use lasstream::Header;
    /// let header = Header::default();
    /// assert!(header.find_vlr("LASF_Spec", 4).is_none());
    /// ```
    pub fn find_vlr(&self, user_id: &str, record_id: u16) -> Option<&Vlr> {
        self.vlrs
            .iter()
            .chain(self.evlrs.iter())
            .find(|vlr| vlr.user_id == user_id && vlr.record_id == record_id)
    }
}
