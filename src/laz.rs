//! Utility functions for working with laszip compressed data.

use crate::{Error, Header, Result, Vlr};
use laz::LazVlr;

/// Returns true if this [Vlr] is the laszip vlr.
///
/// # Examples
///
/// ```
/// #[cfg(feature = "laz")]
/// {
/// use lasstream::{laz, Vlr};
///
/// let mut vlr = Vlr::default();
/// assert!(!laz::is_laszip_vlr(&vlr));
/// vlr.user_id = "laszip encoded".to_string();
/// vlr.record_id = 22204;
/// assert!(laz::is_laszip_vlr(&vlr));
/// }
/// ```
pub fn is_laszip_vlr(vlr: &Vlr) -> bool {
    vlr.user_id == LazVlr::USER_ID && vlr.record_id == LazVlr::RECORD_ID
}

impl Header {
    /// Returns this header's laszip vlr.
    ///
    /// Compressed files must carry one; a compressed header without it is
    /// corrupt.
    pub fn laz_vlr(&self) -> Result<LazVlr> {
        self.vlrs
            .iter()
            .find(|vlr| is_laszip_vlr(vlr))
            .ok_or(Error::LasZipVlrNotFound)
            .and_then(|vlr| LazVlr::from_buffer(&vlr.data).map_err(Error::from))
    }
}
