use crate::{point::Format, Transform, Version};
use thiserror::Error;

/// Crate-specific error enum.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The area-of-interest parameters are invalid.
    #[error("invalid area of interest: {0}")]
    InvalidAreaOfInterest(String),

    /// A file list line could not be parsed.
    #[error("invalid file list line: {0}")]
    InvalidFileSpec(String),

    /// The file signature was not LASF.
    #[error("the file signature is not LASF: {0:?}")]
    InvalidFileSignature([u8; 4]),

    /// The point format is not recognized by the LAS specification.
    #[error("invalid point format: {0}")]
    InvalidPointFormat(u8),

    /// The point data record length is too small for the point format.
    #[error("point data record length {len} is too small for point format {format}")]
    InvalidPointDataRecordLength {
        /// The point format.
        format: Format,
        /// The declared record length.
        len: u16,
    },

    /// The point format is valid but not supported by this crate.
    #[error("unsupported point format: {0}")]
    UnsupportedPointFormat(u8),

    /// An octree child direction outside of 0..8.
    #[error("octant direction must be in 0..8, got {0}")]
    InvalidOctantDirection(i32),

    /// The file does not carry a COPC info record.
    #[error("no copc info vlr found")]
    CopcInfoNotFound,

    /// The file does not carry a COPC hierarchy record.
    #[error("no copc hierarchy evlr found")]
    CopcHierarchyNotFound,

    /// A real-world value does not fit the fixed-point integer range.
    #[error("the value {value} overflows i32 under {transform}")]
    InverseTransform {
        /// The real-world value.
        value: f64,
        /// The transform that could not quantize it.
        transform: Transform,
    },

    /// The feature is not supported by the given version.
    #[error("feature {feature} is not supported by version {version}")]
    UnsupportedFeature {
        /// The LAS version.
        version: Version,
        /// The name of the feature.
        feature: &'static str,
    },

    /// Sources with differing point formats cannot be merged.
    #[error("cannot merge point format {actual} into a stream of format {expected}")]
    MergeFormatMismatch {
        /// The point format of the first source.
        expected: u8,
        /// The mismatched point format.
        actual: u8,
    },

    /// A neighbor buffer was requested but only one input file is present.
    #[error("a neighbor buffer requires more than one input file")]
    BufferWithoutNeighbors,

    /// The opener has no input files.
    #[error("no input files")]
    NoFiles,

    /// The file is compressed but the crate was built without laz support.
    #[error("the file is compressed, but the laz feature is not enabled")]
    LaszipNotEnabled,

    /// The file is compressed but carries no laszip vlr.
    #[cfg(feature = "laz")]
    #[error("the file is compressed, but no laszip vlr was found")]
    LasZipVlrNotFound,

    /// [std::io::Error]
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// [std::num::TryFromIntError]
    #[error(transparent)]
    TryFromInt(#[from] std::num::TryFromIntError),

    /// [std::str::Utf8Error]
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),

    /// [laz::LasZipError]
    #[cfg(feature = "laz")]
    #[error(transparent)]
    Laz(#[from] laz::LasZipError),
}
