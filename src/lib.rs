//! Stream [ASPRS LAS](https://www.asprs.org/committee-general/laser-las-file-format-exchange-activities.html)
//! point cloud data with bounded memory, spatial indexing, and per-point
//! filtering.
//!
//! # Reading
//!
//! Create a [Reader] from a `Path` and step through points one at a time:
//!
//! ```no_run
//! use lasstream::Reader;
//!
//! let mut reader = Reader::from_path("points.las").unwrap();
//! while let Some(point) = reader.read_point().unwrap() {
//!     println!("({}, {}, {})", point.x, point.y, point.z);
//! }
//! ```
//!
//! `read_point` returns `Ok(None)` on clean end-of-stream and `Err(_)` on a
//! real failure -- the two are never conflated.
//!
//! # Areas of interest
//!
//! A reader streams a spatial subset when asked. On a COPC file the octree
//! index turns the subset into a handful of seeks; otherwise candidates
//! are decoded and tested:
//!
//! ```no_run
//! # use lasstream::Reader;
//! let mut reader = Reader::from_path("points.copc.laz").unwrap();
//! reader.inside_circle(637500., 851000., 200.).unwrap();
//! let points = reader.points().collect::<Result<Vec<_>, _>>().unwrap();
//! ```
//!
//! # Filters, mutations, ignores
//!
//! Per-point rules compose around the raw stream; the reader applies
//! ignore → filter → scope test → mutate to every decoded record:
//!
//! ```no_run
//! use std::sync::Arc;
//! use lasstream::filter::{Filter, KeepClassification};
//! use lasstream::Reader;
//!
//! let mut filter = Filter::new();
//! filter.push(KeepClassification::new([2]));
//! let mut reader = Reader::from_path("points.las").unwrap();
//! reader.set_filter(Arc::new(filter));
//! ```
//!
//! # Many files
//!
//! The [Opener] resolves file lists into readers, with merged and
//! buffered-neighbor modes:
//!
//! ```no_run
//! use lasstream::Opener;
//!
//! let mut opener = Opener::new();
//! opener.add_list("tiles.txt").unwrap();
//! opener.set_merged(true);
//! let reader = opener.open_next().unwrap().unwrap();
//! ```
//!
//! # Compression
//!
//! [laszip](https://laszip.org/) is supported by enabling the `laz` feature
//! in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! lasstream = { version = "*", features = ["laz"] }
//! ```

#![deny(
    missing_docs,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications
)]

pub mod copc;
pub mod feature;
pub mod filter;
pub mod index;
#[cfg(feature = "laz")]
pub mod laz;
pub mod mutate;
pub mod opener;
pub mod point;
pub mod raw;
pub mod reader;

mod bounds;
mod color;
mod error;
mod gps_time_type;
mod header;
mod ignore;
mod selective;
mod transform;
mod utils;
mod vector;
mod version;
mod vlr;

pub use bounds::Bounds;
pub use color::Color;
pub use error::Error;
pub use filter::Filter;
pub use gps_time_type::GpsTimeType;
pub use header::Header;
pub use ignore::Ignore;
pub use mutate::Mutator;
pub use opener::Opener;
pub use point::Point;
pub use reader::{PointSource, Reader, StreamReader};
pub use selective::Selective;
pub use transform::Transform;
pub use vector::Vector;
pub use version::Version;
pub use vlr::Vlr;

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, Error>;
