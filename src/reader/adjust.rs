use super::PointSource;
use crate::{Header, Point, Result, Transform, Vector};
use log::warn;

/// An optional target scale and an optional target offset, applied
/// uniformly.
///
/// Either half can be present on its own; both together rewrite the whole
/// quantization grid.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Adjustment {
    /// The target scale factors, if rescaling.
    pub scale: Option<Vector<f64>>,
    /// The target offsets, if reoffsetting.
    pub offset: Option<Vector<f64>>,
}

impl Adjustment {
    /// Returns true if this adjustment changes nothing.
    pub fn is_identity(&self) -> bool {
        self.scale.is_none() && self.offset.is_none()
    }

    fn apply(&self, transforms: &mut Vector<Transform>) {
        if let Some(scale) = self.scale {
            transforms.x.scale = scale.x;
            transforms.y.scale = scale.y;
            transforms.z.scale = scale.z;
        }
        if let Some(offset) = self.offset {
            transforms.x.offset = offset.x;
            transforms.y.offset = offset.y;
            transforms.z.offset = offset.z;
        }
    }
}

/// A source whose header advertises a rescaled and/or reoffset
/// quantization grid.
///
/// Points stream as real-world doubles either way, so the records are
/// untouched; what changes is the grid downstream consumers (coordinate
/// mutations, writers) quantize against. The declared bounds are snapped
/// onto the new grid; bounds the grid cannot represent are left as-is with
/// a warning.
#[derive(Debug)]
pub struct AdjustedSource<S: PointSource> {
    source: S,
    header: Header,
}

impl<S: PointSource> AdjustedSource<S> {
    /// Wraps a source with an adjustment.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Cursor;
    /// use lasstream::reader::{Adjustment, AdjustedSource, LasSource, PointSource};
    /// use lasstream::{raw, Vector};
    ///
    /// let mut cursor = Cursor::new(Vec::new());
    /// raw::Header::default().write_to(&mut cursor).unwrap();
    /// cursor.set_position(0);
    /// let source = LasSource::open(cursor).unwrap();
    /// let adjustment = Adjustment {
    ///     scale: Some(Vector { x: 0.01, y: 0.01, z: 0.01 }),
    ///     offset: None,
    /// };
    /// let adjusted = AdjustedSource::new(source, adjustment);
    /// assert_eq!(0.01, adjusted.header().transforms.x.scale);
    /// ```
    pub fn new(source: S, adjustment: Adjustment) -> AdjustedSource<S> {
        let mut header = source.header().clone();
        adjustment.apply(&mut header.transforms);
        match header.bounds.adapt(&header.transforms) {
            Ok(bounds) => header.bounds = bounds,
            Err(err) => warn!("the declared bounds don't fit the adjusted grid: {err}"),
        }
        AdjustedSource { source, header }
    }
}

impl<S: PointSource> PointSource for AdjustedSource<S> {
    fn header(&self) -> &Header {
        &self.header
    }

    fn read_next(&mut self) -> Result<Option<Point>> {
        self.source.read_next()
    }

    fn seek(&mut self, position: u64) -> Result<()> {
        self.source.seek(position)
    }

    fn position(&self) -> u64 {
        self.source.position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::LasSource;
    use crate::raw;
    use std::io::Cursor;

    fn source() -> LasSource<Cursor<Vec<u8>>> {
        let format = crate::point::Format::new(0).unwrap();
        let raw_header = raw::Header {
            number_of_point_records: 1,
            x_scale_factor: 1.,
            y_scale_factor: 1.,
            z_scale_factor: 1.,
            min_x: 0.,
            max_x: 10.,
            ..Default::default()
        };
        let mut cursor = Cursor::new(Vec::new());
        raw_header.write_to(&mut cursor).unwrap();
        raw::Point {
            x: 7,
            ..Default::default()
        }
        .write_to(&mut cursor, format)
        .unwrap();
        cursor.set_position(0);
        LasSource::open(cursor).unwrap()
    }

    #[test]
    fn points_are_untouched() {
        let adjustment = Adjustment {
            scale: Some(Vector {
                x: 0.5,
                y: 0.5,
                z: 0.5,
            }),
            offset: Some(Vector {
                x: 100.,
                y: 100.,
                z: 100.,
            }),
        };
        let mut adjusted = AdjustedSource::new(source(), adjustment);
        assert_eq!(0.5, adjusted.header().transforms.x.scale);
        assert_eq!(100., adjusted.header().transforms.y.offset);
        let point = adjusted.read_next().unwrap().unwrap();
        assert_eq!(7., point.x);
    }

    #[test]
    fn identity_changes_nothing() {
        let adjustment = Adjustment::default();
        assert!(adjustment.is_identity());
        let adjusted = AdjustedSource::new(source(), adjustment);
        assert_eq!(1., adjusted.header().transforms.x.scale);
    }

    #[test]
    fn bounds_snap_to_the_new_grid() {
        let adjustment = Adjustment {
            scale: Some(Vector {
                x: 3.,
                y: 3.,
                z: 3.,
            }),
            offset: None,
        };
        let adjusted = AdjustedSource::new(source(), adjustment);
        // 10 is not a multiple of 3; the maximum snaps outward.
        assert_eq!(12., adjusted.header().bounds.max.x);
    }
}
