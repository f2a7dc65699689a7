use super::PointSource;
use crate::{raw, Header, Point, Result};
use std::io::{Read, Seek, SeekFrom};

/// A point source decoding uncompressed las records.
#[derive(Debug)]
pub struct LasSource<R: Read + Seek> {
    read: R,
    header: Header,
    position: u64,
    start: u64,
}

impl<R: Read + Seek> LasSource<R> {
    /// Creates a source over a stream whose header was already read.
    ///
    /// The stream must be positioned at the first point byte, which is
    /// where [Header::read_from] leaves it.
    pub fn new(mut read: R, header: Header) -> Result<LasSource<R>> {
        Ok(LasSource {
            start: read.stream_position()?,
            read,
            header,
            position: 0,
        })
    }

    /// Opens a source, reading the header first.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Cursor;
    /// use lasstream::{raw, reader::LasSource};
    /// let mut cursor = Cursor::new(Vec::new());
    /// raw::Header::default().write_to(&mut cursor).unwrap();
    /// cursor.set_position(0);
    /// let source = LasSource::open(cursor).unwrap();
    /// ```
    pub fn open(mut read: R) -> Result<LasSource<R>> {
        let header = Header::read_from(&mut read)?;
        LasSource::new(read, header)
    }
}

impl<R: Read + Seek> PointSource for LasSource<R> {
    fn header(&self) -> &Header {
        &self.header
    }

    fn read_next(&mut self) -> Result<Option<Point>> {
        if self.position < self.header.number_of_points {
            self.position += 1;
            raw::Point::read_from(&mut self.read, self.header.point_format)
                .map(|raw_point| Point::new(raw_point, &self.header.transforms))
                .map(Some)
        } else {
            Ok(None)
        }
    }

    fn seek(&mut self, position: u64) -> Result<()> {
        self.position = position;
        let _ = self.read.seek(SeekFrom::Start(
            self.start + position * u64::from(self.header.point_format.len()),
        ))?;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn source_with_points(n: i32) -> LasSource<Cursor<Vec<u8>>> {
        let format = crate::point::Format::new(0).unwrap();
        let raw_header = raw::Header {
            number_of_point_records: n as u32,
            x_scale_factor: 1.,
            y_scale_factor: 1.,
            z_scale_factor: 1.,
            ..Default::default()
        };
        let mut cursor = Cursor::new(Vec::new());
        raw_header.write_to(&mut cursor).unwrap();
        for i in 0..n {
            let point = raw::Point {
                x: i,
                ..Default::default()
            };
            point.write_to(&mut cursor, format).unwrap();
        }
        cursor.set_position(0);
        LasSource::open(cursor).unwrap()
    }

    #[test]
    fn read_all() {
        let mut source = source_with_points(3);
        for i in 0..3 {
            let point = source.read_next().unwrap().unwrap();
            assert_eq!(f64::from(i), point.x);
        }
        assert!(source.read_next().unwrap().is_none());
    }

    #[test]
    fn seek_and_position() {
        let mut source = source_with_points(5);
        source.seek(3).unwrap();
        assert_eq!(3, source.position());
        let point = source.read_next().unwrap().unwrap();
        assert_eq!(3., point.x);
        assert_eq!(4, source.position());
        source.seek(5).unwrap();
        assert!(source.read_next().unwrap().is_none());
    }

    #[test]
    fn transforms_applied() {
        let format = crate::point::Format::new(0).unwrap();
        let raw_header = raw::Header {
            number_of_point_records: 1,
            x_scale_factor: 0.1,
            y_scale_factor: 0.1,
            z_scale_factor: 0.1,
            x_offset: 100.,
            ..Default::default()
        };
        let mut cursor = Cursor::new(Vec::new());
        raw_header.write_to(&mut cursor).unwrap();
        raw::Point {
            x: 10,
            y: 20,
            z: 30,
            ..Default::default()
        }
        .write_to(&mut cursor, format)
        .unwrap();
        cursor.set_position(0);
        let mut source = LasSource::open(cursor).unwrap();
        let point = source.read_next().unwrap().unwrap();
        assert_eq!(101., point.x);
        assert_eq!(2., point.y);
        assert_eq!(3., point.z);
    }
}
