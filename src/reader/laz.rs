use super::PointSource;
use crate::{raw, Header, Point, Result};
use std::io::{Cursor, Read, Seek};

/// A point source decoding laszip-compressed records.
///
/// The entropy coder is a black box behind the `laz` crate: this source
/// hands it a byte buffer per record and decodes the result exactly like
/// the uncompressed path. Seeks go through the codec, which uses the chunk
/// table to avoid decompressing everything up to the target.
#[allow(missing_debug_implementations)]
pub struct LazSource<R: Read + Seek + Send + 'static> {
    decompressor: laz::LasZipDecompressor<'static, R>,
    buffer: Cursor<Vec<u8>>,
    header: Header,
    position: u64,
}

impl<R: Read + Seek + Send + 'static> LazSource<R> {
    /// Creates a source over a stream whose header was already read.
    ///
    /// The stream must be positioned at the first compressed byte, and the
    /// header must carry a laszip vlr.
    pub fn new(read: R, header: Header) -> Result<LazSource<R>> {
        let decompressor = laz::LasZipDecompressor::new(read, header.laz_vlr()?)?;
        let buffer = Cursor::new(vec![0u8; usize::from(header.point_format.len())]);
        Ok(LazSource {
            decompressor,
            buffer,
            header,
            position: 0,
        })
    }

    /// Opens a source, reading the header first.
    pub fn open(mut read: R) -> Result<LazSource<R>> {
        let header = Header::read_from(&mut read)?;
        LazSource::new(read, header)
    }
}

impl<R: Read + Seek + Send + 'static> PointSource for LazSource<R> {
    fn header(&self) -> &Header {
        &self.header
    }

    fn read_next(&mut self) -> Result<Option<Point>> {
        if self.position < self.header.number_of_points {
            self.position += 1;
            self.decompressor.decompress_one(self.buffer.get_mut())?;
            self.buffer.set_position(0);
            raw::Point::read_from(&mut self.buffer, self.header.point_format)
                .map(|raw_point| Point::new(raw_point, &self.header.transforms))
                .map(Some)
        } else {
            Ok(None)
        }
    }

    fn seek(&mut self, position: u64) -> Result<()> {
        self.decompressor.seek(position)?;
        self.position = position;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }
}
