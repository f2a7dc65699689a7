use super::PointSource;
use crate::{Error, Header, Point, Result};
use log::debug;

/// Presents any number of sources as one stream with transparent file
/// boundaries.
///
/// The merged header unions the bounds and sums the point counts; the
/// point formats must agree. Transforms may differ between the files --
/// points come out of each source already in real-world coordinates -- but
/// the merged header carries the first file's transforms, so anything that
/// quantizes against them (e.g. coordinate mutations) uses the first
/// file's grid.
#[allow(missing_debug_implementations)]
pub struct MergedSource<S: PointSource> {
    sources: Vec<S>,
    offsets: Vec<u64>,
    current: usize,
    position: u64,
    header: Header,
}

impl<S: PointSource> MergedSource<S> {
    /// Creates a merged source.
    ///
    /// Returns an error if no sources are given or if the point formats
    /// disagree.
    pub fn new(sources: Vec<S>) -> Result<MergedSource<S>> {
        let Some(first) = sources.first() else {
            return Err(Error::NoFiles);
        };
        let mut header = first.header().clone();
        let expected = header.point_format.to_u8();
        let mut offsets = Vec::with_capacity(sources.len());
        let mut number_of_points = 0u64;
        let mut number_of_points_by_return = [0u64; 15];
        let mut bounds = header.bounds;
        for source in &sources {
            let source_header = source.header();
            let actual = source_header.point_format.to_u8();
            if actual != expected {
                return Err(Error::MergeFormatMismatch { expected, actual });
            }
            if source_header.transforms != header.transforms {
                debug!("merging files with differing transforms, keeping the first file's");
            }
            offsets.push(number_of_points);
            number_of_points += source_header.number_of_points;
            for (a, b) in number_of_points_by_return
                .iter_mut()
                .zip(source_header.number_of_points_by_return)
            {
                *a = a.saturating_add(b);
            }
            bounds.extend(&source_header.bounds);
        }
        header.number_of_points = number_of_points;
        header.number_of_points_by_return = number_of_points_by_return;
        header.bounds = bounds;
        Ok(MergedSource {
            sources,
            offsets,
            current: 0,
            position: 0,
            header,
        })
    }

    /// The number of merged files.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns true if there are no files (never: construction rejects it).
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl<S: PointSource> PointSource for MergedSource<S> {
    fn header(&self) -> &Header {
        &self.header
    }

    fn read_next(&mut self) -> Result<Option<Point>> {
        loop {
            let Some(source) = self.sources.get_mut(self.current) else {
                return Ok(None);
            };
            if let Some(point) = source.read_next()? {
                self.position += 1;
                return Ok(Some(point));
            }
            self.current += 1;
            if let Some(next) = self.sources.get_mut(self.current) {
                next.seek(0)?;
            }
        }
    }

    fn seek(&mut self, position: u64) -> Result<()> {
        let file = self
            .offsets
            .partition_point(|&offset| offset <= position)
            .saturating_sub(1);
        self.sources[file].seek(position - self.offsets[file])?;
        self.current = file;
        self.position = position;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }
}
