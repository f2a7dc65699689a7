use std::io::{self, Read, Seek, SeekFrom};

/// Adapts a forward-only stream (a pipe, stdin) to the `Seek` bound.
///
/// Forward seeks are satisfied by reading and discarding bytes. Backward
/// seeks and end-relative seeks fail with `ErrorKind::Unsupported` -- which
/// is exactly the probe [Header::read_from](crate::Header::read_from) uses
/// to decide that a source's evlrs are out of reach.
///
/// # Examples
///
/// ```
/// use std::io::{Cursor, Read, Seek, SeekFrom};
/// use lasstream::reader::ForwardSeek;
///
/// let mut read = ForwardSeek::new(Cursor::new(vec![0, 1, 2, 3]));
/// read.seek(SeekFrom::Start(2)).unwrap();
/// let mut byte = [0];
/// read.read_exact(&mut byte).unwrap();
/// assert_eq!(2, byte[0]);
/// assert!(read.seek(SeekFrom::Start(0)).is_err());
/// assert!(read.seek(SeekFrom::End(0)).is_err());
/// ```
#[derive(Debug)]
pub struct ForwardSeek<R: Read> {
    read: R,
    position: u64,
}

impl<R: Read> ForwardSeek<R> {
    /// Creates a new adapter at position zero.
    pub fn new(read: R) -> ForwardSeek<R> {
        ForwardSeek { read, position: 0 }
    }

    fn skip(&mut self, n: u64) -> io::Result<()> {
        let skipped = io::copy(&mut self.read.by_ref().take(n), &mut io::sink())?;
        self.position += skipped;
        if skipped < n {
            Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "the stream ended inside a forward seek",
            ))
        } else {
            Ok(())
        }
    }
}

impl<R: Read> Read for ForwardSeek<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.read.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl<R: Read> Seek for ForwardSeek<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => n,
            SeekFrom::Current(n) if n >= 0 => self.position + n as u64,
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "this stream only seeks forward",
                ))
            }
        };
        if target < self.position {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "this stream only seeks forward",
            ));
        }
        self.skip(target - self.position)?;
        Ok(self.position)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.position)
    }
}
