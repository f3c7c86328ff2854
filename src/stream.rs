//! Seekable byte sources that fonts are loaded from.
//!
//! Every read is exact: a read that cannot fill its buffer fails with
//! `io::ErrorKind::UnexpectedEof` rather than returning a short count.

use std::io::{self, Read, Seek, SeekFrom};

use crate::error::SfntError;

/// A seekable source of font data.
pub trait Stream {
    /// Move the cursor to the absolute position `pos`. Seeking past `size` is an error.
    fn seek(&mut self, pos: u64) -> Result<(), SfntError>;

    /// Fill `buf` completely from the current position.
    fn read(&mut self, buf: &mut [u8]) -> Result<(), SfntError>;

    fn tell(&self) -> u64;

    fn size(&self) -> u64;

    /// Seek to `pos` then fill `buf`.
    fn read_at(&mut self, pos: u64, buf: &mut [u8]) -> Result<(), SfntError> {
        self.seek(pos)?;
        self.read(buf)
    }

    /// Read `len` bytes from the current position into a new buffer.
    fn read_vec(&mut self, len: usize) -> Result<Vec<u8>, SfntError> {
        let remaining = self.size().saturating_sub(self.tell());
        if u64::try_from(len)? > remaining {
            return Err(eof().into());
        }
        let mut data = Vec::new();
        data.try_reserve_exact(len)?;
        data.resize(len, 0);
        self.read(&mut data)?;
        Ok(data)
    }
}

fn eof() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "read past end of stream")
}

fn seek_out_of_range(pos: u64, size: u64) -> SfntError {
    SfntError::Io(io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("seek to {} past end of stream ({} bytes)", pos, size),
    ))
}

/// A stream over an in-memory buffer.
pub struct MemoryStream<T: AsRef<[u8]>> {
    data: T,
    pos: u64,
}

impl<T: AsRef<[u8]>> MemoryStream<T> {
    pub fn new(data: T) -> Self {
        MemoryStream { data, pos: 0 }
    }

    pub fn into_inner(self) -> T {
        self.data
    }
}

impl<T: AsRef<[u8]>> Stream for MemoryStream<T> {
    fn seek(&mut self, pos: u64) -> Result<(), SfntError> {
        let size = self.size();
        if pos > size {
            return Err(seek_out_of_range(pos, size));
        }
        self.pos = pos;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), SfntError> {
        let data = self.data.as_ref();
        let start = usize::try_from(self.pos)?;
        let src = start
            .checked_add(buf.len())
            .and_then(|end| data.get(start..end))
            .ok_or_else(eof)?;
        buf.copy_from_slice(src);
        self.pos += buf.len() as u64;
        Ok(())
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn size(&self) -> u64 {
        self.data.as_ref().len() as u64
    }
}

/// A stream over any `Read + Seek` source, such as a `File`.
///
/// The size is measured once when the stream is created.
pub struct IoStream<R: Read + Seek> {
    inner: R,
    pos: u64,
    size: u64,
}

impl<R: Read + Seek> IoStream<R> {
    pub fn new(mut inner: R) -> Result<Self, SfntError> {
        let size = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(IoStream {
            inner,
            pos: 0,
            size,
        })
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> Stream for IoStream<R> {
    fn seek(&mut self, pos: u64) -> Result<(), SfntError> {
        if pos > self.size {
            return Err(seek_out_of_range(pos, self.size));
        }
        self.pos = self.inner.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), SfntError> {
        self.inner.read_exact(buf)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn size(&self) -> u64 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn memory_stream_reads_exactly() {
        let mut stream = MemoryStream::new(vec![1, 2, 3, 4, 5]);
        let mut buf = [0; 3];
        stream.read(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(stream.tell(), 3);

        match stream.read(&mut buf) {
            Err(SfntError::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected eof, got {:?}", other),
        }
    }

    #[test]
    fn seek_past_end_is_rejected() {
        let mut stream = MemoryStream::new([0u8; 4]);
        assert!(stream.seek(4).is_ok());
        match stream.seek(5) {
            Err(SfntError::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::InvalidInput),
            other => panic!("expected invalid input, got {:?}", other),
        }
        assert_eq!(stream.tell(), 4);
    }

    #[test]
    fn io_stream_matches_memory_stream() {
        let data = (0u8..32).collect::<Vec<_>>();
        let mut io = IoStream::new(Cursor::new(data.clone())).unwrap();
        let mut mem = MemoryStream::new(data);
        assert_eq!(io.size(), mem.size());

        let mut a = [0; 8];
        let mut b = [0; 8];
        io.read_at(10, &mut a).unwrap();
        mem.read_at(10, &mut b).unwrap();
        assert_eq!(a, b);
        assert_eq!(io.tell(), 18);
        assert_eq!(io.read_vec(14).unwrap(), mem.read_vec(14).unwrap());
        assert!(io.read_vec(1).is_err());
    }
}
