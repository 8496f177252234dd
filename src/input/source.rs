//! Byte sources that feed an [`Input`](crate::Input).

use std::io::{ErrorKind, Read};

use bytes::{Buf, Bytes};

use crate::buffer::ChunkBuffer;
use crate::error::ChunkError;

/// Something that can fill chunks with bytes.
pub trait Source {
    /// Writes up to `length` bytes into `chunk` starting at `offset`.
    ///
    /// Returns the number of bytes written, `0` at end of stream. Bytes
    /// outside `offset..offset + filled` must not be touched. The caller
    /// moves the chunk's write cursor.
    fn fill(
        &mut self,
        chunk: &mut ChunkBuffer,
        offset: usize,
        length: usize,
    ) -> Result<usize, ChunkError>;

    /// Releases source-side resources.
    fn close(&mut self) -> Result<(), ChunkError> {
        Ok(())
    }
}

/// Adapts any [`std::io::Read`] into a [`Source`].
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
}

impl<R: Read> ReaderSource<R> {
    /// Wraps `reader`.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Returns a reference to the wrapped reader.
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Unwraps the reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Source for ReaderSource<R> {
    fn fill(
        &mut self,
        chunk: &mut ChunkBuffer,
        offset: usize,
        length: usize,
    ) -> Result<usize, ChunkError> {
        let reader = &mut self.reader;
        let filled = chunk.with_slice_mut(offset, length, |buf| loop {
            match reader.read(buf) {
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                other => break other,
            }
        })??;
        Ok(filled)
    }
}

/// An in-memory source over [`Bytes`].
///
/// `with_fill_limit` caps how much a single fill may deliver, which is handy
/// to exercise chunk-boundary behaviour with small reads.
#[derive(Debug, Clone, Default)]
pub struct BytesSource {
    data: Bytes,
    fill_limit: usize,
}

impl BytesSource {
    /// Creates a source that yields `data`.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            fill_limit: usize::MAX,
        }
    }

    /// Caps each fill at `limit` bytes (at least one).
    pub fn with_fill_limit(mut self, limit: usize) -> Self {
        self.fill_limit = limit.max(1);
        self
    }

    /// Number of bytes not yet handed out.
    pub fn remaining(&self) -> usize {
        self.data.remaining()
    }
}

impl Source for BytesSource {
    fn fill(
        &mut self,
        chunk: &mut ChunkBuffer,
        offset: usize,
        length: usize,
    ) -> Result<usize, ChunkError> {
        let count = length.min(self.fill_limit).min(self.data.remaining());
        chunk.copy_from_slice(&self.data[..count], offset)?;
        self.data.advance(count);
        Ok(count)
    }
}

/// A source that is always at end of stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySource;

impl Source for EmptySource {
    fn fill(&mut self, _: &mut ChunkBuffer, _: usize, _: usize) -> Result<usize, ChunkError> {
        Ok(0)
    }
}
