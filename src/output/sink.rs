//! Destinations that take sealed chunks from an [`Output`](crate::Output).

use std::io::Write;

use bytes::BytesMut;

use crate::buffer::ChunkBuffer;
use crate::chain::ChunkChain;
use crate::error::ChunkError;

/// Something that consumes filled chunks.
pub trait Sink {
    /// Takes ownership of a sealed chunk.
    ///
    /// The chunk's readable region is exactly the valid bytes. The sink
    /// releases the chunk once it no longer needs the memory.
    fn flush(&mut self, chunk: ChunkBuffer) -> Result<(), ChunkError>;

    /// Releases sink-side resources.
    fn close(&mut self) -> Result<(), ChunkError> {
        Ok(())
    }
}

/// Adapts any [`std::io::Write`] into a [`Sink`].
///
/// Each sealed chunk is written with `write_all`; the writer itself is
/// flushed on close.
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    /// Wraps `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns a reference to the wrapped writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Unwraps the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Sink for WriterSink<W> {
    fn flush(&mut self, chunk: ChunkBuffer) -> Result<(), ChunkError> {
        let writer = &mut self.writer;
        chunk.with_slice(chunk.read_position(), chunk.read_remaining(), |bytes| {
            writer.write_all(bytes)
        })??;
        chunk.release()
    }

    fn close(&mut self) -> Result<(), ChunkError> {
        self.writer.flush()?;
        Ok(())
    }
}

impl Sink for BytesMut {
    fn flush(&mut self, chunk: ChunkBuffer) -> Result<(), ChunkError> {
        chunk.with_slice(chunk.read_position(), chunk.read_remaining(), |bytes| {
            self.extend_from_slice(bytes)
        })?;
        chunk.release()
    }
}

impl Sink for Vec<u8> {
    fn flush(&mut self, chunk: ChunkBuffer) -> Result<(), ChunkError> {
        chunk.with_slice(chunk.read_position(), chunk.read_remaining(), |bytes| {
            self.extend_from_slice(bytes)
        })?;
        chunk.release()
    }
}

/// Seals chunks into the chain without copying.
impl Sink for ChunkChain {
    fn flush(&mut self, chunk: ChunkBuffer) -> Result<(), ChunkError> {
        let length = chunk.read_remaining();
        self.append(chunk, length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(bytes: &[u8]) -> ChunkBuffer {
        ChunkBuffer::wrap(bytes.to_vec())
    }

    #[test]
    fn test_writer_sink() {
        let mut sink = WriterSink::new(Vec::new());
        sink.flush(filled(b"ab")).unwrap();
        sink.flush(filled(b"cd")).unwrap();
        sink.close().unwrap();
        assert_eq!(sink.into_inner(), b"abcd");
    }

    #[test]
    fn test_bytes_mut_sink_honours_read_position() {
        let mut chunk = filled(b"xyz");
        chunk.discard_exact(1).unwrap();

        let mut sink = BytesMut::new();
        sink.flush(chunk).unwrap();
        assert_eq!(&sink[..], b"yz");
    }

    #[test]
    fn test_chain_sink_keeps_chunks() {
        let mut chain = ChunkChain::new();
        chain.flush(filled(b"12")).unwrap();
        chain.flush(filled(b"345")).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.to_vec().unwrap(), b"12345");
    }
}
