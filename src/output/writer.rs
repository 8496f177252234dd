//! Buffered writer over a [`Sink`].

use tracing::{debug, warn};

use super::sink::Sink;
use crate::buffer::{ChunkBuffer, ChunkPool};
use crate::error::ChunkError;
use crate::primitive::{ByteOrder, MAX_PRIMITIVE_SIZE, Primitive};
use crate::util::check_range;

/// Buffered sequential writer into a [`Sink`].
///
/// Bytes are written into a chunk borrowed from a [`ChunkPool`]. When the
/// chunk is full it is sealed, handed to the sink, and replaced by a freshly
/// borrowed one; a sealed chunk is never written again. Values that do not
/// fit in the space left are split across the boundary.
///
/// # Example
///
/// ```
/// use chunkio::{ChunkPool, Output, PoolConfig};
///
/// let pool = ChunkPool::new(PoolConfig::new(4, 8)?)?;
/// let mut output = Output::new(pool, Vec::new());
/// output.write_u8(0xAA)?;
/// output.write_u32(0x0102_0304)?;
/// output.close()?;
/// assert_eq!(output.sink(), &[0xAA, 1, 2, 3, 4]);
/// # Ok::<(), chunkio::ChunkError>(())
/// ```
pub struct Output<S: Sink> {
    pub(super) pool: ChunkPool,
    pub(super) sink: S,
    pub(super) chunk: ChunkBuffer,
    pub(super) position: usize,
    pub(super) limit: usize,
    pub(super) flushed: usize,
    pub(super) closed: bool,
}

macro_rules! big_endian_writes {
    ($($ty:ty => $write:ident;)*) => {
        $(
            #[doc = concat!("Writes a big-endian `", stringify!($ty), "`.")]
            pub fn $write(&mut self, value: $ty) -> Result<(), ChunkError> {
                self.write_primitive(value, ByteOrder::BigEndian)
            }
        )*
    };
}

impl<S: Sink> Output<S> {
    /// Creates an output writing into `sink` with chunks from `pool`.
    ///
    /// No chunk is borrowed until the first write.
    pub fn new(pool: ChunkPool, sink: S) -> Self {
        Self {
            pool,
            sink,
            chunk: ChunkBuffer::empty(),
            position: 0,
            limit: 0,
            flushed: 0,
            closed: false,
        }
    }

    /// Returns the wrapped sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Returns true if the output was closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Total number of bytes written so far, flushed or not.
    pub fn size(&self) -> usize {
        self.flushed + self.position.saturating_sub(self.chunk.read_position())
    }

    big_endian_writes! {
        i8 => write_i8;
        u16 => write_u16;
        i16 => write_i16;
        u32 => write_u32;
        i32 => write_i32;
        u64 => write_u64;
        i64 => write_i64;
        f32 => write_f32;
        f64 => write_f64;
    }

    /// Writes one byte.
    pub fn write_u8(&mut self, value: u8) -> Result<(), ChunkError> {
        if self.position == self.limit {
            self.rotate()?;
        }
        self.chunk.store_u8_at(self.position, value)?;
        self.position += 1;
        Ok(())
    }

    /// Writes a primitive in a caller-selected byte order.
    pub fn write_with_order<T: Primitive>(
        &mut self,
        value: T,
        order: ByteOrder,
    ) -> Result<(), ChunkError> {
        self.write_primitive(value, order)
    }

    fn write_primitive<T: Primitive>(
        &mut self,
        value: T,
        order: ByteOrder,
    ) -> Result<(), ChunkError> {
        let size = T::SIZE;
        if self.position + size <= self.limit {
            self.chunk.store_at(self.position, value, order)?;
            self.position += size;
            return Ok(());
        }

        if self.position == self.limit {
            self.rotate()?;
            if self.position + size <= self.limit {
                self.chunk.store_at(self.position, value, order)?;
                self.position += size;
                return Ok(());
            }
        }

        let mut raw = [0u8; MAX_PRIMITIVE_SIZE];
        value.encode(&mut raw[..size], order);
        for &byte in &raw[..size] {
            self.write_u8(byte)?;
        }
        Ok(())
    }

    /// Writes `source[offset..offset + length]`.
    pub fn write_fully(
        &mut self,
        source: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<(), ChunkError> {
        check_range(offset, length, source.len())?;
        let mut written = 0;
        while written < length {
            if self.position == self.limit {
                self.rotate()?;
            }
            let count = (self.limit - self.position).min(length - written);
            let start = offset + written;
            self.chunk
                .copy_from_slice(&source[start..start + count], self.position)?;
            self.position += count;
            written += count;
        }
        Ok(())
    }

    /// Moves `length` readable bytes out of `source` into this output.
    ///
    /// The bytes are copied chunk to chunk and consumed from `source`.
    pub fn write_chunk(
        &mut self,
        source: &mut ChunkBuffer,
        length: usize,
    ) -> Result<(), ChunkError> {
        let remaining = source.read_remaining();
        if length > remaining {
            return Err(ChunkError::EndOfInput {
                needed: length - remaining,
            });
        }
        self.write_chunk_range(source, source.read_position(), length)?;
        source.discard_exact(length)
    }

    /// Copies `length` bytes of `source` starting at `offset`; cursors of `source` are untouched.
    pub(crate) fn write_chunk_range(
        &mut self,
        source: &ChunkBuffer,
        offset: usize,
        length: usize,
    ) -> Result<(), ChunkError> {
        check_range(offset, length, source.capacity())?;
        let mut written = 0;
        while written < length {
            if self.position == self.limit {
                self.rotate()?;
            }
            let count = (self.limit - self.position).min(length - written);
            source.copy_to_chunk(&mut self.chunk, offset + written, count, self.position)?;
            self.position += count;
            written += count;
        }
        Ok(())
    }

    /// Reserves `gap` bytes in front of the current chunk's content.
    ///
    /// Only legal before anything is written into the current chunk.
    pub fn reserve_start_gap(&mut self, gap: usize) -> Result<(), ChunkError> {
        if self.chunk.capacity() == 0 {
            self.rotate()?;
        }
        self.chunk.commit_written_until(self.position)?;
        self.chunk.reserve_start_gap(gap)?;
        self.position = self.chunk.write_position();
        Ok(())
    }

    /// Keeps the last `gap` bytes of the current chunk free.
    pub fn reserve_end_gap(&mut self, gap: usize) -> Result<(), ChunkError> {
        if self.chunk.capacity() == 0 {
            self.rotate()?;
        }
        self.chunk.commit_written_until(self.position)?;
        self.chunk.reserve_end_gap(gap)?;
        self.position = self.chunk.write_position();
        self.limit = self.chunk.limit();
        Ok(())
    }

    /// Hands everything written so far to the sink.
    ///
    /// The next write borrows a fresh chunk.
    pub fn flush(&mut self) -> Result<(), ChunkError> {
        self.ensure_open()?;
        self.seal()
    }

    /// Flushes, releases the current chunk and closes the sink. Idempotent.
    pub fn close(&mut self) -> Result<(), ChunkError> {
        if self.closed {
            return Ok(());
        }
        let sealed = self.seal();
        self.closed = true;
        debug!(size = self.flushed, "output closed");
        let closed = self.sink.close();
        sealed.and(closed)
    }

    pub(super) fn ensure_open(&self) -> Result<(), ChunkError> {
        if self.closed {
            return Err(ChunkError::IllegalState {
                message: "output is closed",
            });
        }
        Ok(())
    }

    /// Passes the current chunk to the sink if it holds any bytes or an
    /// unfilled start gap.
    ///
    /// Leaves an empty placeholder chunk behind.
    pub(super) fn seal(&mut self) -> Result<(), ChunkError> {
        let position = self.position;
        self.position = 0;
        self.limit = 0;
        let mut chunk = std::mem::replace(&mut self.chunk, ChunkBuffer::empty());

        // A gap-only chunk still carries the header reservation.
        if position <= chunk.read_position() && chunk.start_gap() == 0 {
            return chunk.release();
        }
        chunk.commit_written_until(position)?;
        self.flushed += chunk.read_remaining();
        self.sink.flush(chunk)
    }

    fn rotate(&mut self) -> Result<(), ChunkError> {
        self.ensure_open()?;
        self.seal()?;
        let fresh = self.pool.borrow()?;
        self.position = fresh.write_position();
        self.limit = fresh.limit();
        self.chunk = fresh;
        if self.position == self.limit {
            return Err(ChunkError::IllegalState {
                message: "borrowed chunk has no room to write",
            });
        }
        Ok(())
    }
}

impl<S: Sink> Drop for Output<S> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close output on drop");
        }
    }
}
