//! Buffered reader with prefetch and non-destructive preview.

use tracing::{debug, warn};

use super::source::{EmptySource, Source};
use crate::buffer::{ChunkBuffer, ChunkPool};
use crate::chain::ChunkChain;
use crate::error::ChunkError;
use crate::output::{Output, Sink};
use crate::primitive::{ByteOrder, MAX_PRIMITIVE_SIZE, Primitive};
use crate::util::check_range;

/// Chain length past which a growing preview window is worth a log line.
const HISTORY_WARN_CHUNKS: usize = 64;

/// Buffered sequential reader over a [`Source`].
///
/// Bytes are filled chunk by chunk from the source into chunks borrowed from
/// a [`ChunkPool`]. Multi-byte reads that straddle a chunk boundary are
/// composed transparently.
///
/// # Preview
///
/// [`Input::preview`] runs a closure that may read freely; afterwards the
/// read position is exactly where it was before. Chunks filled during the
/// preview are kept in a history chain and replayed by later reads, then
/// released as soon as nothing needs them any more.
///
/// # Example
///
/// ```
/// use chunkio::{BytesSource, ChunkPool, Input, PoolConfig};
///
/// let pool = ChunkPool::new(PoolConfig::new(4, 8)?)?;
/// let mut input = Input::new(pool, BytesSource::new(&[1u8, 2, 3, 4, 5, 6, 7, 8][..]));
///
/// let peeked = input.preview(|input| input.read_u32())?;
/// assert_eq!(peeked, 0x0102_0304);
///
/// assert_eq!(input.read_u64()?, 0x0102_0304_0506_0708);
/// assert!(input.eof()?);
/// # Ok::<(), chunkio::ChunkError>(())
/// ```
pub struct Input<S: Source> {
    pool: ChunkPool,
    source: S,
    chunk: ChunkBuffer,
    position: usize,
    limit: usize,
    history: Option<ChunkChain>,
    preview_index: usize,
    preview_discard: bool,
    closed: bool,
}

/// An input over an in-memory chunk chain, as produced by
/// [`BytePacketBuilder::build`](crate::BytePacketBuilder).
pub type ByteReadPacket = Input<EmptySource>;

macro_rules! big_endian_reads {
    ($($ty:ty => $read:ident;)*) => {
        $(
            #[doc = concat!("Reads a big-endian `", stringify!($ty), "`.")]
            pub fn $read(&mut self) -> Result<$ty, ChunkError> {
                self.read_primitive::<$ty>(ByteOrder::BigEndian)
            }
        )*
    };
}

impl<S: Source> Input<S> {
    /// Creates an input reading from `source` with chunks from `pool`.
    ///
    /// Nothing is filled until the first read.
    pub fn new(pool: ChunkPool, source: S) -> Self {
        Self {
            pool,
            source,
            chunk: ChunkBuffer::empty(),
            position: 0,
            limit: 0,
            history: None,
            preview_index: 0,
            preview_discard: true,
            closed: false,
        }
    }

    /// Returns the wrapped source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Number of bytes obtainable without calling the source again.
    pub fn buffered(&self) -> usize {
        let ahead = self
            .history
            .as_ref()
            .map_or(0, |history| history.size(self.preview_index + 1));
        self.limit - self.position + ahead
    }

    /// Returns true if the input was closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    big_endian_reads! {
        i8 => read_i8;
        u16 => read_u16;
        i16 => read_i16;
        u32 => read_u32;
        i32 => read_i32;
        u64 => read_u64;
        i64 => read_i64;
        f32 => read_f32;
        f64 => read_f64;
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> Result<u8, ChunkError> {
        if self.position == self.limit && !self.fetch_next()? {
            return Err(ChunkError::EndOfInput { needed: 1 });
        }
        let value = self.chunk.load_u8_at(self.position)?;
        self.position += 1;
        Ok(value)
    }

    /// Reads a primitive in a caller-selected byte order.
    pub fn read_with_order<T: Primitive>(&mut self, order: ByteOrder) -> Result<T, ChunkError> {
        self.read_primitive::<T>(order)
    }

    fn read_primitive<T: Primitive>(&mut self, order: ByteOrder) -> Result<T, ChunkError> {
        let size = T::SIZE;
        if self.position + size <= self.limit {
            let value = self.chunk.load_at::<T>(self.position, order)?;
            self.position += size;
            return Ok(value);
        }

        if self.position == self.limit {
            if !self.fetch_next()? {
                return Err(ChunkError::EndOfInput { needed: size });
            }
            if self.position + size <= self.limit {
                let value = self.chunk.load_at::<T>(self.position, order)?;
                self.position += size;
                return Ok(value);
            }
        }

        // Straddles a boundary: compose byte by byte.
        let mut raw = [0u8; MAX_PRIMITIVE_SIZE];
        for (index, slot) in raw[..size].iter_mut().enumerate() {
            *slot = self.read_u8().map_err(|e| match e {
                ChunkError::EndOfInput { .. } => ChunkError::EndOfInput {
                    needed: size - index,
                },
                other => other,
            })?;
        }
        Ok(T::decode(&raw, order))
    }

    /// Fills `destination[offset..offset + length]` completely.
    ///
    /// Fails with `EndOfInput` if the source runs dry first; bytes copied
    /// before that point stay consumed.
    pub fn read_fully(
        &mut self,
        destination: &mut [u8],
        offset: usize,
        length: usize,
    ) -> Result<(), ChunkError> {
        check_range(offset, length, destination.len())?;
        let copied = self.copy_out(destination, offset, length)?;
        if copied < length {
            return Err(ChunkError::EndOfInput {
                needed: length - copied,
            });
        }
        Ok(())
    }

    /// Copies up to `length` bytes into `destination[offset..]`.
    ///
    /// Returns the number of bytes copied; fewer than `length` only at end of
    /// stream, and `0` only if the stream is already exhausted.
    pub fn read_available(
        &mut self,
        destination: &mut [u8],
        offset: usize,
        length: usize,
    ) -> Result<usize, ChunkError> {
        check_range(offset, length, destination.len())?;
        self.copy_out(destination, offset, length)
    }

    fn copy_out(
        &mut self,
        destination: &mut [u8],
        offset: usize,
        length: usize,
    ) -> Result<usize, ChunkError> {
        let mut copied = 0;
        while copied < length {
            if self.position == self.limit && !self.fetch_next()? {
                break;
            }
            let count = (self.limit - self.position).min(length - copied);
            self.chunk
                .copy_to_slice(destination, self.position, count, offset + copied)?;
            self.position += count;
            copied += count;
        }
        Ok(copied)
    }

    /// Reads everything up to end of stream.
    pub fn read_to_vec(&mut self) -> Result<Vec<u8>, ChunkError> {
        let mut out = Vec::with_capacity(self.buffered());
        loop {
            if self.position == self.limit && !self.fetch_next()? {
                return Ok(out);
            }
            let start = self.position;
            let end = self.limit;
            self.chunk
                .with_slice(start, end - start, |bytes| out.extend_from_slice(bytes))?;
            self.position = end;
        }
    }

    /// Moves the currently buffered bytes (filling once if none are) into `destination`.
    ///
    /// Returns the number of bytes moved, `0` at end of stream.
    pub fn read_available_to<K: Sink>(
        &mut self,
        destination: &mut Output<K>,
    ) -> Result<usize, ChunkError> {
        if self.position == self.limit && !self.fetch_next()? {
            return Ok(0);
        }
        let count = self.limit - self.position;
        destination.write_chunk_range(&self.chunk, self.position, count)?;
        self.position += count;
        Ok(count)
    }

    /// Skips exactly `count` bytes.
    pub fn discard(&mut self, count: usize) -> Result<(), ChunkError> {
        let mut skipped = 0;
        while skipped < count {
            if self.position == self.limit && !self.fetch_next()? {
                return Err(ChunkError::EndOfInput {
                    needed: count - skipped,
                });
            }
            let step = (self.limit - self.position).min(count - skipped);
            self.position += step;
            skipped += step;
        }
        Ok(())
    }

    /// Returns true if at least `count` bytes can be read without consuming any.
    ///
    /// Missing bytes are fetched into the history chain, so later reads see
    /// them without calling the source again.
    pub fn prefetch(&mut self, count: usize) -> Result<bool, ChunkError> {
        let mut available = self.limit - self.position;
        if available >= count {
            return Ok(true);
        }
        self.ensure_open()?;

        let history = self.history.get_or_insert_with(|| {
            start_history(&self.chunk, self.limit)
        });
        available += history.size(self.preview_index + 1);

        while available < count {
            let mut fresh = self.pool.borrow()?;
            let filled = fill_chunk(&mut self.source, &mut fresh)?;
            if filled == 0 {
                return Ok(false);
            }
            history.append(fresh, filled)?;
            available += filled;
        }

        if history.len() > HISTORY_WARN_CHUNKS {
            debug!(chunks = history.len(), "prefetch history is growing");
        }
        Ok(true)
    }

    /// Returns true if no more bytes can be read.
    pub fn eof(&mut self) -> Result<bool, ChunkError> {
        Ok(!self.prefetch(1)?)
    }

    /// Returns the next byte without consuming it, `None` at end of stream.
    pub fn peek_u8(&mut self) -> Result<Option<u8>, ChunkError> {
        if self.position < self.limit {
            return self.chunk.load_u8_at(self.position).map(Some);
        }
        if !self.prefetch(1)? {
            return Ok(None);
        }
        self.preview(|input| input.read_u8()).map(Some)
    }

    /// Runs `reader` and then restores the read position to where it was.
    ///
    /// Everything read inside the closure is read again afterwards. Previews
    /// nest: an inner preview rewinds to its own mark without disturbing
    /// the outer one.
    pub fn preview<R>(&mut self, reader: impl FnOnce(&mut Self) -> R) -> R {
        let initiated = self.preview_discard;
        self.preview_discard = false;

        let mark_index = self.preview_index;
        let mark_chunk = self.chunk.duplicate();
        let mark_position = self.position;
        let mark_limit = self.limit;

        if self.history.is_none() {
            self.history = Some(start_history(&self.chunk, self.limit));
            self.preview_index = 0;
        }

        let result = reader(self);

        if !self.closed {
            self.preview_index = mark_index;
            self.chunk = mark_chunk;
            self.position = mark_position;
            self.limit = mark_limit;
        }
        self.preview_discard = initiated;
        result
    }

    /// Releases every chunk and closes the source. Idempotent.
    pub fn close(&mut self) -> Result<(), ChunkError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.position = 0;
        self.limit = 0;

        let current = std::mem::replace(&mut self.chunk, ChunkBuffer::empty());
        let released = current.release();
        let cleared = match self.history.take() {
            Some(mut history) => history.clear(),
            None => Ok(()),
        };
        debug!("input closed");

        let closed = self.source.close();
        released.and(cleared).and(closed)
    }

    fn ensure_open(&self) -> Result<(), ChunkError> {
        if self.closed {
            return Err(ChunkError::IllegalState {
                message: "input is closed",
            });
        }
        Ok(())
    }

    /// Moves to the next chunk with unread bytes.
    ///
    /// Returns false at end of stream, leaving the current chunk in place.
    fn fetch_next(&mut self) -> Result<bool, ChunkError> {
        self.ensure_open()?;
        loop {
            let Some(history) = self.history.as_mut() else {
                return self.fill_current();
            };

            if self.preview_discard {
                // Outside any preview the current chunk is the history head.
                history.discard_first()?;
                match history.get(0) {
                    Some((chunk, length)) => {
                        let next = chunk.duplicate();
                        if self.point_at(next, length) > 0 {
                            return Ok(true);
                        }
                    }
                    None => {
                        self.history = None;
                        return self.fill_current();
                    }
                }
                continue;
            }

            let index = self.preview_index + 1;
            if let Some((chunk, length)) = history.get(index) {
                let next = chunk.duplicate();
                self.preview_index = index;
                if self.point_at(next, length) > 0 {
                    return Ok(true);
                }
                continue;
            }

            let mut fresh = self.pool.borrow()?;
            let filled = fill_chunk(&mut self.source, &mut fresh)?;
            if filled == 0 {
                return Ok(false);
            }
            history.append(fresh.duplicate(), filled)?;
            if history.len() > HISTORY_WARN_CHUNKS {
                debug!(chunks = history.len(), "preview history is growing");
            }
            self.preview_index = index;
            self.point_at(fresh, filled);
            return Ok(true);
        }
    }

    /// Normal mode: replaces the exhausted chunk with a freshly filled one.
    fn fill_current(&mut self) -> Result<bool, ChunkError> {
        let mut fresh = self.pool.borrow()?;
        let filled = fill_chunk(&mut self.source, &mut fresh)?;
        if filled == 0 {
            return Ok(false);
        }
        self.point_at(fresh, filled);
        Ok(true)
    }

    fn point_at(&mut self, chunk: ChunkBuffer, length: usize) -> usize {
        self.position = chunk.read_position();
        self.limit = self.position + length;
        self.chunk = chunk;
        length
    }
}

impl Input<EmptySource> {
    /// Creates an input that replays `chain` without copying.
    pub fn from_chain(pool: ChunkPool, chain: ChunkChain) -> Self {
        let mut input = Input::new(pool, EmptySource);
        let head = chain.get(0).map(|(chunk, length)| (chunk.duplicate(), length));
        if let Some((chunk, length)) = head {
            input.point_at(chunk, length);
            input.history = Some(chain);
        }
        input
    }

    /// Number of unread bytes left in the packet.
    pub fn remaining(&self) -> usize {
        self.buffered()
    }
}

impl<S: Source> Drop for Input<S> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close input on drop");
        }
    }
}

/// History seeded with the current chunk, whose valid bytes end at `limit`.
fn start_history(chunk: &ChunkBuffer, limit: usize) -> ChunkChain {
    let mut history = ChunkChain::new();
    let length = limit - chunk.read_position();
    // The current chunk always holds at least `length` readable bytes.
    if let Err(e) = history.append(chunk.duplicate(), length) {
        warn!(error = %e, "could not seed preview history");
    }
    history
}

/// Fills the writable part of `chunk` from `source` and commits the bytes.
fn fill_chunk<S: Source>(source: &mut S, chunk: &mut ChunkBuffer) -> Result<usize, ChunkError> {
    let offset = chunk.write_position();
    let length = chunk.write_remaining();
    let filled = source.fill(chunk, offset, length)?;
    if filled > length {
        return Err(ChunkError::IllegalState {
            message: "source reported more bytes than requested",
        });
    }
    chunk.commit_written(filled)?;
    Ok(filled)
}
