//! The chunk type - a fixed-capacity byte block with read/write cursors.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{trace, warn};

use super::memory::Memory;
use super::pool::PoolInner;
use crate::error::ChunkError;
use crate::primitive::{ByteOrder, Primitive};
use crate::util::check_range;

/// Shared backing store of a chunk and all of its views.
pub(crate) struct Block {
    memory: RefCell<Box<dyn Memory>>,
    capacity: usize,
    refs: Cell<usize>,
    pool: Option<Weak<PoolInner>>,
}

impl Block {
    pub(crate) fn new(memory: Box<dyn Memory>, pool: Option<Weak<PoolInner>>) -> Rc<Self> {
        let capacity = memory.len();
        Rc::new(Self {
            memory: RefCell::new(memory),
            capacity,
            refs: Cell::new(0),
            pool,
        })
    }
}

/// A fixed-capacity byte buffer with independent read and write cursors.
///
/// Cursors always satisfy
/// `start_gap <= read_position <= write_position <= limit <= capacity`.
///
/// The memory lives in a reference-counted block. [`ChunkBuffer::duplicate`]
/// creates a *view*: a second handle onto the same bytes with its own
/// cursors. The block goes back to its pool only after the owning handle
/// and every view have been released.
///
/// Releasing happens either explicitly with [`ChunkBuffer::release`] or when
/// the handle is dropped.
///
/// # Example
///
/// ```
/// use chunkio::{ChunkPool, PoolConfig};
///
/// let pool = ChunkPool::new(PoolConfig::new(8, 4)?)?;
/// let mut chunk = pool.borrow()?;
/// chunk.store_u32_at(0, 0x0102_0304)?;
/// chunk.commit_written(4)?;
///
/// let view = chunk.duplicate();
/// assert_eq!(view.load_u8_at(0)?, 0x01);
/// assert_eq!(chunk.ref_count(), 2);
///
/// view.release()?;
/// chunk.release()?;
/// assert_eq!(pool.idle_count(), 1);
/// # Ok::<(), chunkio::ChunkError>(())
/// ```
pub struct ChunkBuffer {
    block: Rc<Block>,
    start_gap: usize,
    read_position: usize,
    write_position: usize,
    limit: usize,
    view: bool,
    acquired: bool,
    attachment: Option<Box<dyn Any>>,
}

macro_rules! big_endian_accessors {
    ($($ty:ty => $load:ident, $store:ident;)*) => {
        $(
            #[doc = concat!("Loads a big-endian `", stringify!($ty), "` at `index`.")]
            pub fn $load(&self, index: usize) -> Result<$ty, ChunkError> {
                self.load_at::<$ty>(index, ByteOrder::BigEndian)
            }

            #[doc = concat!("Stores a big-endian `", stringify!($ty), "` at `index`.")]
            pub fn $store(&mut self, index: usize, value: $ty) -> Result<(), ChunkError> {
                self.store_at::<$ty>(index, value, ByteOrder::BigEndian)
            }
        )*
    };
}

impl ChunkBuffer {
    /// Idle chunk over `block`: not acquired, cursors ready for writing.
    pub(crate) fn idle(block: Rc<Block>) -> Self {
        let limit = block.capacity;
        Self {
            block,
            start_gap: 0,
            read_position: 0,
            write_position: 0,
            limit,
            view: false,
            acquired: false,
            attachment: None,
        }
    }

    /// Wraps caller-supplied memory without copying.
    ///
    /// The whole block is readable. The chunk is never returned to a shared
    /// pool: once the last reference is released the memory is dropped.
    pub fn wrap(memory: impl Memory) -> Self {
        let mut chunk = Self::idle(Block::new(Box::new(memory), None));
        chunk.reset_for_read();
        chunk.block.refs.set(1);
        chunk.acquired = true;
        chunk
    }

    /// A zero-capacity unpooled chunk, used as the "nothing buffered" state.
    pub fn empty() -> Self {
        Self::wrap(Vec::new())
    }

    /// Takes the first reference on an idle chunk handed out by a pool.
    pub(crate) fn acquire(&mut self) -> Result<(), ChunkError> {
        if self.acquired || self.block.refs.get() != 0 {
            return Err(ChunkError::IllegalState {
                message: "chunk is already in use",
            });
        }
        self.block.refs.set(1);
        self.acquired = true;
        Ok(())
    }

    /// Total size of the underlying memory.
    pub fn capacity(&self) -> usize {
        self.block.capacity
    }

    /// Bytes reserved in front of the readable region.
    pub fn start_gap(&self) -> usize {
        self.start_gap
    }

    /// Bytes reserved after the write limit.
    pub fn end_gap(&self) -> usize {
        self.block.capacity - self.limit
    }

    /// Index of the next byte to read.
    pub fn read_position(&self) -> usize {
        self.read_position
    }

    /// Index of the next byte to write.
    pub fn write_position(&self) -> usize {
        self.write_position
    }

    /// Write ceiling.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of bytes between the read and write cursors.
    pub fn read_remaining(&self) -> usize {
        self.write_position - self.read_position
    }

    /// Number of bytes that can still be written before `limit`.
    pub fn write_remaining(&self) -> usize {
        self.limit - self.write_position
    }

    /// Number of live handles (owner plus views) on the shared memory.
    pub fn ref_count(&self) -> usize {
        self.block.refs.get()
    }

    /// Returns true if this handle was created by [`ChunkBuffer::duplicate`].
    pub fn is_view(&self) -> bool {
        self.view
    }

    /// Returns true if both handles share the same memory.
    pub fn shares_memory_with(&self, other: &ChunkBuffer) -> bool {
        Rc::ptr_eq(&self.block, &other.block)
    }

    /// Makes the whole chunk writable and empty.
    pub fn reset_for_write(&mut self) {
        self.reset_for_write_with_limit(self.block.capacity);
    }

    /// Makes the chunk writable up to `limit` (clamped to capacity) and empty.
    pub fn reset_for_write_with_limit(&mut self, limit: usize) {
        self.start_gap = 0;
        self.read_position = 0;
        self.write_position = 0;
        self.limit = limit.min(self.block.capacity);
    }

    /// Makes the whole chunk readable.
    pub fn reset_for_read(&mut self) {
        self.start_gap = 0;
        self.read_position = 0;
        self.write_position = self.block.capacity;
        self.limit = self.block.capacity;
    }

    /// Reserves `gap` bytes in front of the content for a header written later.
    ///
    /// Fails with `IllegalState` when content already occupies the region.
    pub fn reserve_start_gap(&mut self, gap: usize) -> Result<(), ChunkError> {
        if self.read_position >= gap {
            self.start_gap = gap;
            return Ok(());
        }

        if self.read_position == self.write_position {
            if gap > self.limit {
                return Err(ChunkError::IllegalState {
                    message: "start gap does not fit before the write limit",
                });
            }
            self.start_gap = gap;
            self.read_position = gap;
            self.write_position = gap;
            return Ok(());
        }

        Err(ChunkError::IllegalState {
            message: "start gap overlaps content already written",
        })
    }

    /// Reserves `gap` bytes at the end of the chunk for a trailer.
    ///
    /// Fails with `IllegalState` when content already occupies the region.
    pub fn reserve_end_gap(&mut self, gap: usize) -> Result<(), ChunkError> {
        let Some(new_limit) = self.block.capacity.checked_sub(gap) else {
            return Err(ChunkError::IllegalState {
                message: "end gap is larger than the chunk",
            });
        };

        if new_limit >= self.write_position {
            self.limit = new_limit;
            return Ok(());
        }

        if new_limit < self.start_gap {
            return Err(ChunkError::IllegalState {
                message: "end gap overlaps the start gap",
            });
        }

        if self.read_position == self.write_position {
            self.limit = new_limit;
            self.read_position = new_limit;
            self.write_position = new_limit;
            return Ok(());
        }

        Err(ChunkError::IllegalState {
            message: "end gap overlaps content already written",
        })
    }

    /// Marks `count` more bytes as written.
    pub fn commit_written(&mut self, count: usize) -> Result<(), ChunkError> {
        check_range(self.write_position, count, self.limit)?;
        self.write_position += count;
        Ok(())
    }

    /// Moves the write cursor to `position`, which must lie in `read_position..=limit`.
    pub(crate) fn commit_written_until(&mut self, position: usize) -> Result<(), ChunkError> {
        if position < self.read_position || position > self.limit {
            return Err(ChunkError::IndexOutOfRange {
                offset: position,
                length: 0,
                capacity: self.limit,
            });
        }
        self.write_position = position;
        Ok(())
    }

    /// Skips exactly `count` readable bytes.
    pub fn discard_exact(&mut self, count: usize) -> Result<(), ChunkError> {
        let remaining = self.read_remaining();
        if count > remaining {
            return Err(ChunkError::EndOfInput {
                needed: count - remaining,
            });
        }
        self.read_position += count;
        Ok(())
    }

    /// Moves the read cursor back by `count`, never past the start gap.
    pub fn rewind(&mut self, count: usize) -> Result<(), ChunkError> {
        match self.read_position.checked_sub(count) {
            Some(position) if position >= self.start_gap => {
                self.read_position = position;
                Ok(())
            }
            _ => Err(ChunkError::IllegalArgument {
                message: "cannot rewind past the start gap",
            }),
        }
    }

    /// Writes `header` into the start gap, directly in front of the content.
    ///
    /// The readable region grows by `header.len()` and the gap shrinks by the same amount.
    pub fn prepend(&mut self, header: &[u8]) -> Result<(), ChunkError> {
        let length = header.len();
        if length > self.start_gap {
            return Err(ChunkError::IllegalState {
                message: "start gap is too small for the header",
            });
        }
        let position = self.read_position - length;
        self.copy_from_slice(header, position)?;
        self.read_position = position;
        self.start_gap -= length;
        Ok(())
    }

    /// Loads the byte at `index`.
    pub fn load_u8_at(&self, index: usize) -> Result<u8, ChunkError> {
        check_range(index, 1, self.block.capacity)?;
        Ok(self.block.memory.borrow().as_slice()[index])
    }

    /// Stores `value` at `index`.
    pub fn store_u8_at(&mut self, index: usize, value: u8) -> Result<(), ChunkError> {
        check_range(index, 1, self.block.capacity)?;
        self.block.memory.borrow_mut().as_mut_slice()[index] = value;
        Ok(())
    }

    /// Loads a primitive at `index` in the given byte order.
    pub fn load_at<T: Primitive>(&self, index: usize, order: ByteOrder) -> Result<T, ChunkError> {
        check_range(index, T::SIZE, self.block.capacity)?;
        let memory = self.block.memory.borrow();
        Ok(T::decode(&memory.as_slice()[index..], order))
    }

    /// Stores a primitive at `index` in the given byte order.
    pub fn store_at<T: Primitive>(
        &mut self,
        index: usize,
        value: T,
        order: ByteOrder,
    ) -> Result<(), ChunkError> {
        check_range(index, T::SIZE, self.block.capacity)?;
        let mut memory = self.block.memory.borrow_mut();
        value.encode(&mut memory.as_mut_slice()[index..], order);
        Ok(())
    }

    big_endian_accessors! {
        i8 => load_i8_at, store_i8_at;
        u16 => load_u16_at, store_u16_at;
        i16 => load_i16_at, store_i16_at;
        u32 => load_u32_at, store_u32_at;
        i32 => load_i32_at, store_i32_at;
        u64 => load_u64_at, store_u64_at;
        i64 => load_i64_at, store_i64_at;
        f32 => load_f32_at, store_f32_at;
        f64 => load_f64_at, store_f64_at;
    }

    /// Copies `length` bytes starting at `src_offset` into `destination` at `dst_offset`.
    ///
    /// Views of the same memory are handled with an overlap-safe move.
    pub fn copy_to_chunk(
        &self,
        destination: &mut ChunkBuffer,
        src_offset: usize,
        length: usize,
        dst_offset: usize,
    ) -> Result<(), ChunkError> {
        check_range(src_offset, length, self.block.capacity)?;
        check_range(dst_offset, length, destination.block.capacity)?;

        if self.shares_memory_with(destination) {
            let mut memory = self.block.memory.borrow_mut();
            memory
                .as_mut_slice()
                .copy_within(src_offset..src_offset + length, dst_offset);
            return Ok(());
        }

        let source = self.block.memory.borrow();
        let mut target = destination.block.memory.borrow_mut();
        target.as_mut_slice()[dst_offset..dst_offset + length]
            .copy_from_slice(&source.as_slice()[src_offset..src_offset + length]);
        Ok(())
    }

    /// Copies bytes inside this chunk; the ranges may overlap.
    pub fn copy_within(
        &mut self,
        src_offset: usize,
        length: usize,
        dst_offset: usize,
    ) -> Result<(), ChunkError> {
        check_range(src_offset, length, self.block.capacity)?;
        check_range(dst_offset, length, self.block.capacity)?;
        self.block
            .memory
            .borrow_mut()
            .as_mut_slice()
            .copy_within(src_offset..src_offset + length, dst_offset);
        Ok(())
    }

    /// Copies `length` bytes starting at `src_offset` into `destination[dst_offset..]`.
    pub fn copy_to_slice(
        &self,
        destination: &mut [u8],
        src_offset: usize,
        length: usize,
        dst_offset: usize,
    ) -> Result<(), ChunkError> {
        check_range(src_offset, length, self.block.capacity)?;
        check_range(dst_offset, length, destination.len())?;
        let memory = self.block.memory.borrow();
        destination[dst_offset..dst_offset + length]
            .copy_from_slice(&memory.as_slice()[src_offset..src_offset + length]);
        Ok(())
    }

    /// Copies all of `source` into the chunk at `dst_offset`. Cursors are untouched.
    pub fn copy_from_slice(&mut self, source: &[u8], dst_offset: usize) -> Result<(), ChunkError> {
        check_range(dst_offset, source.len(), self.block.capacity)?;
        let mut memory = self.block.memory.borrow_mut();
        memory.as_mut_slice()[dst_offset..dst_offset + source.len()].copy_from_slice(source);
        Ok(())
    }

    /// Runs `f` over `length` bytes starting at `offset`.
    pub fn with_slice<R>(
        &self,
        offset: usize,
        length: usize,
        f: impl FnOnce(&[u8]) -> R,
    ) -> Result<R, ChunkError> {
        check_range(offset, length, self.block.capacity)?;
        let memory = self.block.memory.borrow();
        Ok(f(&memory.as_slice()[offset..offset + length]))
    }

    /// Runs `f` over `length` writable bytes starting at `offset`.
    pub fn with_slice_mut<R>(
        &mut self,
        offset: usize,
        length: usize,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> Result<R, ChunkError> {
        check_range(offset, length, self.block.capacity)?;
        let mut memory = self.block.memory.borrow_mut();
        Ok(f(&mut memory.as_mut_slice()[offset..offset + length]))
    }

    /// Copies the readable region into a new vector.
    pub fn readable_to_vec(&self) -> Vec<u8> {
        let memory = self.block.memory.borrow();
        memory.as_slice()[self.read_position..self.write_position].to_vec()
    }

    /// Creates a view: a new handle on the same memory with its own cursors.
    pub fn duplicate(&self) -> ChunkBuffer {
        self.block.refs.set(self.block.refs.get() + 1);
        ChunkBuffer {
            block: Rc::clone(&self.block),
            start_gap: self.start_gap,
            read_position: self.read_position,
            write_position: self.write_position,
            limit: self.limit,
            view: true,
            acquired: true,
            attachment: None,
        }
    }

    /// Stores a caller-defined value on this handle, returning the previous one.
    pub fn attach(&mut self, value: Box<dyn Any>) -> Option<Box<dyn Any>> {
        self.attachment.replace(value)
    }

    /// Returns the attached value, if any.
    pub fn attachment(&self) -> Option<&dyn Any> {
        self.attachment.as_deref()
    }

    /// Removes and returns the attached value.
    pub fn take_attachment(&mut self) -> Option<Box<dyn Any>> {
        self.attachment.take()
    }

    /// Clears cursors and attachment before the chunk is cached by a pool.
    pub(crate) fn clear_for_pool(&mut self) {
        self.reset_for_write();
        self.attachment = None;
    }

    /// Releases this handle.
    ///
    /// When the last handle on the memory goes away the memory is recycled
    /// into its pool, or disposed if it has none.
    pub fn release(mut self) -> Result<(), ChunkError> {
        self.release_ref()
    }

    fn release_ref(&mut self) -> Result<(), ChunkError> {
        if !self.acquired {
            return Err(ChunkError::IllegalState {
                message: "chunk is already released",
            });
        }
        self.acquired = false;
        self.attachment = None;

        let refs = self.block.refs.get();
        if refs == 0 {
            return Err(ChunkError::IllegalState {
                message: "chunk reference count underflow",
            });
        }
        self.block.refs.set(refs - 1);
        if refs == 1 {
            reclaim(&self.block);
        }
        Ok(())
    }
}

/// Hands memory whose last reference just went away back to its pool.
fn reclaim(block: &Rc<Block>) {
    let idle = ChunkBuffer::idle(Rc::clone(block));
    match block.pool.as_ref().and_then(Weak::upgrade) {
        Some(pool) => {
            if let Err(e) = pool.recycle(idle) {
                warn!(error = %e, "pool refused a released chunk");
            }
        }
        None => trace!(capacity = block.capacity, "disposing unpooled chunk"),
    }
}

impl Drop for ChunkBuffer {
    fn drop(&mut self) {
        if self.acquired {
            trace!(view = self.view, "chunk released on drop");
            if let Err(e) = self.release_ref() {
                warn!(error = %e, "failed to release chunk on drop");
            }
        }
    }
}

impl fmt::Debug for ChunkBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkBuffer")
            .field("capacity", &self.block.capacity)
            .field("start_gap", &self.start_gap)
            .field("read_position", &self.read_position)
            .field("write_position", &self.write_position)
            .field("limit", &self.limit)
            .field("ref_count", &self.block.refs.get())
            .field("view", &self.view)
            .finish()
    }
}
