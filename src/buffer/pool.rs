//! Bounded pools of ready-to-use chunks.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use super::chunk::{Block, ChunkBuffer};
use super::memory::{Memory, heap};
use crate::config::PoolConfig;
use crate::error::ChunkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoolKind {
    /// Keeps up to `capacity` idle chunks.
    Bounded,
    /// Always produces, always disposes.
    NoPool,
    /// Owns exactly one chunk, lent out at most once at a time.
    Single,
}

/// Counters describing what a pool has done so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Chunks allocated by the pool.
    pub produced: usize,
    /// Chunks taken back into the idle list.
    pub recycled: usize,
    /// Chunks dropped instead of being retained.
    pub disposed: usize,
    /// Chunks currently idle.
    pub idle: usize,
}

pub(crate) struct PoolInner {
    kind: PoolKind,
    chunk_size: usize,
    capacity: usize,
    idle: RefCell<Vec<ChunkBuffer>>,
    produced: Cell<usize>,
    recycled: Cell<usize>,
    disposed: Cell<usize>,
}

impl PoolInner {
    fn new(kind: PoolKind, chunk_size: usize, capacity: usize) -> Self {
        Self {
            kind,
            chunk_size,
            capacity,
            idle: RefCell::new(Vec::new()),
            produced: Cell::new(0),
            recycled: Cell::new(0),
            disposed: Cell::new(0),
        }
    }

    /// Takes back a chunk whose reference count reached zero.
    pub(crate) fn recycle(&self, mut chunk: ChunkBuffer) -> Result<(), ChunkError> {
        if chunk.is_view() {
            return Err(ChunkError::IllegalState {
                message: "views cannot be recycled",
            });
        }
        if chunk.ref_count() != 0 {
            return Err(ChunkError::IllegalState {
                message: "chunk is still referenced",
            });
        }
        if self.kind != PoolKind::Single && chunk.capacity() != self.chunk_size {
            return Err(ChunkError::IllegalState {
                message: "chunk was not produced by this pool",
            });
        }

        chunk.clear_for_pool();

        if self.kind == PoolKind::NoPool {
            self.dispose_one(chunk);
            return Ok(());
        }

        let mut idle = self.idle.borrow_mut();
        if idle.len() < self.capacity {
            idle.push(chunk);
            self.recycled.set(self.recycled.get() + 1);
            trace!(idle = idle.len(), "chunk recycled");
        } else {
            drop(idle);
            self.dispose_one(chunk);
        }
        Ok(())
    }

    fn dispose_one(&self, chunk: ChunkBuffer) {
        self.disposed.set(self.disposed.get() + 1);
        trace!(capacity = chunk.capacity(), "chunk disposed");
        drop(chunk);
    }
}

/// A cache of idle chunks of one fixed size.
///
/// The pool is a cheap handle; clones share the same idle list. Chunks carry
/// no synchronization, so a pool (and every chunk it lends) stays on the
/// thread that created it. Use one pool per thread, e.g. via
/// [`ChunkPool::thread_default`].
///
/// # Example
///
/// ```
/// use chunkio::{ChunkPool, PoolConfig};
///
/// let pool = ChunkPool::new(PoolConfig::new(64, 2)?)?;
/// let chunk = pool.borrow()?;
/// assert_eq!(chunk.capacity(), 64);
///
/// chunk.release()?;
/// assert_eq!(pool.idle_count(), 1);
/// # Ok::<(), chunkio::ChunkError>(())
/// ```
#[derive(Clone)]
pub struct ChunkPool {
    inner: Rc<PoolInner>,
}

impl ChunkPool {
    /// Creates a bounded pool.
    pub fn new(config: PoolConfig) -> Result<Self, ChunkError> {
        config.validate()?;
        Ok(Self::bounded(config))
    }

    fn bounded(config: PoolConfig) -> Self {
        debug!(
            chunk_size = config.chunk_size(),
            capacity = config.capacity(),
            "creating chunk pool"
        );
        Self {
            inner: Rc::new(PoolInner::new(
                PoolKind::Bounded,
                config.chunk_size(),
                config.capacity(),
            )),
        }
    }

    /// Creates a pool that never caches: every borrow allocates and every
    /// release frees.
    pub fn no_pool(chunk_size: usize) -> Result<Self, ChunkError> {
        let config = PoolConfig::new(chunk_size, 0)?;
        Ok(Self {
            inner: Rc::new(PoolInner::new(PoolKind::NoPool, config.chunk_size(), 0)),
        })
    }

    /// Creates a pool lending out exactly one chunk over `memory`.
    ///
    /// Borrowing again before the chunk came back fails with `IllegalState`.
    pub fn single_instance(memory: impl Memory) -> Self {
        let chunk_size = memory.len();
        let inner = Rc::new(PoolInner::new(PoolKind::Single, chunk_size, 1));
        let block = Block::new(Box::new(memory), Some(Rc::downgrade(&inner)));
        inner.idle.borrow_mut().push(ChunkBuffer::idle(block));
        Self { inner }
    }

    /// Returns this thread's shared default pool.
    pub fn thread_default() -> Self {
        THREAD_CHUNK_POOL.with(Clone::clone)
    }

    /// Lends out an idle chunk, producing a new one if none is cached.
    ///
    /// The returned chunk is empty, writable over its whole capacity and has
    /// a reference count of one.
    pub fn borrow(&self) -> Result<ChunkBuffer, ChunkError> {
        let cached = self.inner.idle.borrow_mut().pop();
        let mut chunk = match cached {
            Some(chunk) => chunk,
            None if self.inner.kind == PoolKind::Single => {
                return Err(ChunkError::IllegalState {
                    message: "single-instance pool is already lent out",
                });
            }
            None => self.produce(),
        };
        chunk.acquire()?;
        Ok(chunk)
    }

    fn produce(&self) -> ChunkBuffer {
        let link = Some(Rc::downgrade(&self.inner));
        self.inner.produced.set(self.inner.produced.get() + 1);
        trace!(chunk_size = self.inner.chunk_size, "producing chunk");
        ChunkBuffer::idle(Block::new(heap(self.inner.chunk_size), link))
    }

    /// Takes `chunk` back into the pool.
    ///
    /// Fails with `IllegalState` if the chunk is a view, is still referenced,
    /// or has a different size than this pool produces. Chunks handed out by
    /// [`ChunkPool::borrow`] are returned with [`ChunkBuffer::release`]; this
    /// entry point only accepts chunks whose last reference is already gone.
    pub fn recycle(&self, chunk: ChunkBuffer) -> Result<(), ChunkError> {
        self.inner.recycle(chunk)
    }

    /// Drops every idle chunk.
    pub fn dispose(&self) {
        let idle = std::mem::take(&mut *self.inner.idle.borrow_mut());
        let count = idle.len();
        self.inner.disposed.set(self.inner.disposed.get() + count);
        debug!(count, "disposing idle chunks");
        drop(idle);
    }

    /// Size of the chunks this pool produces.
    pub fn chunk_size(&self) -> usize {
        self.inner.chunk_size
    }

    /// Maximum number of idle chunks retained.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Number of chunks currently idle.
    pub fn idle_count(&self) -> usize {
        self.inner.idle.borrow().len()
    }

    /// Returns a snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            produced: self.inner.produced.get(),
            recycled: self.inner.recycled.get(),
            disposed: self.inner.disposed.get(),
            idle: self.idle_count(),
        }
    }
}

impl Default for ChunkPool {
    fn default() -> Self {
        Self::bounded(PoolConfig::default())
    }
}

impl fmt::Debug for ChunkPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkPool")
            .field("kind", &self.inner.kind)
            .field("chunk_size", &self.inner.chunk_size)
            .field("capacity", &self.inner.capacity)
            .field("idle", &self.idle_count())
            .finish()
    }
}

// Thread-local default pool
thread_local! {
    static THREAD_CHUNK_POOL: ChunkPool = ChunkPool::default();
}
