//! Configuration for chunk pools.
//!
//! - [`PoolConfig`] - Chunk size and idle-chunk capacity of a [`ChunkPool`](crate::ChunkPool)
//!
//! # Example
//!
//! ```
//! use chunkio::PoolConfig;
//!
//! // Custom sizes
//! let config = PoolConfig::new(8192, 32)?;
//!
//! // Builder pattern
//! let config = PoolConfig::default().with_chunk_size(16).with_capacity(4);
//! assert!(config.validate().is_ok());
//! # Ok::<(), chunkio::ChunkError>(())
//! ```

use crate::error::ChunkError;

/// Default chunk size (4 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024;

/// Default number of idle chunks a pool keeps around.
pub const DEFAULT_POOL_CAPACITY: usize = 128;

/// Smallest legal chunk size. Tiny chunks are useful to exercise cross-chunk paths.
pub const MIN_CHUNK_SIZE: usize = 1;

/// Configuration for a bounded chunk pool.
///
/// - `chunk_size`: capacity of every chunk the pool produces
/// - `capacity`: maximum number of idle chunks retained; extra recycled
///   chunks are disposed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolConfig {
    chunk_size: usize,
    capacity: usize,
}

impl PoolConfig {
    /// Creates a new configuration.
    ///
    /// Returns error if the chunk size is below [`MIN_CHUNK_SIZE`].
    /// A capacity of zero is allowed and means "never retain".
    pub fn new(chunk_size: usize, capacity: usize) -> Result<Self, ChunkError> {
        if chunk_size < MIN_CHUNK_SIZE {
            return Err(ChunkError::InvalidConfig {
                message: "chunk_size must be non-zero",
            });
        }

        Ok(Self {
            chunk_size,
            capacity,
        })
    }

    /// Sets the chunk size.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Sets the idle capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Returns the chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns the idle capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Validates the current configuration.
    pub fn validate(&self) -> Result<(), ChunkError> {
        Self::new(self.chunk_size, self.capacity).map(|_| ())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}
