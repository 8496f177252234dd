//! Chunk memory management.
//!
//! - [`Memory`] - Backend trait for the bytes under a chunk
//! - [`ChunkBuffer`] - Reference-counted chunk with read/write cursors and views
//! - [`ChunkPool`] - Bounded cache of idle chunks (one per thread)

mod chunk;
mod memory;
mod pool;

pub use chunk::ChunkBuffer;
pub use memory::Memory;
pub use pool::{ChunkPool, PoolStats};
