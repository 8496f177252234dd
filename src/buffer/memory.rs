//! Memory backends that can sit underneath a chunk.

use bytes::BytesMut;

/// A contiguous, fixed-length block of bytes owned by a chunk.
///
/// Everything above the chunk (pool, input, output) only ever touches
/// memory through this trait, so adding a backend never touches the
/// buffering logic.
pub trait Memory: 'static {
    /// Returns the whole block.
    fn as_slice(&self) -> &[u8];

    /// Returns the whole block, mutably.
    fn as_mut_slice(&mut self) -> &mut [u8];

    /// Returns the block length.
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Returns true if the block is zero-length.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Memory for Box<[u8]> {
    fn as_slice(&self) -> &[u8] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        self
    }
}

impl Memory for Vec<u8> {
    fn as_slice(&self) -> &[u8] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        self
    }
}

impl Memory for BytesMut {
    fn as_slice(&self) -> &[u8] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        self
    }
}

/// Allocates a zeroed heap block for pool-produced chunks.
pub(crate) fn heap(size: usize) -> Box<dyn Memory> {
    Box::new(vec![0u8; size].into_boxed_slice())
}
