//! Ordered chains of filled chunks.
//!
//! A [`ChunkChain`] records `(chunk, valid length)` pairs. Inputs use it as
//! the replay log behind `preview`, and the packet builder uses it to hold
//! sealed chunks.

use std::collections::VecDeque;

use crate::buffer::ChunkBuffer;
use crate::error::ChunkError;

/// Append-only, discard-from-front sequence of chunks with their valid lengths.
///
/// The valid bytes of an entry start at the chunk's read position. Indices
/// are logical: index 0 is always the current head.
///
/// # Example
///
/// ```
/// use chunkio::{ChunkBuffer, ChunkChain};
///
/// let mut chain = ChunkChain::new();
/// chain.append(ChunkBuffer::wrap(vec![1, 2, 3]), 3)?;
/// chain.append(ChunkBuffer::wrap(vec![4, 5]), 2)?;
/// assert_eq!(chain.size(0), 5);
/// assert_eq!(chain.size(1), 2);
///
/// chain.discard_first()?;
/// assert_eq!(chain.len(), 1);
/// # Ok::<(), chunkio::ChunkError>(())
/// ```
#[derive(Debug, Default)]
pub struct ChunkChain {
    entries: VecDeque<(ChunkBuffer, usize)>,
}

impl ChunkChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `chunk` with `valid_length` payload bytes.
    ///
    /// Fails if `valid_length` exceeds the chunk's readable bytes.
    pub fn append(&mut self, chunk: ChunkBuffer, valid_length: usize) -> Result<(), ChunkError> {
        if valid_length > chunk.read_remaining() {
            return Err(ChunkError::IllegalArgument {
                message: "valid length exceeds the chunk's filled bytes",
            });
        }
        self.entries.push_back((chunk, valid_length));
        Ok(())
    }

    /// Releases the oldest chunk and advances the head.
    pub fn discard_first(&mut self) -> Result<(), ChunkError> {
        match self.entries.pop_front() {
            Some((chunk, _)) => chunk.release(),
            None => Err(ChunkError::EmptyChain),
        }
    }

    /// Looks up the entry at `index` and hands it to `consumer`.
    pub fn pointed<R>(
        &self,
        index: usize,
        consumer: impl FnOnce(&ChunkBuffer, usize) -> R,
    ) -> Option<R> {
        self.entries
            .get(index)
            .map(|(chunk, length)| consumer(chunk, *length))
    }

    /// Returns the entry at `index`.
    pub fn get(&self, index: usize) -> Option<(&ChunkBuffer, usize)> {
        self.entries.get(index).map(|(chunk, length)| (chunk, *length))
    }

    /// Mutable access to the head entry.
    pub(crate) fn first_mut(&mut self) -> Option<(&mut ChunkBuffer, &mut usize)> {
        self.entries
            .front_mut()
            .map(|(chunk, length)| (chunk, length))
    }

    /// Returns true if `index` is past the last entry.
    pub fn is_after_last(&self, index: usize) -> bool {
        index >= self.entries.len()
    }

    /// Returns true if the chain holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of chunks in the chain.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Sum of the valid lengths from `from_index` to the tail.
    pub fn size(&self, from_index: usize) -> usize {
        self.entries
            .iter()
            .skip(from_index)
            .map(|(_, length)| length)
            .sum()
    }

    /// Sum of all valid lengths.
    pub fn total_size(&self) -> usize {
        self.size(0)
    }

    /// Iterates over `(chunk, valid length)` pairs from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = (&ChunkBuffer, usize)> {
        self.entries.iter().map(|(chunk, length)| (chunk, *length))
    }

    /// Releases every chunk.
    pub fn clear(&mut self) -> Result<(), ChunkError> {
        while !self.entries.is_empty() {
            self.discard_first()?;
        }
        Ok(())
    }

    /// Copies every valid byte into a new vector.
    pub fn to_vec(&self) -> Result<Vec<u8>, ChunkError> {
        let mut out = vec![0u8; self.total_size()];
        let mut offset = 0;
        for (chunk, length) in self.iter() {
            chunk.copy_to_slice(&mut out, chunk.read_position(), length, offset)?;
            offset += length;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ChunkPool;
    use crate::config::PoolConfig;

    #[test]
    fn test_discard_first_on_empty() {
        let mut chain = ChunkChain::new();
        assert!(matches!(chain.discard_first(), Err(ChunkError::EmptyChain)));
    }

    #[test]
    fn test_append_rejects_overlong_length() {
        let mut chain = ChunkChain::new();
        let err = chain.append(ChunkBuffer::wrap(vec![1, 2]), 3).unwrap_err();
        assert!(matches!(err, ChunkError::IllegalArgument { .. }));
        assert!(chain.is_empty());
    }

    #[test]
    fn test_pointed_and_indices() {
        let mut chain = ChunkChain::new();
        chain.append(ChunkBuffer::wrap(vec![1, 2, 3]), 2).unwrap();
        chain.append(ChunkBuffer::wrap(vec![4]), 1).unwrap();

        let first = chain.pointed(0, |chunk, length| (chunk.load_u8_at(0).unwrap(), length));
        assert_eq!(first, Some((1, 2)));
        assert!(chain.pointed(2, |_, length| length).is_none());

        assert!(!chain.is_after_last(1));
        assert!(chain.is_after_last(2));
        assert_eq!(chain.size(0), 3);
        assert_eq!(chain.size(5), 0);
    }

    #[test]
    fn test_discard_releases_to_pool() {
        let pool = ChunkPool::new(PoolConfig::new(4, 4).unwrap()).unwrap();
        let mut chain = ChunkChain::new();
        for _ in 0..3 {
            let mut chunk = pool.borrow().unwrap();
            chunk.commit_written(4).unwrap();
            chain.append(chunk, 4).unwrap();
        }
        assert_eq!(pool.idle_count(), 0);

        chain.discard_first().unwrap();
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(chain.len(), 2);

        chain.clear().unwrap();
        assert_eq!(pool.idle_count(), 3);
    }

    #[test]
    fn test_to_vec_honours_valid_length() {
        let mut chain = ChunkChain::new();
        let mut chunk = ChunkBuffer::wrap(vec![9, 1, 2, 3]);
        chunk.discard_exact(1).unwrap();
        chain.append(chunk, 2).unwrap();
        chain.append(ChunkBuffer::wrap(vec![7, 8]), 2).unwrap();
        assert_eq!(chain.to_vec().unwrap(), vec![1, 2, 7, 8]);
    }
}
