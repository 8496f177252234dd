//! In-memory packet building.

use bytes::Bytes;

use super::writer::Output;
use crate::buffer::ChunkPool;
use crate::chain::ChunkChain;
use crate::error::ChunkError;
use crate::input::{ByteReadPacket, Input};

/// An [`Output`] that seals its chunks into a [`ChunkChain`].
///
/// The finished packet is read back with [`build`](Output::build) without
/// copying, or flattened with [`into_bytes`](Output::into_bytes).
///
/// # Example
///
/// ```
/// use chunkio::BytePacketBuilder;
///
/// let mut builder = BytePacketBuilder::default();
/// builder.reserve_start_gap(2)?;
/// builder.write_fully(b"payload", 0, 7)?;
/// let length = builder.size() as u16;
/// builder.fill_start_gap(&length.to_be_bytes())?;
///
/// let mut packet = builder.build()?;
/// assert_eq!(packet.read_u16()?, 7);
/// assert_eq!(packet.read_to_vec()?, b"payload");
/// # Ok::<(), chunkio::ChunkError>(())
/// ```
pub type BytePacketBuilder = Output<ChunkChain>;

impl Output<ChunkChain> {
    /// Creates a builder with chunks from `pool`.
    pub fn with_pool(pool: ChunkPool) -> Self {
        Output::new(pool, ChunkChain::new())
    }

    /// Writes `header` into the start gap reserved in front of the first chunk.
    ///
    /// The header ends directly where the payload begins.
    pub fn fill_start_gap(&mut self, header: &[u8]) -> Result<(), ChunkError> {
        self.ensure_open()?;
        if let Some((first, length)) = self.sink.first_mut() {
            first.prepend(header)?;
            *length += header.len();
            self.flushed += header.len();
            return Ok(());
        }

        if self.chunk.capacity() == 0 {
            return Err(ChunkError::IllegalState {
                message: "no start gap was reserved",
            });
        }
        self.chunk.commit_written_until(self.position)?;
        self.chunk.prepend(header)
    }

    /// Finishes the packet and returns a reader over it.
    pub fn build(mut self) -> Result<ByteReadPacket, ChunkError> {
        self.ensure_open()?;
        self.seal()?;
        self.closed = true;
        let chain = std::mem::take(&mut self.sink);
        Ok(Input::from_chain(self.pool.clone(), chain))
    }

    /// Finishes the packet and copies it into one contiguous buffer.
    pub fn into_bytes(mut self) -> Result<Bytes, ChunkError> {
        self.ensure_open()?;
        self.seal()?;
        self.closed = true;
        let mut chain = std::mem::take(&mut self.sink);
        let bytes = chain.to_vec()?;
        chain.clear()?;
        Ok(Bytes::from(bytes))
    }
}

impl Default for Output<ChunkChain> {
    fn default() -> Self {
        Self::with_pool(ChunkPool::thread_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;

    fn pool(chunk_size: usize) -> ChunkPool {
        ChunkPool::new(PoolConfig::new(chunk_size, 16).unwrap()).unwrap()
    }

    #[test]
    fn test_build_reads_back() {
        let mut builder = BytePacketBuilder::with_pool(pool(3));
        builder.write_u32(0x0102_0304).unwrap();
        builder.write_u8(5).unwrap();
        assert_eq!(builder.size(), 5);

        let mut packet = builder.build().unwrap();
        assert_eq!(packet.remaining(), 5);
        assert_eq!(packet.read_u32().unwrap(), 0x0102_0304);
        assert_eq!(packet.read_u8().unwrap(), 5);
        assert!(packet.eof().unwrap());
    }

    #[test]
    fn test_fill_start_gap_on_sealed_chunk() {
        let mut builder = BytePacketBuilder::with_pool(pool(4));
        builder.reserve_start_gap(1).unwrap();
        builder.write_fully(b"abcdef", 0, 6).unwrap();
        builder.fill_start_gap(&[6]).unwrap();
        assert_eq!(builder.size(), 7);
        assert_eq!(&builder.into_bytes().unwrap()[..], b"\x06abcdef");
    }

    #[test]
    fn test_fill_start_gap_too_large() {
        let mut builder = BytePacketBuilder::with_pool(pool(8));
        builder.reserve_start_gap(1).unwrap();
        builder.write_u8(1).unwrap();
        assert!(builder.fill_start_gap(&[0, 0]).unwrap_err().is_illegal_state());
    }

    #[test]
    fn test_chunks_return_to_pool() {
        let pool = pool(2);
        let mut builder = BytePacketBuilder::with_pool(pool.clone());
        builder.write_fully(b"abcdef", 0, 6).unwrap();
        let mut packet = builder.build().unwrap();
        assert_eq!(packet.read_to_vec().unwrap(), b"abcdef");
        drop(packet);
        assert_eq!(pool.idle_count(), 3);
    }
}
