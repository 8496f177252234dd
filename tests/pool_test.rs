// Integration tests for chunk pooling and reference counting
// Tests cover: borrow/release discipline, capacity bounds, views, pool kinds, chains

use bytes::BytesMut;
use chunkio::{ChunkBuffer, ChunkChain, ChunkError, ChunkPool, PoolConfig};
use proptest::prelude::*;

fn pool(chunk_size: usize, capacity: usize) -> ChunkPool {
    ChunkPool::new(PoolConfig::new(chunk_size, capacity).unwrap()).unwrap()
}

// ============================================================================
// Borrow And Release
// ============================================================================

#[test]
fn test_borrowed_chunk_is_fresh() {
    let pool = pool(16, 4);
    let mut chunk = pool.borrow().unwrap();
    assert_eq!(chunk.ref_count(), 1);
    assert_eq!(chunk.capacity(), 16);
    assert_eq!(chunk.write_remaining(), 16);

    chunk.store_u32_at(0, 0xFFFF_FFFF).unwrap();
    chunk.commit_written(4).unwrap();
    chunk.reserve_end_gap(2).unwrap();
    chunk.release().unwrap();

    let again = pool.borrow().unwrap();
    assert_eq!(again.read_remaining(), 0, "recycled chunks come back empty");
    assert_eq!(again.write_remaining(), 16, "gaps are cleared on recycle");
    assert_eq!(pool.stats().produced, 1);
}

#[test]
fn test_capacity_bounds_idle_list() {
    let pool = pool(8, 2);
    let chunks: Vec<ChunkBuffer> = (0..5).map(|_| pool.borrow().unwrap()).collect();
    for chunk in chunks {
        chunk.release().unwrap();
    }
    let stats = pool.stats();
    assert_eq!(stats.produced, 5);
    assert_eq!(stats.idle, 2);
    assert_eq!(stats.disposed, 3);
}

#[test]
fn test_dropping_a_chunk_releases_it() {
    let pool = pool(8, 2);
    {
        let _chunk = pool.borrow().unwrap();
    }
    assert_eq!(pool.idle_count(), 1);
}

#[test]
fn test_recycle_rejects_live_and_foreign_chunks() {
    let pool = pool(8, 2);
    let live = pool.borrow().unwrap();
    assert!(pool.recycle(live.duplicate()).unwrap_err().is_illegal_state());

    let foreign = ChunkBuffer::wrap(vec![0u8; 8]);
    assert!(pool.recycle(foreign).unwrap_err().is_illegal_state());
    drop(live);
    assert_eq!(pool.idle_count(), 1);
}

#[test]
fn test_dispose_drops_idle_chunks() {
    let pool = pool(8, 4);
    pool.borrow().unwrap().release().unwrap();
    pool.borrow().unwrap().release().unwrap();
    assert_eq!(pool.idle_count(), 1);
    pool.dispose();
    assert_eq!(pool.idle_count(), 0);
    assert_eq!(pool.stats().disposed, 1);
}

// ============================================================================
// Views
// ============================================================================

#[test]
fn test_view_release_keeps_origin() {
    let pool = pool(8, 2);
    let mut origin = pool.borrow().unwrap();
    origin.store_u8_at(0, 42).unwrap();
    origin.commit_written(1).unwrap();

    let view = origin.duplicate();
    assert!(view.is_view());
    assert!(view.shares_memory_with(&origin));
    assert_eq!(origin.ref_count(), 2);

    view.release().unwrap();
    assert_eq!(origin.ref_count(), 1);
    assert_eq!(pool.idle_count(), 0, "origin is still referenced");
    assert_eq!(origin.load_u8_at(0).unwrap(), 42);

    origin.release().unwrap();
    assert_eq!(pool.idle_count(), 1);
}

#[test]
fn test_origin_released_before_view() {
    let pool = pool(8, 2);
    let origin = pool.borrow().unwrap();
    let view = origin.duplicate();
    origin.release().unwrap();
    assert_eq!(pool.idle_count(), 0);
    assert_eq!(view.ref_count(), 1);
    view.release().unwrap();
    assert_eq!(pool.idle_count(), 1, "the last handle returns the memory");
}

#[test]
fn test_views_have_independent_cursors() {
    let origin = ChunkBuffer::wrap(b"abcdef".to_vec());
    let mut view = origin.duplicate();
    view.discard_exact(4).unwrap();
    assert_eq!(view.readable_to_vec(), b"ef");
    assert_eq!(origin.readable_to_vec(), b"abcdef");
}

// ============================================================================
// Pool Kinds
// ============================================================================

#[test]
fn test_no_pool_never_caches() {
    let pool = ChunkPool::no_pool(8).unwrap();
    pool.borrow().unwrap().release().unwrap();
    pool.borrow().unwrap().release().unwrap();
    let stats = pool.stats();
    assert_eq!(stats.idle, 0);
    assert_eq!(stats.produced, 2);
    assert_eq!(stats.recycled, 0);
    assert_eq!(stats.disposed, 2);
}

#[test]
fn test_single_instance_lends_once() {
    let pool = ChunkPool::single_instance(BytesMut::zeroed(4));
    let chunk = pool.borrow().unwrap();
    assert_eq!(chunk.capacity(), 4);
    assert!(pool.borrow().unwrap_err().is_illegal_state());

    chunk.release().unwrap();
    let again = pool.borrow().unwrap();
    assert_eq!(again.capacity(), 4);
}

#[test]
fn test_wrapped_memory_is_never_pooled() {
    let pool = pool(4, 4);
    let chunk = ChunkBuffer::wrap(vec![1u8, 2, 3, 4]);
    chunk.release().unwrap();
    assert_eq!(pool.idle_count(), 0);
}

#[test]
fn test_invalid_config() {
    assert!(matches!(
        PoolConfig::new(0, 4),
        Err(ChunkError::InvalidConfig { .. })
    ));
    assert!(ChunkPool::no_pool(0).is_err());
}

// ============================================================================
// Chains
// ============================================================================

#[test]
fn test_discard_first_on_empty_chain() {
    let mut chain = ChunkChain::new();
    assert!(matches!(chain.discard_first(), Err(ChunkError::EmptyChain)));
}

#[test]
fn test_chain_release_returns_chunks() {
    let pool = pool(4, 8);
    let mut chain = ChunkChain::new();
    for _ in 0..3 {
        let mut chunk = pool.borrow().unwrap();
        chunk.store_u16_at(0, 0x0102).unwrap();
        chunk.commit_written(2).unwrap();
        chain.append(chunk, 2).unwrap();
    }
    assert_eq!(chain.total_size(), 6);
    drop(chain);
    assert_eq!(pool.idle_count(), 3);
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #[test]
    fn prop_idle_never_exceeds_capacity(
        ops in proptest::collection::vec(any::<bool>(), 0..200),
        capacity in 0usize..6,
    ) {
        let pool = pool(8, capacity);
        let mut held = Vec::new();
        for borrow in ops {
            if borrow || held.is_empty() {
                let chunk = pool.borrow().unwrap();
                prop_assert_eq!(chunk.ref_count(), 1);
                held.push(chunk);
            } else if let Some(chunk) = held.pop() {
                chunk.release().unwrap();
            }
            prop_assert!(pool.idle_count() <= capacity);
        }
    }

    #[test]
    fn prop_views_release_exactly_once(views in 0usize..8) {
        let pool = pool(8, 2);
        let origin = pool.borrow().unwrap();
        let duplicates: Vec<ChunkBuffer> = (0..views).map(|_| origin.duplicate()).collect();
        prop_assert_eq!(origin.ref_count(), views + 1);

        origin.release().unwrap();
        for view in duplicates {
            prop_assert_eq!(pool.idle_count(), 0);
            view.release().unwrap();
        }
        prop_assert_eq!(pool.idle_count(), 1);
    }
}
