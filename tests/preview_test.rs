// Integration tests for non-destructive preview
// Tests cover: position restore, nesting, replay after prefetch, chunk reclamation

use chunkio::{BytePacketBuilder, BytesSource, ChunkPool, Input, PoolConfig};
use proptest::prelude::*;

fn pool(chunk_size: usize) -> ChunkPool {
    ChunkPool::new(PoolConfig::new(chunk_size, 64).unwrap()).unwrap()
}

fn input(chunk_size: usize, data: &[u8]) -> Input<BytesSource> {
    Input::new(pool(chunk_size), BytesSource::new(data.to_vec()))
}

// ============================================================================
// Restore Semantics
// ============================================================================

#[test]
fn test_preview_before_first_read() {
    let mut input = input(3, b"abcdefgh");
    let peeked = input.preview(|input| input.read_utf8_string(5)).unwrap();
    assert_eq!(peeked, "abcde");
    assert_eq!(input.read_to_vec().unwrap(), b"abcdefgh");
}

#[test]
fn test_preview_to_end_of_stream() {
    let mut input = input(2, &[1, 2, 3]);
    assert_eq!(input.read_u8().unwrap(), 1);

    let all = input.preview(|input| input.read_to_vec()).unwrap();
    assert_eq!(all, vec![2, 3]);
    assert!(!input.eof().unwrap(), "the preview consumed nothing");
    assert_eq!(input.read_u16().unwrap(), 0x0203);
}

#[test]
fn test_failed_read_inside_preview_consumes_nothing() {
    let mut input = input(2, &[1, 2, 3]);
    let result = input.preview(|input| input.read_u64());
    assert!(result.unwrap_err().is_end_of_input());
    assert_eq!(input.read_to_vec().unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_consecutive_previews() {
    let mut input = input(1, &[10, 20, 30, 40]);
    for _ in 0..3 {
        assert_eq!(input.preview(|input| input.read_u16()).unwrap(), 0x0A14);
    }
    input.discard(1).unwrap();
    assert_eq!(input.preview(|input| input.read_u8()).unwrap(), 20);
    assert!(input.read_u32().unwrap_err().is_end_of_input());
}

// ============================================================================
// Nesting
// ============================================================================

#[test]
fn test_nested_previews_keep_their_own_marks() {
    let data: Vec<u8> = (0..12).collect();
    let mut input = input(2, &data);
    input.discard(1).unwrap();

    let (outer_first, inner, outer_after_inner) = input.preview(|outer| {
        let outer_first = outer.read_u8().unwrap();
        outer.discard(2).unwrap();
        let inner = outer.preview(|inner| {
            inner.discard(3).unwrap();
            inner.read_u8().unwrap()
        });
        let outer_after_inner = outer.read_u8().unwrap();
        (outer_first, inner, outer_after_inner)
    });

    assert_eq!(outer_first, 1);
    assert_eq!(inner, 7);
    assert_eq!(outer_after_inner, 4, "inner rewind returns to the outer position");
    assert_eq!(input.read_u8().unwrap(), 1, "outer rewind returns to the start");
}

#[test]
fn test_peek_inside_preview() {
    let mut input = input(1, b"xy");
    let pair = input.preview(|input| {
        let peeked = input.peek_u8().unwrap();
        let read = input.read_u8().unwrap();
        (peeked, read, input.peek_u8().unwrap())
    });
    assert_eq!(pair, (Some(b'x'), b'x', Some(b'y')));
    assert_eq!(input.read_u8().unwrap(), b'x');
}

// ============================================================================
// Interaction With Prefetch And Packets
// ============================================================================

#[test]
fn test_prefetch_inside_preview() {
    let data: Vec<u8> = (0..9).collect();
    let mut input = input(2, &data);
    input.preview(|input| {
        assert!(input.prefetch(7).unwrap());
        input.discard(6).unwrap();
        assert_eq!(input.buffered(), 2);
    });
    assert_eq!(input.buffered(), 8);
    assert_eq!(input.read_to_vec().unwrap(), data);
}

#[test]
fn test_preview_on_packet() {
    let mut builder = BytePacketBuilder::with_pool(pool(3));
    builder.write_fully(b"HDR:body", 0, 8).unwrap();
    let mut packet = builder.build().unwrap();

    let header = packet.preview(|packet| packet.read_utf8_string(4)).unwrap();
    assert_eq!(header, "HDR:");
    assert_eq!(packet.remaining(), 8);
    packet.discard(4).unwrap();
    assert_eq!(packet.read_utf8_string(4).unwrap(), "body");
}

// ============================================================================
// Chunk Reclamation
// ============================================================================

#[test]
fn test_history_released_once_consumed() {
    let pool = pool(2);
    let mut input = Input::new(pool.clone(), BytesSource::new(vec![7u8; 20]));
    input.preview(|input| input.discard(19)).unwrap();
    assert_eq!(pool.idle_count(), 0, "the replay log keeps all previewed chunks");

    input.discard(19).unwrap();
    assert!(
        pool.idle_count() >= 8,
        "chunks read past are returned while reading, idle={}",
        pool.idle_count()
    );
    assert_eq!(input.read_u8().unwrap(), 7);
    input.close().unwrap();
    assert_eq!(pool.idle_count(), pool.stats().produced);
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #[test]
    fn prop_preview_is_idempotent(
        data in proptest::collection::vec(any::<u8>(), 0..120),
        chunk_size in 1usize..8,
        skip in 0usize..40,
        look in 0usize..80,
    ) {
        let mut input = input(chunk_size, &data);
        let skip = skip.min(data.len());
        input.discard(skip).unwrap();

        let before = input.buffered();
        let mut seen = vec![0u8; look];
        let got = input.preview(|input| input.read_available(&mut seen, 0, look)).unwrap();
        prop_assert_eq!(got, look.min(data.len() - skip));
        prop_assert_eq!(&seen[..got], &data[skip..skip + got]);
        prop_assert!(input.buffered() >= before);

        prop_assert_eq!(input.read_to_vec().unwrap(), data[skip..].to_vec());
    }

    #[test]
    fn prop_nested_preview_restores_outer_mark(
        data in proptest::collection::vec(any::<u8>(), 1..80),
        chunk_size in 1usize..6,
        outer in 0usize..40,
        inner in 0usize..40,
    ) {
        let mut input = input(chunk_size, &data);
        let outer = outer.min(data.len());
        let inner = inner.min(data.len() - outer);

        let resumed = input.preview(|input| {
            input.discard(outer).unwrap();
            input.preview(|input| input.discard(inner)).unwrap();
            input.read_to_vec().unwrap()
        });
        prop_assert_eq!(resumed, data[outer..].to_vec());
        prop_assert_eq!(input.read_to_vec().unwrap(), data);
    }
}
