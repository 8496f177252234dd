#![no_main]

use libfuzzer_sys::fuzz_target;
use chunkio::{BytePacketBuilder, BytesSource, ChunkPool, Input, PoolConfig};

fuzz_target!(|data: Vec<u8>| {
    // Tiny chunks force every cross-boundary path
    for chunk_size in [1, 3, 7, 4096] {
        let pool = ChunkPool::new(PoolConfig::new(chunk_size, 8).unwrap()).unwrap();

        // Verify: bytes written are the bytes read back
        let mut builder = BytePacketBuilder::with_pool(pool.clone());
        builder.write_fully(&data, 0, data.len()).unwrap();
        assert_eq!(builder.size(), data.len());
        let mut packet = builder.build().unwrap();
        assert_eq!(packet.read_to_vec().unwrap(), data);

        // Verify: u32 reads agree with std decoding
        let mut input = Input::new(pool.clone(), BytesSource::new(data.clone()));
        for word in data.chunks_exact(4) {
            let expected = u32::from_be_bytes([word[0], word[1], word[2], word[3]]);
            assert_eq!(input.read_u32().unwrap(), expected);
        }
        assert_eq!(input.read_to_vec().unwrap(), data.chunks_exact(4).remainder());

        // Verify: text lines never panic, only fail cleanly
        let mut text = Input::new(pool.clone(), BytesSource::new(data.clone()));
        while let Ok(Some(_)) = text.read_utf8_line() {}

        drop(packet);
        drop(input);
        drop(text);
        assert_eq!(pool.idle_count(), pool.stats().produced.min(8));
    }
});
