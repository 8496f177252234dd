#![no_main]

use libfuzzer_sys::fuzz_target;
use chunkio::{BytesSource, ChunkPool, Input, PoolConfig};

fuzz_target!(|input: (Vec<u8>, Vec<u8>)| {
    let (data, script) = input;
    if script.is_empty() {
        return;
    }

    // The first script byte picks the chunk size, the rest drive the reads
    let chunk_size = usize::from(script[0] % 8) + 1;
    let pool = ChunkPool::new(PoolConfig::new(chunk_size, 64).unwrap()).unwrap();
    let source = BytesSource::new(data.clone()).with_fill_limit(chunk_size + 1);
    let mut reader = Input::new(pool, source);

    let mut consumed = 0usize;
    for &op in &script[1..] {
        let amount = usize::from(op >> 2);
        match op & 3 {
            0 => {
                // Verify: a preview sees the upcoming bytes and restores the position
                let seen = reader.preview(|r| {
                    let mut buf = vec![0u8; amount];
                    let n = r.read_available(&mut buf, 0, amount).unwrap();
                    buf.truncate(n);
                    buf
                });
                let end = (consumed + amount).min(data.len());
                assert_eq!(seen, &data[consumed..end]);
            }
            1 => {
                let ok = reader.discard(amount).is_ok();
                assert_eq!(ok, consumed + amount <= data.len());
                consumed = (consumed + amount).min(data.len());
            }
            2 => {
                let ready = reader.prefetch(amount).unwrap();
                assert_eq!(ready, consumed + amount <= data.len());
            }
            _ => match reader.read_u8() {
                Ok(byte) => {
                    assert_eq!(byte, data[consumed]);
                    consumed += 1;
                }
                Err(e) => {
                    assert!(e.is_end_of_input());
                    assert_eq!(consumed, data.len());
                }
            },
        }
    }

    assert_eq!(reader.read_to_vec().unwrap(), &data[consumed..]);
});
