//! Length-prefixed packet example.
//!
//! Builds a packet whose 4-byte length header is written after the payload,
//! then parses it back without copying the chunks.
//!
//! Run with:
//!     cargo run --example packet_roundtrip

use chunkio::{BytePacketBuilder, ChunkPool, PoolConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Small chunks so the payload spans several of them
    let pool = ChunkPool::new(PoolConfig::new(16, 32)?)?;

    let mut builder = BytePacketBuilder::with_pool(pool.clone());
    builder.reserve_start_gap(4)?;
    builder.write_u16(0x0001)?; // version
    builder.write_u64(1_700_000_000)?; // timestamp
    builder.write_utf8_str("hello from a chunked packet\n")?;
    builder.write_f64(98.6)?;

    let length = builder.size() as u32;
    builder.fill_start_gap(&length.to_be_bytes())?;
    println!("Built packet: {} payload bytes", length);

    let mut packet = builder.build()?;
    let declared = packet.read_u32()?;
    println!("Header says {} bytes, {} remaining", declared, packet.remaining());

    let version = packet.read_u16()?;
    let timestamp = packet.read_u64()?;
    let greeting = packet.read_utf8_line()?.unwrap_or_default();
    let reading = packet.read_f64()?;

    println!("version={version} timestamp={timestamp}");
    println!("greeting={greeting:?} reading={reading}");
    assert!(packet.eof()?);

    drop(packet);
    let stats = pool.stats();
    println!(
        "\nPool: produced={}, recycled={}, idle={}",
        stats.produced, stats.recycled, stats.idle
    );

    Ok(())
}
