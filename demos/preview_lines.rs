//! Preview-driven parsing example.
//!
//! Reads a line-oriented stream in which some records carry a binary
//! trailer. `preview` peeks at each record's tag without consuming it.
//!
//! Run with:
//!     cargo run --example preview_lines

use std::io::Cursor;

use chunkio::{ChunkPool, Input, PoolConfig, ReaderSource};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut data = Vec::new();
    data.extend_from_slice(b"TXT first line\r\n");
    data.extend_from_slice(b"BIN ");
    data.extend_from_slice(&0xDEAD_BEEFu32.to_be_bytes());
    data.extend_from_slice(b"TXT second line\nTXT last line");

    // Seven-byte chunks: tags, lines and integers all cross boundaries
    let pool = ChunkPool::new(PoolConfig::new(7, 8)?)?;
    let mut input = Input::new(pool, ReaderSource::new(Cursor::new(data)));

    while !input.eof()? {
        let tag = input.preview(|input| input.read_utf8_string(3))?;
        input.discard(4)?;

        match tag.as_str() {
            "TXT" => {
                let line = input.read_utf8_line()?.unwrap_or_default();
                println!("text:   {line}");
            }
            "BIN" => {
                let value = input.read_u32()?;
                println!("binary: {value:#010x}");
            }
            other => {
                println!("unknown tag {other:?}, stopping");
                break;
            }
        }
    }

    input.close()?;
    Ok(())
}
