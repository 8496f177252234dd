//! chunkio
//!
//! Pooled byte chunks and buffered I/O on top of them.
//!
//! `chunkio` is the buffer substrate under binary codecs and protocol
//! parsers. Bytes live in fixed-size chunks borrowed from a pool; readers
//! and writers move whole chunks around instead of copying bytes:
//!
//! - [`ChunkBuffer`] - a chunk with read/write cursors, start/end gaps and
//!   zero-copy views
//! - [`ChunkPool`] - bounded cache of idle chunks, one default per thread
//! - [`Input`] - buffered reader with prefetch, discard and non-destructive
//!   [`preview`](Input::preview)
//! - [`Output`] - buffered writer into a [`Sink`], and
//!   [`BytePacketBuilder`] for in-memory packets
//!
//! The crate intentionally:
//! - does NOT spawn threads or suspend; every call runs on the caller's thread
//! - does NOT share pools or chunks across threads
//! - does NOT define a wire format of its own
//!
//! Multi-byte values are big-endian unless a [`ByteOrder`] is given, and
//! may straddle chunk boundaries on both sides.
//!
//! # Reading
//!
//! ```no_run
//! use std::fs::File;
//! use chunkio::{ChunkError, ChunkPool, Input, ReaderSource};
//!
//! fn main() -> Result<(), ChunkError> {
//!     let file = File::open("data.bin")?;
//!     let mut input = Input::new(ChunkPool::thread_default(), ReaderSource::new(file));
//!
//!     let magic = input.preview(|input| input.read_u32())?;
//!     if magic == 0xCAFE_BABE {
//!         input.discard(4)?;
//!     }
//!     while let Some(line) = input.read_utf8_line()? {
//!         println!("{line}");
//!     }
//!     input.close()
//! }
//! ```
//!
//! # Building packets
//!
//! ```
//! use chunkio::{BytePacketBuilder, ChunkError};
//!
//! fn main() -> Result<(), ChunkError> {
//!     let mut builder = BytePacketBuilder::default();
//!     builder.write_u32(0x0102_0304)?;
//!     builder.write_utf8_str("hi")?;
//!
//!     let mut packet = builder.build()?;
//!     assert_eq!(packet.read_u8()?, 0x01);
//!     assert_eq!(packet.remaining(), 5);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod buffer;
mod chain;
mod config;
mod error;
mod input;
mod output;
mod primitive;
mod text;
mod util;

//
// Public surface
//

pub use buffer::{ChunkBuffer, ChunkPool, Memory, PoolStats};
pub use chain::ChunkChain;
pub use config::{DEFAULT_CHUNK_SIZE, DEFAULT_POOL_CAPACITY, MIN_CHUNK_SIZE, PoolConfig};
pub use error::ChunkError;
pub use input::{ByteReadPacket, BytesSource, EmptySource, Input, ReaderSource, Source};
pub use output::{BytePacketBuilder, Output, Sink, WriterSink};
pub use primitive::{ByteOrder, Primitive};
pub use text::Utf8Decoder;
