//! Reading side: buffered inputs and the sources that feed them.
//!
//! - [`Input`] - Chunked reader with prefetch and preview
//! - [`Source`] - Fills chunks with bytes
//! - [`ByteReadPacket`] - Input replaying an in-memory chunk chain

mod reader;
mod source;

pub use reader::{ByteReadPacket, Input};
pub use source::{BytesSource, EmptySource, ReaderSource, Source};
