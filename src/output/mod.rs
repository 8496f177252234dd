//! Writing side: buffered outputs, sinks and the packet builder.
//!
//! - [`Output`] - Chunked writer with cross-boundary primitive writes
//! - [`Sink`] - Destination for sealed chunks
//! - [`BytePacketBuilder`] - Output that keeps its chunks in memory

mod packet;
mod sink;
mod writer;

pub use packet::BytePacketBuilder;
pub use sink::{Sink, WriterSink};
pub use writer::Output;
