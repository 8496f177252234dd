//! UTF-8 text on top of inputs and outputs.
//!
//! Decoding goes byte by byte through [`Utf8Decoder`], so characters and
//! line terminators may straddle chunk boundaries freely.

mod utf8;

pub use utf8::Utf8Decoder;

use crate::error::ChunkError;
use crate::input::{Input, Source};
use crate::output::{Output, Sink};

impl<S: Source> Input<S> {
    /// Reads one UTF-8 encoded character, `None` at end of stream.
    ///
    /// A stream ending inside a character fails with `MalformedInput`.
    pub fn read_utf8_char(&mut self) -> Result<Option<char>, ChunkError> {
        if self.eof()? {
            return Ok(None);
        }
        let mut decoder = Utf8Decoder::new();
        loop {
            let byte = self.read_u8().map_err(truncated)?;
            if let Some(ch) = decoder.feed(byte)? {
                return Ok(Some(ch));
            }
        }
    }

    /// Reads a line terminated by `\n`, `\r\n` or a lone `\r`.
    ///
    /// The terminator is consumed but not returned. The last line may end
    /// at end of stream without a terminator. Returns `None` once the stream
    /// is exhausted.
    pub fn read_utf8_line(&mut self) -> Result<Option<String>, ChunkError> {
        if self.eof()? {
            return Ok(None);
        }
        let mut line = Vec::new();
        loop {
            let byte = match self.read_u8() {
                Ok(byte) => byte,
                Err(e) if e.is_end_of_input() => break,
                Err(e) => return Err(e),
            };
            match byte {
                b'\n' => break,
                b'\r' => {
                    if self.peek_u8()? == Some(b'\n') {
                        self.discard(1)?;
                    }
                    break;
                }
                other => line.push(other),
            }
        }
        Utf8Decoder::decode(&line).map(Some)
    }

    /// Reads exactly `byte_len` bytes and decodes them as UTF-8.
    pub fn read_utf8_string(&mut self, byte_len: usize) -> Result<String, ChunkError> {
        let mut bytes = vec![0u8; byte_len];
        self.read_fully(&mut bytes, 0, byte_len)?;
        Utf8Decoder::decode(&bytes)
    }
}

fn truncated(e: ChunkError) -> ChunkError {
    if e.is_end_of_input() {
        ChunkError::MalformedInput {
            message: "truncated UTF-8 sequence",
        }
    } else {
        e
    }
}

impl<S: Sink> Output<S> {
    /// Writes the UTF-8 bytes of `text`.
    pub fn write_utf8_str(&mut self, text: &str) -> Result<(), ChunkError> {
        self.write_fully(text.as_bytes(), 0, text.len())
    }

    /// Writes one character as UTF-8.
    pub fn write_char(&mut self, ch: char) -> Result<(), ChunkError> {
        let mut buf = [0u8; 4];
        self.write_utf8_str(ch.encode_utf8(&mut buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ChunkPool;
    use crate::config::PoolConfig;
    use crate::input::BytesSource;

    fn input(chunk_size: usize, data: &[u8]) -> Input<BytesSource> {
        let pool = ChunkPool::new(PoolConfig::new(chunk_size, 16).unwrap()).unwrap();
        Input::new(pool, BytesSource::new(data.to_vec()))
    }

    #[test]
    fn test_chars_across_one_byte_chunks() {
        let mut input = input(1, "a€🦀".as_bytes());
        assert_eq!(input.read_utf8_char().unwrap(), Some('a'));
        assert_eq!(input.read_utf8_char().unwrap(), Some('€'));
        assert_eq!(input.read_utf8_char().unwrap(), Some('🦀'));
        assert_eq!(input.read_utf8_char().unwrap(), None);
    }

    #[test]
    fn test_truncated_char() {
        let mut input = input(4, &[0xE2, 0x82]);
        assert!(matches!(
            input.read_utf8_char(),
            Err(ChunkError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_line_terminators() {
        let mut input = input(2, b"one\ntwo\r\nthree\rfour");
        assert_eq!(input.read_utf8_line().unwrap().as_deref(), Some("one"));
        assert_eq!(input.read_utf8_line().unwrap().as_deref(), Some("two"));
        assert_eq!(input.read_utf8_line().unwrap().as_deref(), Some("three"));
        assert_eq!(input.read_utf8_line().unwrap().as_deref(), Some("four"));
        assert_eq!(input.read_utf8_line().unwrap(), None);
    }

    #[test]
    fn test_empty_lines() {
        let mut input = input(3, b"\n\r\n\r");
        assert_eq!(input.read_utf8_line().unwrap().as_deref(), Some(""));
        assert_eq!(input.read_utf8_line().unwrap().as_deref(), Some(""));
        assert_eq!(input.read_utf8_line().unwrap().as_deref(), Some(""));
        assert_eq!(input.read_utf8_line().unwrap(), None);
    }

    #[test]
    fn test_read_utf8_string() {
        let mut input = input(2, "héllo".as_bytes());
        assert_eq!(input.read_utf8_string(3).unwrap(), "hé");
        assert!(input.read_utf8_string(10).unwrap_err().is_end_of_input());
    }

    #[test]
    fn test_write_text() {
        let pool = ChunkPool::new(PoolConfig::new(3, 16).unwrap()).unwrap();
        let mut output = Output::new(pool, Vec::new());
        output.write_utf8_str("hé").unwrap();
        output.write_char('🦀').unwrap();
        output.close().unwrap();
        assert_eq!(output.sink(), "hé🦀".as_bytes());
    }
}
