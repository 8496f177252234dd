//! Incremental UTF-8 decoding.
//!
//! The decoder is the DFA described by Bjoern Hoehrmann: every byte is
//! mapped to a character class, and the class drives a twelve-column
//! transition table. Bytes arrive one at a time, so a character may span
//! any number of chunk boundaries.

use crate::error::ChunkError;

const ACCEPT: u8 = 0;
const REJECT: u8 = 12;

/// Character classes for bytes `0x80..=0xFF`; ASCII is class 0.
#[rustfmt::skip]
const CLASSES: [u8; 128] = [
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9,
    7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7,
    7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7,
    8, 8, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    10, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 4, 3, 3,
    11, 6, 6, 6, 5, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8,
];

/// Transitions indexed by `state + class`.
#[rustfmt::skip]
const TRANSITIONS: [u8; 108] = [
    0, 12, 24, 36, 60, 96, 84, 12, 12, 12, 48, 72,
    12, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12,
    12, 0, 12, 12, 12, 12, 12, 0, 12, 0, 12, 12,
    12, 24, 12, 12, 12, 12, 12, 24, 12, 24, 12, 12,
    12, 12, 12, 12, 12, 12, 12, 24, 12, 12, 12, 12,
    12, 24, 12, 12, 12, 12, 12, 12, 12, 24, 12, 12,
    12, 12, 12, 12, 12, 12, 12, 36, 12, 36, 12, 12,
    12, 36, 12, 12, 12, 12, 12, 36, 12, 36, 12, 12,
    12, 36, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12,
];

#[inline]
fn class_of(byte: u8) -> u8 {
    if byte < 0x80 {
        0
    } else {
        CLASSES[usize::from(byte - 0x80)]
    }
}

/// Streaming UTF-8 decoder.
///
/// # Example
///
/// ```
/// use chunkio::Utf8Decoder;
///
/// let mut decoder = Utf8Decoder::new();
/// assert_eq!(decoder.feed(0xE2)?, None);
/// assert_eq!(decoder.feed(0x82)?, None);
/// assert_eq!(decoder.feed(0xAC)?, Some('€'));
/// decoder.finish()?;
/// # Ok::<(), chunkio::ChunkError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Decoder {
    state: u8,
    codepoint: u32,
}

impl Utf8Decoder {
    /// Creates a decoder at a character boundary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no partial character is pending.
    pub fn is_boundary(&self) -> bool {
        self.state == ACCEPT
    }

    /// Consumes one byte, returning the character it completes.
    ///
    /// An invalid sequence fails with `MalformedInput` and resets the decoder.
    pub fn feed(&mut self, byte: u8) -> Result<Option<char>, ChunkError> {
        let class = class_of(byte);
        self.codepoint = if self.state == ACCEPT {
            (0xFF >> class) & u32::from(byte)
        } else {
            u32::from(byte & 0x3F) | (self.codepoint << 6)
        };
        self.state = TRANSITIONS[usize::from(self.state + class)];

        match self.state {
            ACCEPT => match char::from_u32(self.codepoint) {
                Some(ch) => Ok(Some(ch)),
                None => {
                    self.reset();
                    Err(ChunkError::MalformedInput {
                        message: "invalid UTF-8 code point",
                    })
                }
            },
            REJECT => {
                self.reset();
                Err(ChunkError::MalformedInput {
                    message: "invalid UTF-8 sequence",
                })
            }
            _ => Ok(None),
        }
    }

    /// Fails if the input ended inside a character.
    pub fn finish(&mut self) -> Result<(), ChunkError> {
        if self.state != ACCEPT {
            self.reset();
            return Err(ChunkError::MalformedInput {
                message: "truncated UTF-8 sequence",
            });
        }
        Ok(())
    }

    /// Decodes a complete byte sequence.
    pub fn decode(bytes: &[u8]) -> Result<String, ChunkError> {
        let mut decoder = Self::new();
        let mut out = String::with_capacity(bytes.len());
        for &byte in bytes {
            if let Some(ch) = decoder.feed(byte)? {
                out.push(ch);
            }
        }
        decoder.finish()?;
        Ok(out)
    }

    fn reset(&mut self) {
        self.state = ACCEPT;
        self.codepoint = 0;
    }
}
