//! Error types for chunkio.

use std::fmt;

/// Errors that can occur while working with chunks, pools, inputs and outputs.
#[derive(Debug)]
pub enum ChunkError {
    /// An I/O error occurred in a source or sink.
    Io(std::io::Error),

    /// The input was exhausted before the requested amount was available.
    EndOfInput {
        /// Number of bytes still required when the input ran dry.
        needed: usize,
    },

    /// An offset/length pair does not fit the target region.
    IndexOutOfRange {
        /// Start of the rejected range.
        offset: usize,
        /// Length of the rejected range.
        length: usize,
        /// Size of the region the range was checked against.
        capacity: usize,
    },

    /// An argument was rejected before any mutation happened.
    IllegalArgument {
        /// Description of what was invalid.
        message: &'static str,
    },

    /// A protocol violation (recycling an in-use chunk, refcount underflow, ...).
    IllegalState {
        /// Description of the violated rule.
        message: &'static str,
    },

    /// `discard_first` was called on an empty chunk chain.
    EmptyChain,

    /// A codec met a byte sequence it cannot decode.
    MalformedInput {
        /// Description of the malformed sequence.
        message: &'static str,
    },

    /// Invalid configuration parameter.
    InvalidConfig {
        /// Description of what was invalid.
        message: &'static str,
    },
}

impl ChunkError {
    /// Returns true for [`ChunkError::EndOfInput`].
    pub fn is_end_of_input(&self) -> bool {
        matches!(self, ChunkError::EndOfInput { .. })
    }

    /// Returns true for [`ChunkError::IllegalState`].
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, ChunkError::IllegalState { .. })
    }
}

impl fmt::Display for ChunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkError::Io(e) => write!(f, "io error: {}", e),
            ChunkError::EndOfInput { needed } => {
                write!(f, "end of input: {} more bytes required", needed)
            }
            ChunkError::IndexOutOfRange {
                offset,
                length,
                capacity,
            } => write!(
                f,
                "index out of range: {}..{} exceeds {}",
                offset,
                offset.saturating_add(*length),
                capacity
            ),
            ChunkError::IllegalArgument { message } => write!(f, "illegal argument: {}", message),
            ChunkError::IllegalState { message } => write!(f, "illegal state: {}", message),
            ChunkError::EmptyChain => write!(f, "chunk chain is empty"),
            ChunkError::MalformedInput { message } => write!(f, "malformed input: {}", message),
            ChunkError::InvalidConfig { message } => write!(f, "invalid config: {}", message),
        }
    }
}

impl std::error::Error for ChunkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChunkError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ChunkError {
    fn from(e: std::io::Error) -> Self {
        ChunkError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: ChunkError = io_err.into();
        assert!(matches!(err, ChunkError::Io(_)));
    }

    #[test]
    fn test_display() {
        let err = ChunkError::IndexOutOfRange {
            offset: 4,
            length: 8,
            capacity: 10,
        };
        assert_eq!(err.to_string(), "index out of range: 4..12 exceeds 10");

        let err = ChunkError::EndOfInput { needed: 3 };
        assert!(err.to_string().contains("3 more bytes"));
    }

    #[test]
    fn test_predicates() {
        assert!(ChunkError::EndOfInput { needed: 1 }.is_end_of_input());
        assert!(ChunkError::IllegalState { message: "x" }.is_illegal_state());
        assert!(!ChunkError::EmptyChain.is_end_of_input());
    }
}
