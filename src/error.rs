//! Error types for JBIG2 decoding.

use core::fmt;

/// The main error type for JBIG2 decoding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The byte source was exhausted before a required read.
    ///
    /// Carries the byte offset into the stream at which the read was
    /// attempted.
    EndOfStream {
        /// Byte offset at which the stream ran out.
        offset: usize,
    },
    /// A header field violates the ranges permitted by the standard.
    InvalidHeaderValue,
    /// A decoded index points outside its table or buffer.
    IndexOutOfBounds,
    /// The encoded data is inconsistent with the declared parameters.
    CorruptedStream,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndOfStream { offset } => {
                write!(f, "unexpected end of stream at byte offset {offset}")
            }
            Self::InvalidHeaderValue => write!(f, "invalid header value"),
            Self::IndexOutOfBounds => write!(f, "index out of bounds"),
            Self::CorruptedStream => write!(f, "corrupted stream"),
        }
    }
}

impl core::error::Error for DecodeError {}

/// Result type for JBIG2 decoding operations.
pub type Result<T> = core::result::Result<T, DecodeError>;

macro_rules! bail {
    ($err:expr) => {
        return Err($err.into())
    };
}

macro_rules! err {
    ($err:expr) => {
        Err($err.into())
    };
}

pub(crate) use bail;
pub(crate) use err;
