//! This module contains errors pertaining to the ABI decoder.
//!
//! Decoder errors mirror the encoder's input errors: they indicate a buffer
//! that is malformed, truncated, or produced for a different type. They must
//! never escalate into memory unsafety, panics, or unbounded allocation, no
//! matter how hostile the buffer.

use thiserror::Error;

/// Errors that occur when decoding an ABI-encoded buffer back into JSON.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("buffer too short: need {needed} bytes, have {available}")]
    BufferTooShort { needed: usize, available: usize },

    #[error("tail pointer {pointer} is inconsistent with head offset {offset}")]
    InconsistentPointer { pointer: String, offset: usize },

    #[error("length prefix {length} exceeds the {available} bytes present")]
    LengthOutOfBounds { length: String, available: usize },

    #[error("enum index {index} out of range for {count} cases")]
    EnumIndexOutOfRange { index: String, count: usize },

    #[error("boolean word has value {value}, expected 0 or 1")]
    MalformedBool { value: String },

    #[error("fixed/ufixed types not supported yet")]
    UnsupportedFixedPoint,
}

/// The result type for the decoder.
pub type Result<T> = std::result::Result<T, Error>;
