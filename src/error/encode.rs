//! This module contains errors pertaining to the ABI encoder.
//!
//! Encoder errors are always *user-input* errors: the type being encoded is
//! trusted (it came out of the extractor fully resolved), while the JSON
//! value is not. Each error carries a breadcrumb path of array indices and
//! object keys built up as it bubbles out of nested values.

use thiserror::Error;

/// Errors that occur when encoding a JSON value into the ABI layout.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("expected {expected}, found {found}")]
    WrongJsonKind { expected: String, found: String },

    #[error("expected array of {expected} elements, have {found}")]
    ArrayLengthMismatch { expected: usize, found: usize },

    #[error("too many or too few keys in object: {found}, expected keys: {expected}")]
    StructKeyMismatch { expected: String, found: usize },

    #[error("missing key in object: {key}")]
    MissingStructKey { key: String },

    #[error("unexpected enum case: {case}, expected one of: {expected}")]
    UnknownEnumCase { case: String, expected: String },

    #[error("value too large for type {type_name}: {value}")]
    ValueOutOfRange { type_name: String, value: String },

    #[error("expected \"0x\" prefix on {type_name} string")]
    MissingHexPrefix { type_name: String },

    #[error("unexpected exponent or decimal separator in number: {literal}")]
    ExponentOrDecimal { literal: String },

    #[error("invalid number for type {type_name}: {literal}")]
    MalformedNumber { type_name: String, literal: String },

    #[error("byte value out of range: {value}")]
    ByteOutOfRange { value: String },

    #[error("string too long for {type_name}: {found} bytes")]
    StringTooLong { type_name: String, found: usize },

    #[error("fixed/ufixed types not supported yet")]
    UnsupportedFixedPoint,

    /// A child error that occurred at the array index `index`.
    #[error("[{index}] {inner}")]
    AtIndex { index: usize, inner: Box<Error> },

    /// A child error that occurred under the object key `key`.
    #[error("[{key:?}] {inner}")]
    AtKey { key: String, inner: Box<Error> },
}

impl Error {
    /// Wraps the error in the breadcrumb for the array index `index`.
    #[must_use]
    pub fn at_index(self, index: usize) -> Self {
        Self::AtIndex {
            index,
            inner: Box::new(self),
        }
    }

    /// Wraps the error in the breadcrumb for the object key `key`.
    #[must_use]
    pub fn at_key(self, key: impl Into<String>) -> Self {
        Self::AtKey {
            key:   key.into(),
            inner: Box::new(self),
        }
    }
}

/// The result type for the encoder.
pub type Result<T> = std::result::Result<T, Error>;
