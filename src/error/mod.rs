//! This module contains the primary error type for the library's interface.
//! It also re-exports the more specific error types that are
//! subsystem-specific.
//!
//! # Anyhow
//!
//! All of the errors implement [`std::error::Error`], and hence can be used
//! with [`anyhow::Error`] internally. It is _not_ recommended to use that
//! error type in the interface of the library, as this forces clients to also
//! use `anyhow`.

pub mod decode;
pub mod encode;
pub mod load;
pub mod lookup;

use thiserror::Error;

/// The interface result type for the library.
///
/// # Usage
///
/// Any function considered to be part of the public interface of the library
/// should return this result type. Note that _all_ of the library is public
/// in order to facilitate use-cases beyond the ones designed for.
pub type Result<T> = std::result::Result<T, Error>;

/// The interface error type for the library.
///
/// All errors returned from the library interface (and hence encountered by
/// the clients of the library) should be members of this enum.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// Errors that come from loading and assembling a compiled project.
    #[error(transparent)]
    Load(#[from] load::Error),

    /// Errors from the ABI encoder, always caused by the JSON input.
    #[error(transparent)]
    Encode(#[from] encode::Error),

    /// Errors from the ABI decoder, caused by malformed or foreign buffers.
    #[error(transparent)]
    Decode(#[from] decode::Error),

    /// Errors from looking up functions in an assembled project.
    #[error(transparent)]
    Lookup(#[from] lookup::Error),
}
