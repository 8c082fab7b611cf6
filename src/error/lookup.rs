//! This module contains errors pertaining to looking up contracts and
//! functions in an assembled project.

use thiserror::Error;

/// Errors that occur when navigating a [`crate::types::project::Project`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("file not found: {file}")]
    FileNotFound { file: String },

    #[error("contract not found: {contract}")]
    ContractNotFound { contract: String },

    #[error("function signature not found: {signature}. available are: {available}")]
    FunctionNotFound { signature: String, available: String },
}

/// The result type for project lookups.
pub type Result<T> = std::result::Result<T, Error>;
