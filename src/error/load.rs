//! This module contains errors pertaining to loading the compiler's combined
//! JSON output and assembling it into a project model.

use thiserror::Error;

/// Errors that occur while parsing the combined JSON, extracting types, or
/// assembling the project.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("The combined JSON could not be parsed: {reason}")]
    MalformedJson { reason: String },

    #[error("Malformed AST node: {reason}")]
    MalformedNode { reason: String },

    #[error("The AST for {path:?} could not be parsed: {reason}")]
    MalformedAst { path: String, reason: String },

    #[error("The AST root for {path:?} is a {found} node, not a SourceUnit")]
    UnexpectedRoot { path: String, found: String },

    #[error("The node {node} was expected to be a {expected}")]
    UnexpectedNode { node: String, expected: String },

    #[error("A VariableDeclaration node must have exactly one child, not {found}")]
    MalformedVariableDeclaration { found: usize },

    #[error("An EventDefinition node must have exactly one child, not {found}")]
    MalformedEventDefinition { found: usize },

    #[error("An ArrayTypeName node must have one or two children, not {found}")]
    MalformedArrayTypeName { found: usize },

    #[error("The array length in {type_name:?} could not be parsed")]
    MalformedArrayLength { type_name: String },

    #[error("A Mapping node must have exactly two children, not {found}")]
    MalformedMapping { found: usize },

    #[error("Contract {contract} names the unknown declaration {parent} as a parent")]
    UnknownParent { contract: String, parent: i64 },

    #[error("The compiled binary for contract in {path:?} is not valid hex")]
    MalformedBinary { path: String },

    #[error("The source path {path:?} does not begin with the shared prefix {prefix:?}")]
    PathOutsidePrefix { path: String, prefix: String },
}

/// The result type for operations that load and assemble projects.
pub type Result<T> = std::result::Result<T, Error>;
