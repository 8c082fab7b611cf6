//! This library bridges a dynamically-typed JSON world and the Solidity
//! [ABI](https://docs.soliditylang.org/en/latest/abi-spec.html) used by
//! Ethereum smart contracts. Given the type information in a compiled
//! project's "combined JSON" output, it encodes JSON values into the packed
//! binary layout the EVM expects and decodes call results back into JSON. It
//! also models the project's contracts, functions and user-defined types, so
//! that a function can be looked up by its canonical Solidity signature and
//! turned into call-data.
//!
//! # How it Works
//!
//! From a very high level, the bridge is built in stages:
//!
//! 1. The combined JSON is ingested and each source unit's AST becomes a
//!    typed [`ast::Node`] tree.
//! 2. The extractor walks each tree and maps every type-bearing AST node id
//!    to a [`types::Type`], leaving [`types::Type::Reference`] placeholders
//!    for forward references.
//! 3. A single fix-point pass over the [`types::map::TypeMap`] resolves
//!    every reference; nothing downstream ever observes one.
//! 4. The assembler composes the [`Project`]: per-file contracts, their
//!    linearised inheritance, their APIs (including synthesised getters for
//!    public state variables), their user-defined types, and their compiled
//!    binaries, under a shared root path.
//! 5. On demand, [`Function::signature`] and [`selector`] identify a
//!    function, and the [`codec`] encodes arguments and decodes return
//!    values using the resolved types.
//!
//! The codec and the assembled project are pure and immutable: no locks, no
//! global state, no I/O.
//!
//! # Basic Usage
//!
//! ```
//! use abi_link::types::Type;
//! use serde_json::json;
//!
//! let amount = Type::elementary("uint256");
//!
//! let encoded = abi_link::encode(&amount, &json!(42)).unwrap();
//! assert_eq!(encoded.len(), 32);
//! assert_eq!(encoded[31], 42);
//!
//! let decoded = abi_link::decode(&amount, &encoded).unwrap();
//! assert_eq!(decoded, json!(42));
//! ```

#![recursion_limit = "256"]
#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming

pub mod ast;
pub mod codec;
pub mod constant;
pub mod error;
pub mod extractor;
pub mod signature;
pub mod types;

// Re-exports to provide the library interface.
pub use codec::{decode, encode};
pub use extractor::project::load_project;
pub use signature::{call_data, selector};
pub use types::{
    project::{Contract, Function, Project},
    Type,
};
