//! This module contains the derivation of function selectors from canonical
//! Solidity signatures, and the construction of call payloads.
//!
//! The canonical signature itself is formatted by
//! [`Function::signature`]; this module hashes it with Keccak-256 and glues
//! the resulting selector onto the encoded argument tuple.

use serde_json::Value;
use sha3::{Digest, Keccak256};

use crate::{
    codec,
    constant::SELECTOR_SIZE_BYTES,
    error::encode,
    types::{project::Function, Type},
};

/// Computes the Keccak-256 digest of `input`.
#[must_use]
pub fn keccak256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(input);
    hasher
        .finalize()
        .as_slice()
        .try_into()
        .expect("Keccak-256 always yields 32 bytes")
}

/// Derives the 4-byte selector that identifies `function` in a call
/// payload: the first four bytes of the Keccak-256 digest of its canonical
/// signature.
#[must_use]
pub fn selector(function: &Function) -> [u8; SELECTOR_SIZE_BYTES] {
    let digest = keccak256(function.signature().as_bytes());
    digest[..SELECTOR_SIZE_BYTES]
        .try_into()
        .expect("a digest is longer than a selector")
}

/// Builds the complete call payload for invoking `function` with
/// `arguments`: the selector followed by the ABI encoding of the argument
/// tuple.
///
/// # Errors
///
/// Returns an [`encode::Error`] when `arguments` does not fit the
/// function's input types.
pub fn call_data(function: &Function, arguments: &Value) -> encode::Result<Vec<u8>> {
    let encoded = codec::encode(&Type::Tuple(function.inputs.clone()), arguments)?;
    let mut data = Vec::with_capacity(SELECTOR_SIZE_BYTES + encoded.len());
    data.extend_from_slice(&selector(function));
    data.extend_from_slice(&encoded);
    Ok(data)
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::{call_data, keccak256, selector};
    use crate::{
        ast::{StateMutability, Visibility},
        types::{project::Function, Type},
    };

    fn function(name: &str, inputs: Vec<Type>) -> Function {
        Function {
            name: name.to_owned(),
            natspec: None,
            visibility: Visibility::Public,
            state_mutability: StateMutability::Nonpayable,
            inputs,
            outputs: vec![],
        }
    }

    #[test]
    fn keccak_of_the_empty_string_matches_the_reference() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn selectors_match_well_known_values() {
        let transfer = function("transfer", vec![
            Type::elementary("address"),
            Type::elementary("uint256"),
        ]);
        assert_eq!(selector(&transfer), [0xa9, 0x05, 0x9c, 0xbb]);

        let baz = function("baz", vec![
            Type::elementary("uint32"),
            Type::elementary("bool"),
        ]);
        assert_eq!(selector(&baz), [0xcd, 0xcd, 0x77, 0xc0]);
    }

    #[test]
    fn call_data_is_selector_then_arguments() -> anyhow::Result<()> {
        let baz = function("baz", vec![
            Type::elementary("uint32"),
            Type::elementary("bool"),
        ]);
        let data = call_data(&baz, &json!([69, true]))?;

        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[..4], [0xcd, 0xcd, 0x77, 0xc0]);
        assert_eq!(data[4 + 31], 69);
        assert_eq!(data[4 + 63], 1);
        Ok(())
    }

    #[test]
    fn enum_arguments_select_as_uint8() {
        let paint = function("paint", vec![Type::Enum(vec![
            "Red".into(),
            "Green".into(),
        ])]);
        let plain = function("paint", vec![Type::elementary("uint8")]);
        assert_eq!(selector(&paint), selector(&plain));
    }
}
