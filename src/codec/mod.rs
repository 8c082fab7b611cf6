//! This module contains the ABI codec: the pair of routines that translate
//! between JSON values and the packed binary layout the EVM expects.
//!
//! # The head/tail convention
//!
//! Every value occupies either a 32-byte head slot directly (static types)
//! or a 32-byte head slot holding a byte offset into the tail region where
//! the value's payload lies (dynamic types). Offsets are measured from the
//! start of the current argument region, and nested dynamic regions restart
//! their offsets relative to themselves. The encoder and decoder in this
//! module are exact inverses over that layout.

pub mod decode;
pub mod encode;

pub use decode::decode;
pub use encode::encode;

use ethnum::U256;

use crate::{
    constant::{BYTE_SIZE_BITS, MAX_INTEGER_WIDTH_BITS, WORD_SIZE_BYTES},
    types::{ArrayLength, Type},
};

/// Computes the number of bytes a value of type `typ` occupies in the head
/// region.
///
/// Leaves and dynamic containers occupy a single word (dynamic values store
/// a pointer); tuples and structs occupy the sum of their members; a
/// fixed-length array occupies `length` times its element.
///
/// # Panics
///
/// Panics on [`Type::Mapping`] and [`Type::Event`], which have no ABI
/// encoding, and on [`Type::Reference`], which cannot outlive the
/// extractor's resolve pass. Reaching any of them here is a programmer
/// error, not a recoverable condition.
#[must_use]
pub fn width(typ: &Type) -> usize {
    match typ {
        Type::Named { inner, .. } => width(inner),
        Type::Elementary(_)
        | Type::Enum(_)
        | Type::ContractAddress(_)
        | Type::InterfaceAddress(_)
        | Type::LibraryAddress(_) => WORD_SIZE_BYTES,
        Type::Tuple(types) => types.iter().map(width).sum(),
        Type::Struct { fields } => fields.iter().map(|f| width(&f.typ)).sum(),
        Type::Array { length, element } => match length {
            // The head slot holds a pointer into the tail.
            ArrayLength::Dynamic => WORD_SIZE_BYTES,
            ArrayLength::Fixed(n) => n * width(element),
        },
        Type::Mapping { .. } | Type::Event { .. } => {
            panic!("{} types have no ABI width", typ.solidity_signature())
        }
        Type::Reference(id) => {
            panic!("unresolved type reference {id} reached the codec")
        }
    }
}

/// Rewrites an elementary type's spelling to its canonical synonym.
///
/// Solidity admits shorthand spellings for several elementary types; the
/// codec only ever reasons about the canonical ones.
#[must_use]
pub fn normalize_elementary(name: &str) -> &str {
    match name {
        "byte" => "bytes1",
        "int" => "int256",
        "uint" => "uint256",
        "address" => "uint160",
        "fixed" => "fixed128x18",
        "ufixed" => "ufixed128x18",
        "string" => "bytes",
        other => other,
    }
}

/// Splits a normalised integer spelling such as `uint160` or `int8` into its
/// signedness and bit width. Returns [`None`] for non-integer spellings.
///
/// # Panics
///
/// Panics when the spelling has an integer prefix but a width that is not a
/// multiple of 8 in `8..=256`. The extractor only ever produces compiler
/// spellings, so such a width is a programmer error.
#[must_use]
pub fn integer_parts(id: &str) -> Option<(bool, usize)> {
    let (signed, digits) = if let Some(rest) = id.strip_prefix("uint") {
        (false, rest)
    } else if let Some(rest) = id.strip_prefix("int") {
        (true, rest)
    } else {
        return None;
    };

    let bits: usize = digits
        .parse()
        .unwrap_or_else(|_| panic!("malformed integer spelling {id}"));
    assert!(
        bits % BYTE_SIZE_BITS == 0 && bits >= BYTE_SIZE_BITS && bits <= MAX_INTEGER_WIDTH_BITS,
        "integer spelling {id} has width outside 8..=256"
    );
    Some((signed, bits))
}

/// Extracts the `N` of a `bytesN` spelling. Returns [`None`] for `bytes`
/// itself and for non-bytes spellings.
///
/// # Panics
///
/// Panics when `N` is outside `1..=32`, which no compiler spelling has.
#[must_use]
pub fn fixed_bytes_length(id: &str) -> Option<usize> {
    if id == "bytes" {
        return None;
    }
    let digits = id.strip_prefix("bytes")?;
    let length: usize = digits
        .parse()
        .unwrap_or_else(|_| panic!("malformed bytes spelling {id}"));
    assert!(
        (1..=WORD_SIZE_BYTES).contains(&length),
        "bytes spelling {id} has length outside 1..=32"
    );
    Some(length)
}

/// Encodes a non-negative word count or offset as a 32-byte big-endian word.
pub(crate) fn word_from_usize(value: usize) -> [u8; WORD_SIZE_BYTES] {
    U256::from(value as u128).to_be_bytes()
}

/// Negates a 32-byte big-endian word in place, two's-complement style:
/// every byte is inverted, then one is added at the least-significant byte,
/// with the carry propagating upward until a byte does not wrap to zero.
pub(crate) fn twos_complement(word: &mut [u8; WORD_SIZE_BYTES]) {
    for byte in word.iter_mut() {
        *byte = !*byte;
    }
    for byte in word.iter_mut().rev() {
        let (incremented, wrapped) = byte.overflowing_add(1);
        *byte = incremented;
        if !wrapped {
            break;
        }
    }
}

/// Computes the bit length of `value`: the position of its highest set bit.
pub(crate) fn bit_length(value: U256) -> usize {
    MAX_INTEGER_WIDTH_BITS - value.leading_zeros() as usize
}
