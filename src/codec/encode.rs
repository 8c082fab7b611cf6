//! This module contains the ABI encoder: it turns a JSON value into the
//! packed binary layout a contract expects for a value of a given type.
//!
//! The encoder is pure: it allocates fresh head and tail buffers, never
//! retains them beyond the call, and on error no bytes are deemed produced.
//! Every error is a user-input error carrying a breadcrumb path of array
//! indices and object keys.

use std::iter;

use ethnum::U256;
use itertools::Itertools;
use serde_json::Value;

use crate::{
    codec::{
        fixed_bytes_length,
        integer_parts,
        normalize_elementary,
        twos_complement,
        width,
        word_from_usize,
    },
    constant::{MAX_INTEGER_WIDTH_BITS, WORD_SIZE_BYTES},
    error::encode::{Error, Result},
    types::{ArrayLength, Type},
};

/// Encodes `value` as an ABI payload for the type `typ`.
///
/// The output is the head region immediately followed by the tail region;
/// its length is always a multiple of 32. The value's own region starts the
/// tail after `width(typ)` bytes of head, so a bare dynamic value carries a
/// pointer past its own head slot.
///
/// # Errors
///
/// Returns an [`Error`] describing the first way in which `value` does not
/// fit `typ`, with a path of array indices and object keys pointing at the
/// offending subvalue.
///
/// # Panics
///
/// Panics when `typ` is (or contains, in an encodable position) a
/// [`Type::Mapping`], [`Type::Event`] or unresolved [`Type::Reference`]:
/// those cannot be encoded and indicate a bug in the caller, not bad input.
pub fn encode(typ: &Type, value: &Value) -> Result<Vec<u8>> {
    let mut head = Vec::with_capacity(1024);
    let mut tail = Vec::with_capacity(1024);

    // Tuples establish their own tail offset; any other type at the top
    // level is a one-slot region whose tail begins after its head.
    let tail_offset = match unwrap_named(typ) {
        Type::Tuple(_) => 0,
        bare => width(bare),
    };

    encode_value(typ, value, tail_offset, &mut head, &mut tail)?;
    head.extend_from_slice(&tail);
    Ok(head)
}

fn unwrap_named(typ: &Type) -> &Type {
    match typ {
        Type::Named { inner, .. } => unwrap_named(inner),
        other => other,
    }
}

fn encode_value(
    typ: &Type,
    value: &Value,
    tail_offset: usize,
    head: &mut Vec<u8>,
    tail: &mut Vec<u8>,
) -> Result<()> {
    match typ {
        Type::Named { inner, .. } => encode_value(inner, value, tail_offset, head, tail),

        Type::ContractAddress(_) | Type::InterfaceAddress(_) | Type::LibraryAddress(_) => {
            encode_elementary("address", value, tail_offset, head, tail)
        }

        Type::Tuple(types) => {
            let items = expect_array(value, &format!("array of {} elements", types.len()))?;
            if items.len() != types.len() {
                return Err(Error::ArrayLengthMismatch {
                    expected: types.len(),
                    found:    items.len(),
                });
            }
            // Tuples are argument lists: they determine the tail offset.
            let tail_offset = tail_offset + width(typ);
            for (index, (typ, item)) in types.iter().zip(items).enumerate() {
                encode_value(typ, item, tail_offset, head, tail)
                    .map_err(|e| e.at_index(index))?;
            }
            Ok(())
        }

        Type::Enum(cases) => {
            let case = expect_string(value, "string")?;
            let index = cases.iter().position(|c| c == case).ok_or_else(|| {
                Error::UnknownEnumCase {
                    case:     case.to_owned(),
                    expected: cases.iter().join(", "),
                }
            })?;
            head.extend_from_slice(&word_from_usize(index));
            Ok(())
        }

        Type::Struct { fields } => {
            let object = value
                .as_object()
                .ok_or_else(|| wrong_kind("object", value))?;
            if object.len() != fields.len() {
                return Err(Error::StructKeyMismatch {
                    expected: fields.iter().map(|f| f.name.as_str()).join(", "),
                    found:    object.len(),
                });
            }
            for field in fields {
                let item = object.get(&field.name).ok_or_else(|| Error::MissingStructKey {
                    key: field.name.clone(),
                })?;
                encode_value(&field.typ, item, tail_offset, head, tail)
                    .map_err(|e| e.at_key(field.name.as_str()))?;
            }
            Ok(())
        }

        Type::Array { length, element } => {
            let items = expect_array(value, "array")?;
            match length {
                ArrayLength::Dynamic => {
                    // Head takes the offset of the sub-region; the
                    // sub-region is a fresh head/tail block of its own,
                    // prefixed with the element count.
                    head.extend_from_slice(&word_from_usize(tail_offset + tail.len()));
                    tail.extend_from_slice(&word_from_usize(items.len()));

                    let item_width = width(element);
                    let sub_tail_offset = item_width * items.len();
                    let mut sub_head = Vec::with_capacity(sub_tail_offset);
                    let mut sub_tail = Vec::with_capacity(1024);

                    for (index, item) in items.iter().enumerate() {
                        encode_value(element, item, sub_tail_offset, &mut sub_head, &mut sub_tail)
                            .map_err(|e| e.at_index(index))?;
                    }

                    tail.extend_from_slice(&sub_head);
                    tail.extend_from_slice(&sub_tail);
                    Ok(())
                }
                ArrayLength::Fixed(length) => {
                    if items.len() != *length {
                        return Err(Error::ArrayLengthMismatch {
                            expected: *length,
                            found:    items.len(),
                        });
                    }
                    for (index, item) in items.iter().enumerate() {
                        encode_value(element, item, tail_offset, head, tail)
                            .map_err(|e| e.at_index(index))?;
                    }
                    Ok(())
                }
            }
        }

        Type::Elementary(name) => encode_elementary(name, value, tail_offset, head, tail),

        Type::Mapping { .. } | Type::Event { .. } => {
            panic!("{} types cannot be ABI-encoded", typ.solidity_signature())
        }
        Type::Reference(id) => {
            panic!("unresolved type reference {id} reached the encoder")
        }
    }
}

fn encode_elementary(
    name: &str,
    value: &Value,
    tail_offset: usize,
    head: &mut Vec<u8>,
    tail: &mut Vec<u8>,
) -> Result<()> {
    let id = normalize_elementary(name);

    if id.starts_with("fixed") || id.starts_with("ufixed") {
        return Err(Error::UnsupportedFixedPoint);
    }

    if id == "bool" {
        let flag = value
            .as_bool()
            .ok_or_else(|| wrong_kind("boolean", value))?;
        head.extend_from_slice(&word_from_usize(usize::from(flag)));
        return Ok(());
    }

    if let Some((signed, bits)) = integer_parts(id) {
        let word = integer_word(id, signed, bits, value)?;
        head.extend_from_slice(&word);
        return Ok(());
    }

    if id == "bytes" {
        return encode_bytes(value, tail_offset, head, tail);
    }

    if let Some(length) = fixed_bytes_length(id) {
        return encode_fixed_bytes(id, length, value, head);
    }

    panic!("unexpected elementary type in the encoder: {name}")
}

/// Parses an integer argument and renders it as a 32-byte word, two's
/// complement for negative values.
///
/// A JSON number is read from its literal text in base 10; a JSON string
/// must be `0x`-prefixed hex. The admissible range is `[0, 2^M − 1]` for
/// `uintM` and `[−2^(M−1), 2^(M−1) − 1]` for `intM`; hex input always
/// denotes a plain non-negative magnitude.
fn integer_word(
    id: &str,
    signed: bool,
    bits: usize,
    value: &Value,
) -> Result<[u8; WORD_SIZE_BYTES]> {
    let (negative, magnitude, literal) = match value {
        Value::String(text) => {
            let digits = text
                .strip_prefix("0x")
                .ok_or_else(|| Error::MissingHexPrefix {
                    type_name: id.to_owned(),
                })?;
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(Error::MalformedNumber {
                    type_name: id.to_owned(),
                    literal:   text.clone(),
                });
            }
            let magnitude =
                U256::from_str_radix(digits, 16).map_err(|_| Error::ValueOutOfRange {
                    type_name: id.to_owned(),
                    value:     text.clone(),
                })?;
            (false, magnitude, text.clone())
        }

        Value::Number(number) => {
            let literal = number.to_string();
            if literal.contains(['e', 'E', '.']) {
                return Err(Error::ExponentOrDecimal { literal });
            }
            let (negative, digits) = match literal.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, literal.as_str()),
            };
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::MalformedNumber {
                    type_name: id.to_owned(),
                    literal:   literal.clone(),
                });
            }
            let magnitude =
                U256::from_str_radix(digits, 10).map_err(|_| Error::ValueOutOfRange {
                    type_name: id.to_owned(),
                    value:     literal.clone(),
                })?;
            (negative && magnitude != U256::ZERO, magnitude, literal)
        }

        other => return Err(wrong_kind("JSON string or number", other)),
    };

    let out_of_range = || Error::ValueOutOfRange {
        type_name: id.to_owned(),
        value:     literal.clone(),
    };
    if signed {
        let bound = U256::ONE << (bits as u32 - 1);
        if negative && magnitude > bound {
            return Err(out_of_range());
        }
        if !negative && magnitude > bound - U256::ONE {
            return Err(out_of_range());
        }
    } else {
        if negative {
            return Err(out_of_range());
        }
        if bits < MAX_INTEGER_WIDTH_BITS && magnitude >= U256::ONE << (bits as u32) {
            return Err(out_of_range());
        }
    }

    let mut word = magnitude.to_be_bytes();
    if negative {
        twos_complement(&mut word);
    }
    Ok(word)
}

/// Encodes a dynamic byte string: the head takes the tail offset, the tail
/// takes the length word and the payload, zero-padded up to the next word
/// boundary (and not at all when already aligned).
fn encode_bytes(
    value: &Value,
    tail_offset: usize,
    head: &mut Vec<u8>,
    tail: &mut Vec<u8>,
) -> Result<()> {
    let bytes = match value {
        Value::Array(items) => byte_array(items)?,
        Value::String(text) => text.as_bytes().to_vec(),
        other => return Err(wrong_kind("string or array of numbers", other)),
    };

    head.extend_from_slice(&word_from_usize(tail_offset + tail.len()));
    tail.extend_from_slice(&word_from_usize(bytes.len()));
    tail.extend_from_slice(&bytes);

    let padding = (WORD_SIZE_BYTES - bytes.len() % WORD_SIZE_BYTES) % WORD_SIZE_BYTES;
    tail.extend(iter::repeat(0u8).take(padding));
    Ok(())
}

/// Encodes a `bytesN` value into a single word, left-aligned and
/// zero-padded on the right.
fn encode_fixed_bytes(id: &str, length: usize, value: &Value, head: &mut Vec<u8>) -> Result<()> {
    let mut word = [0u8; WORD_SIZE_BYTES];
    match value {
        Value::Array(items) => {
            if items.len() != length {
                return Err(Error::ArrayLengthMismatch {
                    expected: length,
                    found:    items.len(),
                });
            }
            let bytes = byte_array(items)?;
            word[..length].copy_from_slice(&bytes);
        }
        Value::String(text) => {
            let bytes = text.as_bytes();
            if bytes.len() > length {
                return Err(Error::StringTooLong {
                    type_name: id.to_owned(),
                    found:     bytes.len(),
                });
            }
            word[..bytes.len()].copy_from_slice(bytes);
        }
        other => return Err(wrong_kind("string or array of numbers", other)),
    }
    head.extend_from_slice(&word);
    Ok(())
}

/// Reads a JSON array of numbers as raw bytes, rejecting anything outside
/// `0..=255`.
fn byte_array(items: &[Value]) -> Result<Vec<u8>> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let number = item
                .as_u64()
                .ok_or_else(|| wrong_kind("byte number", item).at_index(index))?;
            u8::try_from(number).map_err(|_| {
                Error::ByteOutOfRange {
                    value: number.to_string(),
                }
                .at_index(index)
            })
        })
        .collect()
}

fn expect_array<'a>(value: &'a Value, expected: &str) -> Result<&'a Vec<Value>> {
    value.as_array().ok_or_else(|| wrong_kind(expected, value))
}

fn expect_string<'a>(value: &'a Value, expected: &str) -> Result<&'a str> {
    value.as_str().ok_or_else(|| wrong_kind(expected, value))
}

fn wrong_kind(expected: &str, found: &Value) -> Error {
    Error::WrongJsonKind {
        expected: expected.to_owned(),
        found:    json_kind(found).to_owned(),
    }
}

/// Names a JSON value's kind for error messages.
fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
