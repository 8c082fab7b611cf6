//! This module contains the ABI decoder: it turns the return buffer of a
//! contract call back into a JSON value, given the type that produced it.
//!
//! The decoder tracks the absolute byte offset of the head slot it is
//! positioned at within the enclosing argument region, because the pointers
//! stored in dynamic head slots are absolute within that region. A buffer
//! that was produced for a different type, truncated, or corrupted yields a
//! [`crate::error::decode::Error`] — never a panic, out-of-bounds read, or
//! unbounded allocation.

use ethnum::U256;
use serde_json::{Map, Value};

use crate::{
    codec::{
        bit_length,
        fixed_bytes_length,
        integer_parts,
        normalize_elementary,
        twos_complement,
        width,
    },
    constant::{DECIMAL_RENDER_MAX_BITS, WORD_SIZE_BYTES},
    error::decode::{Error, Result},
    types::{ArrayLength, Type},
};

/// Decodes the ABI buffer `code` back into the JSON value it encodes for
/// the type `typ`.
///
/// Integers are rendered as decimal JSON numbers when they fit in 32 bits
/// and as minimal lowercase `"0x…"` hex strings otherwise; byte payloads
/// become JSON strings when they are valid UTF-8 and arrays of numbers when
/// they are not.
///
/// # Errors
///
/// Returns an [`Error`] when the buffer is too short for the type, when a
/// stored pointer or length is inconsistent with the bytes present, or when
/// a word holds a value its type cannot (an out-of-range enum index, a
/// boolean other than 0 or 1).
///
/// # Panics
///
/// Panics when `typ` is (or contains, in a decodable position) a
/// [`Type::Mapping`], [`Type::Event`] or unresolved [`Type::Reference`]:
/// those cannot be decoded and indicate a bug in the caller, not bad input.
pub fn decode(typ: &Type, code: &[u8]) -> Result<Value> {
    let (value, _) = decode_value(typ, code, 0)?;
    Ok(value)
}

/// Decodes one value whose head begins at the start of `code`, `offset`
/// bytes into the enclosing argument region. Returns the value and the
/// remainder of `code` past the head bytes consumed.
fn decode_value<'a>(typ: &Type, code: &'a [u8], offset: usize) -> Result<(Value, &'a [u8])> {
    match typ {
        Type::Named { inner, .. } => decode_value(inner, code, offset),

        Type::ContractAddress(_) | Type::InterfaceAddress(_) | Type::LibraryAddress(_) => {
            decode_elementary("address", code, offset)
        }

        Type::Enum(cases) => {
            let word = take_word(code)?;
            let index = U256::from_be_bytes(word);
            let in_range = bit_length(index) <= usize::BITS as usize
                && (index.as_u128() as usize) < cases.len();
            if !in_range {
                return Err(Error::EnumIndexOutOfRange {
                    index: index.to_string(),
                    count: cases.len(),
                });
            }
            let case = cases[index.as_u128() as usize].clone();
            Ok((Value::String(case), &code[WORD_SIZE_BYTES..]))
        }

        Type::Tuple(types) => {
            let mut out = Vec::with_capacity(types.len());
            let mut code = code;
            let mut offset = offset;
            for typ in types {
                let (value, rest) = decode_value(typ, code, offset)?;
                offset += code.len() - rest.len();
                code = rest;
                out.push(value);
            }
            Ok((Value::Array(out), code))
        }

        Type::Struct { fields } => {
            let mut out = Map::new();
            let mut code = code;
            let mut offset = offset;
            for field in fields {
                let (value, rest) = decode_value(&field.typ, code, offset)?;
                offset += code.len() - rest.len();
                code = rest;
                out.insert(field.name.clone(), value);
            }
            Ok((Value::Object(out), code))
        }

        Type::Array { length, element } => match length {
            ArrayLength::Dynamic => {
                let pointer = take_word(code)?;
                let (body, length) = dynamic_region(pointer, code, offset)?;

                // Bound the claimed element count by the bytes actually
                // present before allocating anything proportional to it.
                let in_bounds = length
                    .checked_mul(width(element))
                    .is_some_and(|needed| needed <= body.len());
                if !in_bounds {
                    return Err(Error::LengthOutOfBounds {
                        length:    length.to_string(),
                        available: body.len(),
                    });
                }

                let items = Type::Tuple(vec![(**element).clone(); length]);
                // The inner region restarts its offsets: this is what makes
                // multi-dimensional arrays come out right.
                let (value, _) = decode_value(&items, body, 0)?;
                Ok((value, &code[WORD_SIZE_BYTES..]))
            }
            ArrayLength::Fixed(0) => Ok((Value::Array(vec![]), code)),
            ArrayLength::Fixed(length) => {
                let mut out = Vec::with_capacity(*length);
                let mut code = code;
                let mut offset = offset;
                for _ in 0..*length {
                    let (value, rest) = decode_value(element, code, offset)?;
                    offset += code.len() - rest.len();
                    code = rest;
                    out.push(value);
                }
                Ok((Value::Array(out), code))
            }
        },

        Type::Elementary(name) => decode_elementary(name, code, offset),

        Type::Mapping { .. } | Type::Event { .. } => {
            panic!("{} types cannot be ABI-decoded", typ.solidity_signature())
        }
        Type::Reference(id) => {
            panic!("unresolved type reference {id} reached the decoder")
        }
    }
}

fn decode_elementary<'a>(name: &str, code: &'a [u8], offset: usize) -> Result<(Value, &'a [u8])> {
    let id = normalize_elementary(name);

    if id.starts_with("fixed") || id.starts_with("ufixed") {
        return Err(Error::UnsupportedFixedPoint);
    }

    if id == "bool" {
        let word = take_word(code)?;
        let value = U256::from_be_bytes(word);
        let flag = if value == U256::ZERO {
            false
        } else if value == U256::ONE {
            true
        } else {
            return Err(Error::MalformedBool {
                value: value.to_string(),
            });
        };
        return Ok((Value::Bool(flag), &code[WORD_SIZE_BYTES..]));
    }

    if let Some((signed, _)) = integer_parts(id) {
        let word = take_word(code)?;
        let unsigned = U256::from_be_bytes(word);

        if !signed || word[0] & 0x80 == 0 {
            return Ok((render_unsigned(unsigned), &code[WORD_SIZE_BYTES..]));
        }

        // Bit 255 is set on a signed type: negate and render the magnitude,
        // falling back to the raw unsigned hex when it is too wide for a
        // JSON number.
        let mut magnitude = word;
        twos_complement(&mut magnitude);
        let magnitude = U256::from_be_bytes(magnitude);
        let rendered = if bit_length(magnitude) > DECIMAL_RENDER_MAX_BITS {
            Value::String(format!("0x{unsigned:x}"))
        } else {
            Value::from(-(magnitude.as_u128() as i64))
        };
        return Ok((rendered, &code[WORD_SIZE_BYTES..]));
    }

    if id == "bytes" {
        let pointer = take_word(code)?;
        let (body, length) = dynamic_region(pointer, code, offset)?;
        return Ok((render_bytes(&body[..length]), &code[WORD_SIZE_BYTES..]));
    }

    if let Some(length) = fixed_bytes_length(id) {
        let word = take_word(code)?;
        return Ok((render_bytes(&word[..length]), &code[WORD_SIZE_BYTES..]));
    }

    panic!("unexpected elementary type in the decoder: {name}")
}

/// Follows the `pointer` stored in a head slot at `offset` into the region
/// `code` belongs to, returning the pointed-to bytes past their length
/// prefix together with the decoded length.
fn dynamic_region<'a>(
    pointer: [u8; WORD_SIZE_BYTES],
    code: &'a [u8],
    offset: usize,
) -> Result<(&'a [u8], usize)> {
    let pointer = U256::from_be_bytes(pointer);
    let start = checked_usize(pointer)
        .and_then(|p| p.checked_sub(offset))
        .ok_or_else(|| Error::InconsistentPointer {
            pointer: pointer.to_string(),
            offset,
        })?;
    let tail = code.get(start..).ok_or_else(|| Error::InconsistentPointer {
        pointer: pointer.to_string(),
        offset,
    })?;

    let length = U256::from_be_bytes(take_word(tail)?);
    let body = &tail[WORD_SIZE_BYTES..];
    let length = checked_usize(length)
        .filter(|length| *length <= body.len())
        .ok_or_else(|| Error::LengthOutOfBounds {
            length:    length.to_string(),
            available: body.len(),
        })?;
    Ok((body, length))
}

/// Reads the 32-byte word at the start of `code`.
fn take_word(code: &[u8]) -> Result<[u8; WORD_SIZE_BYTES]> {
    let bytes = code
        .get(..WORD_SIZE_BYTES)
        .ok_or(Error::BufferTooShort {
            needed:    WORD_SIZE_BYTES,
            available: code.len(),
        })?;
    Ok(bytes.try_into().expect("a 32-byte slice converts exactly"))
}

fn checked_usize(value: U256) -> Option<usize> {
    (bit_length(value) <= usize::BITS as usize).then(|| value.as_u128() as usize)
}

fn render_unsigned(value: U256) -> Value {
    if bit_length(value) <= DECIMAL_RENDER_MAX_BITS {
        Value::from(value.as_u128() as u64)
    } else {
        Value::String(format!("0x{value:x}"))
    }
}

/// Renders a byte payload as a JSON string when it is valid UTF-8 and as an
/// array of byte numbers when it is not.
fn render_bytes(bytes: &[u8]) -> Value {
    match std::str::from_utf8(bytes) {
        Ok(text) => Value::String(text.to_owned()),
        Err(_) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}
