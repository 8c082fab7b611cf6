//! This module contains constants that are needed throughout the codebase.

/// The size of a word in the ABI encoding, in bytes.
///
/// Every head slot is exactly this wide, and the tail region only ever grows
/// in multiples of it.
pub const WORD_SIZE_BYTES: usize = 32;

/// The size of a function selector in bytes.
///
/// A call payload is the selector followed by the ABI encoding of the
/// function's argument tuple.
pub const SELECTOR_SIZE_BYTES: usize = 4;

/// The number of bits in a byte.
pub const BYTE_SIZE_BITS: usize = 8;

/// The maximum width of a Solidity integer type in bits.
pub const MAX_INTEGER_WIDTH_BITS: usize = 256;

/// The largest bit length for which the decoder renders an integer as a
/// decimal JSON number.
///
/// Values wider than this are rendered as `"0x…"` hex strings, as
/// JavaScript-style consumers cannot represent them exactly as numbers.
/// Both sides of the bridge must agree on this boundary for round-trips to
/// be stable.
pub const DECIMAL_RENDER_MAX_BITS: usize = 32;
