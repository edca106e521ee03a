//! Message-pack type-marker bytes.
//!
//! One-byte markers identify the encoding of the value that follows. The
//! fix-variants pack a small payload into the marker byte itself, so only
//! the masked high bits are significant.

/// Nil.
pub const NIL: u8 = 0xc0;
/// Boolean false.
pub const FALSE: u8 = 0xc2;
/// Boolean true.
pub const TRUE: u8 = 0xc3;
/// Unsigned 8-bit integer.
pub const UINT8: u8 = 0xcc;
/// Unsigned 16-bit integer, big-endian.
pub const UINT16: u8 = 0xcd;
/// Unsigned 32-bit integer, big-endian.
pub const UINT32: u8 = 0xce;
/// Unsigned 64-bit integer, big-endian.
pub const UINT64: u8 = 0xcf;
/// Signed 8-bit integer.
pub const INT8: u8 = 0xd0;
/// Signed 16-bit integer, big-endian.
pub const INT16: u8 = 0xd1;
/// Signed 32-bit integer, big-endian.
pub const INT32: u8 = 0xd2;
/// Signed 64-bit integer, big-endian.
pub const INT64: u8 = 0xd3;
/// IEEE-754 single precision float, big-endian bit pattern.
pub const FLOAT32: u8 = 0xca;
/// IEEE-754 double precision float, big-endian bit pattern.
pub const FLOAT64: u8 = 0xcb;
/// Fixstr base marker; the 5 low bits carry the length (0..=31).
pub const FIXSTR_BASE: u8 = 0xa0;
/// String with 8-bit length prefix.
pub const STR8: u8 = 0xd9;
/// String with 16-bit length prefix.
pub const STR16: u8 = 0xda;
/// String with 32-bit length prefix.
pub const STR32: u8 = 0xdb;
/// Binary with 8-bit length prefix.
pub const BIN8: u8 = 0xc4;
/// Binary with 16-bit length prefix.
pub const BIN16: u8 = 0xc5;
/// Binary with 32-bit length prefix.
pub const BIN32: u8 = 0xc6;
/// Fixarray base marker; the 4 low bits carry the length (0..=15).
pub const FIXARRAY_BASE: u8 = 0x90;
/// Array with 16-bit length prefix.
pub const ARRAY16: u8 = 0xdc;
/// Array with 32-bit length prefix.
pub const ARRAY32: u8 = 0xdd;
/// Fixmap base marker; the 4 low bits carry the entry count (0..=15).
pub const FIXMAP_BASE: u8 = 0x80;
/// Map with 16-bit entry count prefix.
pub const MAP16: u8 = 0xde;
/// Map with 32-bit entry count prefix.
pub const MAP32: u8 = 0xdf;
/// Negative fixint base; 0xe0..=0xff encode -32..=-1.
pub const NEGATIVE_FIXINT_BASE: u8 = 0xe0;

/// Mask selecting the fixstr marker bits (3 MSB).
pub const FIXSTR_MASK: u8 = 0xe0;
/// Mask selecting the fixarray marker bits (4 MSB).
pub const FIXARRAY_MASK: u8 = 0xf0;
/// Mask selecting the fixmap marker bits (4 MSB).
pub const FIXMAP_MASK: u8 = 0xf0;
