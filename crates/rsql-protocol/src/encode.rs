//! Append-style message-pack encoder.
//!
//! Each function appends one encoded value to a growable byte buffer.
//! Integers always take the smallest representation that fits; non-negative
//! signed values share the unsigned bands, so a one-byte positive fixint
//! covers 0..=127 regardless of signedness.
//!
//! # Panics
//!
//! All length-prefixed forms panic if the payload length exceeds
//! `u32::MAX` bytes; such a value cannot be represented on the wire and the
//! stream would be corrupt either way.

use bytes::{BufMut, BytesMut};

use crate::marker;

/// Append a nil value.
pub fn append_nil(dst: &mut BytesMut) {
    dst.put_u8(marker::NIL);
}

/// Append a boolean.
pub fn append_bool(dst: &mut BytesMut, val: bool) {
    dst.put_u8(if val { marker::TRUE } else { marker::FALSE });
}

/// Append an unsigned integer in the smallest encoding that fits.
pub fn append_uint64(dst: &mut BytesMut, val: u64) {
    match val {
        0..=127 => dst.put_u8(val as u8), // positive fixint
        128..=0xff => {
            dst.put_u8(marker::UINT8);
            dst.put_u8(val as u8);
        }
        0x100..=0xffff => {
            dst.put_u8(marker::UINT16);
            dst.put_u16(val as u16);
        }
        0x1_0000..=0xffff_ffff => {
            dst.put_u8(marker::UINT32);
            dst.put_u32(val as u32);
        }
        _ => {
            dst.put_u8(marker::UINT64);
            dst.put_u64(val);
        }
    }
}

/// Append an unsigned 8-bit integer.
pub fn append_uint8(dst: &mut BytesMut, val: u8) {
    append_uint64(dst, u64::from(val));
}

/// Append an unsigned 16-bit integer.
pub fn append_uint16(dst: &mut BytesMut, val: u16) {
    append_uint64(dst, u64::from(val));
}

/// Append an unsigned 32-bit integer.
pub fn append_uint32(dst: &mut BytesMut, val: u32) {
    append_uint64(dst, u64::from(val));
}

/// Append a signed integer in the smallest encoding that fits.
///
/// Non-negative values use the unsigned bands.
pub fn append_int64(dst: &mut BytesMut, val: i64) {
    if val >= 0 {
        append_uint64(dst, val as u64);
        return;
    }

    if val >= -32 {
        dst.put_u8(val as u8); // negative fixint
    } else if val >= i64::from(i8::MIN) {
        dst.put_u8(marker::INT8);
        dst.put_i8(val as i8);
    } else if val >= i64::from(i16::MIN) {
        dst.put_u8(marker::INT16);
        dst.put_i16(val as i16);
    } else if val >= i64::from(i32::MIN) {
        dst.put_u8(marker::INT32);
        dst.put_i32(val as i32);
    } else {
        dst.put_u8(marker::INT64);
        dst.put_i64(val);
    }
}

/// Append a signed 8-bit integer.
pub fn append_int8(dst: &mut BytesMut, val: i8) {
    append_int64(dst, i64::from(val));
}

/// Append a signed 16-bit integer.
pub fn append_int16(dst: &mut BytesMut, val: i16) {
    append_int64(dst, i64::from(val));
}

/// Append a signed 32-bit integer.
pub fn append_int32(dst: &mut BytesMut, val: i32) {
    append_int64(dst, i64::from(val));
}

/// Append a single precision float as its big-endian bit pattern.
pub fn append_float32(dst: &mut BytesMut, val: f32) {
    dst.put_u8(marker::FLOAT32);
    dst.put_u32(val.to_bits());
}

/// Append a double precision float as its big-endian bit pattern.
pub fn append_float64(dst: &mut BytesMut, val: f64) {
    dst.put_u8(marker::FLOAT64);
    dst.put_u64(val.to_bits());
}

/// Append a string header for a payload of `len` bytes.
pub fn append_str_header(dst: &mut BytesMut, len: u32) {
    match len {
        0..=31 => dst.put_u8(marker::FIXSTR_BASE | len as u8),
        32..=0xff => {
            dst.put_u8(marker::STR8);
            dst.put_u8(len as u8);
        }
        0x100..=0xffff => {
            dst.put_u8(marker::STR16);
            dst.put_u16(len as u16);
        }
        _ => {
            dst.put_u8(marker::STR32);
            dst.put_u32(len);
        }
    }
}

/// Append a string value.
pub fn append_str(dst: &mut BytesMut, val: &str) {
    append_str_bytes(dst, val.as_bytes());
}

/// Append a string value supplied as raw bytes.
pub fn append_str_bytes(dst: &mut BytesMut, val: &[u8]) {
    let len = u32::try_from(val.len()).expect("string too long for message-pack");
    append_str_header(dst, len);
    dst.put_slice(val);
}

/// Append a binary header for a payload of `len` bytes.
///
/// Binary never uses the fixstr form; even an empty payload takes a bin8
/// header.
pub fn append_bin_header(dst: &mut BytesMut, len: u32) {
    match len {
        0..=0xff => {
            dst.put_u8(marker::BIN8);
            dst.put_u8(len as u8);
        }
        0x100..=0xffff => {
            dst.put_u8(marker::BIN16);
            dst.put_u16(len as u16);
        }
        _ => {
            dst.put_u8(marker::BIN32);
            dst.put_u32(len);
        }
    }
}

/// Append a binary value.
pub fn append_bin(dst: &mut BytesMut, val: &[u8]) {
    let len = u32::try_from(val.len()).expect("byte slice too long for message-pack");
    append_bin_header(dst, len);
    dst.put_slice(val);
}

/// Append an array header for `len` elements.
pub fn append_array_header(dst: &mut BytesMut, len: u32) {
    match len {
        0..=15 => dst.put_u8(marker::FIXARRAY_BASE | len as u8),
        16..=0xffff => {
            dst.put_u8(marker::ARRAY16);
            dst.put_u16(len as u16);
        }
        _ => {
            dst.put_u8(marker::ARRAY32);
            dst.put_u32(len);
        }
    }
}

/// Append a map header for `len` key/value pairs.
pub fn append_map_header(dst: &mut BytesMut, len: u32) {
    match len {
        0..=15 => dst.put_u8(marker::FIXMAP_BASE | len as u8),
        16..=0xffff => {
            dst.put_u8(marker::MAP16);
            dst.put_u16(len as u16);
        }
        _ => {
            dst.put_u8(marker::MAP32);
            dst.put_u32(len);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encoded_uint(val: u64) -> BytesMut {
        let mut buf = BytesMut::new();
        append_uint64(&mut buf, val);
        buf
    }

    fn encoded_int(val: i64) -> BytesMut {
        let mut buf = BytesMut::new();
        append_int64(&mut buf, val);
        buf
    }

    #[test]
    fn test_uint_band_widths() {
        // (value, encoded length) per band boundary
        let cases: &[(u64, usize)] = &[
            (0, 1),
            (127, 1),
            (128, 2),
            (255, 2),
            (256, 3),
            (65_535, 3),
            (65_536, 5),
            (u64::from(u32::MAX), 5),
            (u64::from(u32::MAX) + 1, 9),
            (u64::MAX, 9),
        ];
        for &(val, len) in cases {
            assert_eq!(encoded_uint(val).len(), len, "value {val}");
        }
    }

    #[test]
    fn test_int_band_widths_negative() {
        let cases: &[(i64, usize)] = &[
            (-1, 1),
            (-32, 1),
            (-33, 2),
            (-128, 2),
            (-129, 3),
            (-32_768, 3),
            (-32_769, 5),
            (i64::from(i32::MIN), 5),
            (i64::from(i32::MIN) - 1, 9),
            (i64::MIN, 9),
        ];
        for &(val, len) in cases {
            assert_eq!(encoded_int(val).len(), len, "value {val}");
        }
    }

    #[test]
    fn test_positive_int_uses_unsigned_bands() {
        assert_eq!(encoded_int(0).len(), 1);
        assert_eq!(encoded_int(127).len(), 1);
        assert_eq!(encoded_int(128).len(), 2);
        assert_eq!(encoded_int(i64::MAX).len(), 9);
        // Same bytes as the unsigned encoding
        assert_eq!(&encoded_int(300)[..], &encoded_uint(300)[..]);
    }

    #[test]
    fn test_str_header_bands() {
        let lengths: &[(u32, usize)] = &[(0, 1), (31, 1), (32, 2), (255, 2), (256, 3), (65_535, 3), (65_536, 5)];
        for &(len, header) in lengths {
            let mut buf = BytesMut::new();
            append_str_header(&mut buf, len);
            assert_eq!(buf.len(), header, "length {len}");
        }
    }

    #[test]
    fn test_bin_never_uses_fixstr() {
        let mut buf = BytesMut::new();
        append_bin(&mut buf, b"");
        assert_eq!(&buf[..], &[crate::marker::BIN8, 0]);
    }

    #[test]
    fn test_container_header_bands() {
        for &(len, header) in &[(0u32, 1usize), (15, 1), (16, 3), (65_535, 3), (65_536, 5)] {
            let mut arr = BytesMut::new();
            append_array_header(&mut arr, len);
            assert_eq!(arr.len(), header, "array length {len}");

            let mut map = BytesMut::new();
            append_map_header(&mut map, len);
            assert_eq!(map.len(), header, "map length {len}");
        }
    }

    #[test]
    fn test_float_bit_patterns() {
        let mut buf = BytesMut::new();
        append_float64(&mut buf, 1.5);
        assert_eq!(buf[0], crate::marker::FLOAT64);
        assert_eq!(&buf[1..], &1.5f64.to_bits().to_be_bytes());
    }
}
