//! Pull-style message-pack reader over a buffered transport.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use rsql_protocol::{marker, wire_type, ProtocolError, WireType};

use crate::error::{CodecError, Result};

const SCRATCH_DEFAULT_CAPACITY: usize = 1024;

/// Reads message-pack values from a buffered transport.
///
/// Every read method either consumes a complete value or fails; after a
/// failure the stream position is undefined and the connection must be torn
/// down. Width-narrowed integer reads delegate to the widest form and fail
/// with an overflow error when the decoded value is out of range, without
/// consuming extra bytes from the stream.
///
/// String reads share an internal scratch buffer; [`MessageReader::read_string`]
/// materializes an owned copy for the caller.
pub struct MessageReader<R> {
    inner: BufReader<R>,
    scratch: Vec<u8>,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    /// Wrap a transport in a buffered message-pack reader.
    pub fn new(transport: R) -> Self {
        Self {
            inner: BufReader::new(transport),
            scratch: Vec::with_capacity(SCRATCH_DEFAULT_CAPACITY),
        }
    }

    /// Classify the next value by peeking one byte without consuming it.
    pub async fn peek_type(&mut self) -> Result<WireType> {
        let prefix = self.peek_byte().await?;
        Ok(wire_type::classify(prefix))
    }

    async fn peek_byte(&mut self) -> Result<u8> {
        let buf = self.inner.fill_buf().await?;
        match buf.first() {
            Some(&b) => Ok(b),
            None => Err(CodecError::ConnectionClosed),
        }
    }

    async fn read_prefix(&mut self) -> Result<u8> {
        Ok(self.inner.read_u8().await?)
    }

    /// Consume a nil value.
    pub async fn read_nil(&mut self) -> Result<()> {
        let prefix = self.read_prefix().await?;
        if prefix == marker::NIL {
            Ok(())
        } else {
            Err(ProtocolError::BadPrefix { op: "read nil", prefix }.into())
        }
    }

    /// Consume a boolean value.
    pub async fn read_bool(&mut self) -> Result<bool> {
        let prefix = self.read_prefix().await?;
        match prefix {
            marker::FALSE => Ok(false),
            marker::TRUE => Ok(true),
            _ => Err(ProtocolError::BadPrefix { op: "read bool", prefix }.into()),
        }
    }

    /// Consume an unsigned integer of any encoded width.
    pub async fn read_uint64(&mut self) -> Result<u64> {
        let prefix = self.read_prefix().await?;

        if prefix <= 127 {
            return Ok(u64::from(prefix)); // positive fixint
        }

        match prefix {
            marker::UINT8 => Ok(u64::from(self.inner.read_u8().await?)),
            marker::UINT16 => Ok(u64::from(self.inner.read_u16().await?)),
            marker::UINT32 => Ok(u64::from(self.inner.read_u32().await?)),
            marker::UINT64 => Ok(self.inner.read_u64().await?),
            _ => Err(ProtocolError::BadPrefix { op: "read uint", prefix }.into()),
        }
    }

    /// Consume an unsigned integer that must fit in 8 bits.
    pub async fn read_uint8(&mut self) -> Result<u8> {
        let value = self.read_uint64().await?;
        u8::try_from(value)
            .map_err(|_| ProtocolError::UintOverflow { op: "read uint8", value }.into())
    }

    /// Consume an unsigned integer that must fit in 16 bits.
    pub async fn read_uint16(&mut self) -> Result<u16> {
        let value = self.read_uint64().await?;
        u16::try_from(value)
            .map_err(|_| ProtocolError::UintOverflow { op: "read uint16", value }.into())
    }

    /// Consume an unsigned integer that must fit in 32 bits.
    pub async fn read_uint32(&mut self) -> Result<u32> {
        let value = self.read_uint64().await?;
        u32::try_from(value)
            .map_err(|_| ProtocolError::UintOverflow { op: "read uint32", value }.into())
    }

    /// Consume a signed integer of any encoded width.
    ///
    /// Non-negative values may arrive in the unsigned encodings (the encoder
    /// uses the unsigned bands for them), so the `uint*` markers are accepted
    /// here as long as the value fits in `i64`.
    pub async fn read_int64(&mut self) -> Result<i64> {
        let prefix = self.read_prefix().await?;

        if prefix <= 127 {
            return Ok(i64::from(prefix)); // positive fixint
        }
        if prefix >= marker::NEGATIVE_FIXINT_BASE {
            return Ok(i64::from(prefix as i8)); // negative fixint
        }

        match prefix {
            marker::INT8 => Ok(i64::from(self.inner.read_i8().await?)),
            marker::INT16 => Ok(i64::from(self.inner.read_i16().await?)),
            marker::INT32 => Ok(i64::from(self.inner.read_i32().await?)),
            marker::INT64 => Ok(self.inner.read_i64().await?),
            marker::UINT8 => Ok(i64::from(self.inner.read_u8().await?)),
            marker::UINT16 => Ok(i64::from(self.inner.read_u16().await?)),
            marker::UINT32 => Ok(i64::from(self.inner.read_u32().await?)),
            marker::UINT64 => {
                let value = self.inner.read_u64().await?;
                i64::try_from(value)
                    .map_err(|_| ProtocolError::UintOverflow { op: "read int", value }.into())
            }
            _ => Err(ProtocolError::BadPrefix { op: "read int", prefix }.into()),
        }
    }

    /// Consume a signed integer that must fit in 8 bits.
    pub async fn read_int8(&mut self) -> Result<i8> {
        let value = self.read_int64().await?;
        i8::try_from(value)
            .map_err(|_| ProtocolError::IntOverflow { op: "read int8", value }.into())
    }

    /// Consume a signed integer that must fit in 16 bits.
    pub async fn read_int16(&mut self) -> Result<i16> {
        let value = self.read_int64().await?;
        i16::try_from(value)
            .map_err(|_| ProtocolError::IntOverflow { op: "read int16", value }.into())
    }

    /// Consume a signed integer that must fit in 32 bits.
    pub async fn read_int32(&mut self) -> Result<i32> {
        let value = self.read_int64().await?;
        i32::try_from(value)
            .map_err(|_| ProtocolError::IntOverflow { op: "read int32", value }.into())
    }

    /// Consume a single precision float.
    pub async fn read_float32(&mut self) -> Result<f32> {
        let prefix = self.read_prefix().await?;
        if prefix != marker::FLOAT32 {
            return Err(ProtocolError::BadPrefix { op: "read float32", prefix }.into());
        }
        Ok(f32::from_bits(self.inner.read_u32().await?))
    }

    /// Consume a double precision float.
    pub async fn read_float64(&mut self) -> Result<f64> {
        let prefix = self.read_prefix().await?;
        if prefix != marker::FLOAT64 {
            return Err(ProtocolError::BadPrefix { op: "read float64", prefix }.into());
        }
        Ok(f64::from_bits(self.inner.read_u64().await?))
    }

    /// Consume a string header, returning the payload byte length.
    pub async fn read_str_header(&mut self) -> Result<u32> {
        let prefix = self.read_prefix().await?;

        if prefix & marker::FIXSTR_MASK == marker::FIXSTR_BASE {
            return Ok(u32::from(prefix & 0x1f));
        }

        match prefix {
            marker::STR8 => Ok(u32::from(self.inner.read_u8().await?)),
            marker::STR16 => Ok(u32::from(self.inner.read_u16().await?)),
            marker::STR32 => Ok(self.inner.read_u32().await?),
            _ => Err(ProtocolError::BadPrefix { op: "read string", prefix }.into()),
        }
    }

    /// Consume a binary header, returning the payload byte length.
    pub async fn read_bin_header(&mut self) -> Result<u32> {
        let prefix = self.read_prefix().await?;
        match prefix {
            marker::BIN8 => Ok(u32::from(self.inner.read_u8().await?)),
            marker::BIN16 => Ok(u32::from(self.inner.read_u16().await?)),
            marker::BIN32 => Ok(self.inner.read_u32().await?),
            _ => Err(ProtocolError::BadPrefix { op: "read bin", prefix }.into()),
        }
    }

    /// Consume an array header, returning the element count.
    pub async fn read_array_header(&mut self) -> Result<u32> {
        let prefix = self.read_prefix().await?;

        if prefix & marker::FIXARRAY_MASK == marker::FIXARRAY_BASE {
            return Ok(u32::from(prefix & 0x0f));
        }

        match prefix {
            marker::ARRAY16 => Ok(u32::from(self.inner.read_u16().await?)),
            marker::ARRAY32 => Ok(self.inner.read_u32().await?),
            _ => Err(ProtocolError::BadPrefix { op: "read array", prefix }.into()),
        }
    }

    /// Consume a map header, returning the entry count.
    pub async fn read_map_header(&mut self) -> Result<u32> {
        let prefix = self.read_prefix().await?;

        if prefix & marker::FIXMAP_MASK == marker::FIXMAP_BASE {
            return Ok(u32::from(prefix & 0x0f));
        }

        match prefix {
            marker::MAP16 => Ok(u32::from(self.inner.read_u16().await?)),
            marker::MAP32 => Ok(self.inner.read_u32().await?),
            _ => Err(ProtocolError::BadPrefix { op: "read map", prefix }.into()),
        }
    }

    /// Consume a string, materializing an owned copy.
    ///
    /// The payload passes through the internal scratch buffer; invalid UTF-8
    /// sequences are replaced rather than rejected.
    pub async fn read_string(&mut self) -> Result<String> {
        let len = self.read_str_header().await? as usize;

        let mut scratch = std::mem::take(&mut self.scratch);
        let filled = self.fill_exact(&mut scratch, len).await;
        let out = match filled {
            Ok(()) => Ok(String::from_utf8_lossy(&scratch).into_owned()),
            Err(e) => Err(e),
        };
        self.scratch = scratch;
        out
    }

    /// Consume a string payload into `dest`, reusing its capacity.
    pub async fn read_string_into(&mut self, dest: &mut Vec<u8>) -> Result<()> {
        let len = self.read_str_header().await? as usize;
        self.fill_exact(dest, len).await
    }

    /// Consume a binary payload into `dest`, reusing its capacity.
    pub async fn read_bytes_into(&mut self, dest: &mut Vec<u8>) -> Result<()> {
        let len = self.read_bin_header().await? as usize;
        self.fill_exact(dest, len).await
    }

    /// Consume and discard one complete value, recursing through containers.
    pub async fn skip_value(&mut self) -> Result<()> {
        // pending counts values not yet consumed; containers push their
        // children onto the count instead of recursing
        let mut pending: u64 = 1;

        while pending > 0 {
            pending -= 1;

            match self.peek_type().await? {
                WireType::Nil => self.read_nil().await?,
                WireType::Bool => {
                    self.read_bool().await?;
                }
                WireType::Uint => {
                    self.read_uint64().await?;
                }
                WireType::Int => {
                    self.read_int64().await?;
                }
                WireType::Float32 => {
                    self.read_float32().await?;
                }
                WireType::Float64 => {
                    self.read_float64().await?;
                }
                WireType::Str => {
                    let len = self.read_str_header().await? as usize;
                    self.discard_exact(len).await?;
                }
                WireType::Bin => {
                    let len = self.read_bin_header().await? as usize;
                    self.discard_exact(len).await?;
                }
                WireType::Array => {
                    let len = self.read_array_header().await?;
                    pending += u64::from(len);
                }
                WireType::Map => {
                    let len = self.read_map_header().await?;
                    pending += 2 * u64::from(len);
                }
                WireType::Invalid => {
                    let prefix = self.peek_byte().await?;
                    return Err(ProtocolError::BadPrefix { op: "skip value", prefix }.into());
                }
            }
        }

        Ok(())
    }

    async fn fill_exact(&mut self, dest: &mut Vec<u8>, len: usize) -> Result<()> {
        dest.clear();
        dest.resize(len, 0);
        self.inner.read_exact(dest).await?;
        Ok(())
    }

    async fn discard_exact(&mut self, len: usize) -> Result<()> {
        let mut scratch = std::mem::take(&mut self.scratch);
        let result = self.fill_exact(&mut scratch, len).await;
        self.scratch = scratch;
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use rsql_protocol::encode;

    fn reader(buf: &BytesMut) -> MessageReader<&[u8]> {
        MessageReader::new(&buf[..])
    }

    #[tokio::test]
    async fn test_uint_roundtrip_boundaries() {
        let values: &[u64] = &[
            0,
            127,
            128,
            255,
            256,
            65_535,
            65_536,
            u64::from(u32::MAX),
            u64::from(u32::MAX) + 1,
            u64::MAX,
        ];
        let mut buf = BytesMut::new();
        for &v in values {
            encode::append_uint64(&mut buf, v);
        }

        let mut r = reader(&buf);
        for &v in values {
            assert_eq!(r.read_uint64().await.unwrap(), v);
        }
    }

    #[tokio::test]
    async fn test_int_roundtrip_boundaries() {
        let values: &[i64] = &[
            0,
            127,
            128,
            -1,
            -32,
            -33,
            -128,
            -129,
            -32_768,
            -32_769,
            i64::from(i32::MIN),
            i64::from(i32::MIN) - 1,
            i64::MIN,
            i64::MAX,
        ];
        let mut buf = BytesMut::new();
        for &v in values {
            encode::append_int64(&mut buf, v);
        }

        let mut r = reader(&buf);
        for &v in values {
            assert_eq!(r.read_int64().await.unwrap(), v);
        }
    }

    #[tokio::test]
    async fn test_string_roundtrip_boundaries() {
        let lengths = [0usize, 31, 32, 255, 256, 65_535, 65_536];
        let mut buf = BytesMut::new();
        for &len in &lengths {
            encode::append_str(&mut buf, &"x".repeat(len));
        }

        let mut r = reader(&buf);
        for &len in &lengths {
            let s = r.read_string().await.unwrap();
            assert_eq!(s.len(), len);
        }
    }

    #[tokio::test]
    async fn test_narrowing_overflow_consumes_exactly_one_value() {
        let mut buf = BytesMut::new();
        encode::append_uint64(&mut buf, 300);
        encode::append_uint64(&mut buf, 7);

        let mut r = reader(&buf);
        let err = r.read_uint8().await.unwrap_err();
        assert!(matches!(
            err,
            CodecError::Protocol(ProtocolError::UintOverflow { value: 300, .. })
        ));
        // The overflowing value was consumed whole; the stream stays in sync.
        assert_eq!(r.read_uint64().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_int_narrowing_overflow() {
        let mut buf = BytesMut::new();
        encode::append_int64(&mut buf, -40_000);
        let mut r = reader(&buf);
        assert!(matches!(
            r.read_int16().await.unwrap_err(),
            CodecError::Protocol(ProtocolError::IntOverflow { value: -40_000, .. })
        ));
    }

    #[tokio::test]
    async fn test_peek_does_not_consume() {
        let mut buf = BytesMut::new();
        encode::append_nil(&mut buf);
        let mut r = reader(&buf);
        assert_eq!(r.peek_type().await.unwrap(), WireType::Nil);
        assert_eq!(r.peek_type().await.unwrap(), WireType::Nil);
        r.read_nil().await.unwrap();
    }

    #[tokio::test]
    async fn test_bad_prefix_names_operation() {
        let mut buf = BytesMut::new();
        encode::append_bool(&mut buf, true);
        let mut r = reader(&buf);
        let err = r.read_float64().await.unwrap_err();
        assert!(matches!(
            err,
            CodecError::Protocol(ProtocolError::BadPrefix { op: "read float64", .. })
        ));
    }

    #[tokio::test]
    async fn test_float_roundtrip() {
        let mut buf = BytesMut::new();
        encode::append_float64(&mut buf, -2.75);
        encode::append_float32(&mut buf, 0.5);
        let mut r = reader(&buf);
        assert_eq!(r.read_float64().await.unwrap(), -2.75);
        assert_eq!(r.read_float32().await.unwrap(), 0.5);
    }

    #[tokio::test]
    async fn test_bytes_into_reuses_capacity() {
        let mut buf = BytesMut::new();
        encode::append_bin(&mut buf, &[1, 2, 3, 4]);
        encode::append_bin(&mut buf, &[9]);

        let mut r = reader(&buf);
        let mut dest = Vec::new();
        r.read_bytes_into(&mut dest).await.unwrap();
        assert_eq!(dest, [1, 2, 3, 4]);
        let cap = dest.capacity();
        r.read_bytes_into(&mut dest).await.unwrap();
        assert_eq!(dest, [9]);
        assert_eq!(dest.capacity(), cap);
    }

    #[tokio::test]
    async fn test_skip_value_containers() {
        let mut buf = BytesMut::new();
        // map { "a": [1, 2], "b": "text" } followed by a sentinel
        encode::append_map_header(&mut buf, 2);
        encode::append_str(&mut buf, "a");
        encode::append_array_header(&mut buf, 2);
        encode::append_uint64(&mut buf, 1);
        encode::append_uint64(&mut buf, 2);
        encode::append_str(&mut buf, "b");
        encode::append_str(&mut buf, "text");
        encode::append_uint64(&mut buf, 42);

        let mut r = reader(&buf);
        r.skip_value().await.unwrap();
        assert_eq!(r.read_uint64().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_eof_surfaces_as_closed() {
        let mut r = MessageReader::new(&[][..]);
        assert!(matches!(
            r.peek_type().await.unwrap_err(),
            CodecError::ConnectionClosed
        ));
    }
}
