//! Column field variants and their wire decoders.

use std::fmt;

use chrono::{DateTime, TimeZone, Timelike, Utc};
use tokio::io::AsyncRead;

use rsql_codec::{CodecError, MessageReader};
use rsql_protocol::{DatatypeTag, ProtocolError, WireType};

use crate::datatype::Datatype;

const SECONDS_PER_DAY: i64 = 24 * 3600;

/// Unix second of 0001-01-01T00:00:00Z, the lowest representable date.
pub const UNIX_SEC_LOWEST: i64 = -62_135_596_800;

/// Unix second of 1900-01-01T00:00:00Z, the date part of every TIME value.
pub const UNIX_SEC_1900_01_01: i64 = -2_208_988_800;

/// Rendering of NULL values in [`Field`]'s `Display` output.
pub const NULL_STRING: &str = "<NULL>";

/// One column slot of a recordset row.
///
/// A row is a `Vec<Field>` built from the server's column-layout descriptor;
/// each variant carries its presence flag, its decoded value, and the type
/// parameters announced by the layout. Value buffers (binary, character and
/// decimal variants) are reused across rows of the same recordset.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// NULL literal column; always null.
    Void {
        /// Always true.
        is_null: bool,
    },
    /// Boolean.
    Boolean {
        /// Presence flag.
        is_null: bool,
        /// Decoded value, meaningful only when not null.
        value: bool,
    },
    /// Variable-length binary.
    Varbinary {
        /// Declared maximum length in bytes.
        precision: u16,
        /// Presence flag.
        is_null: bool,
        /// Decoded value; buffer reused across rows.
        value: Vec<u8>,
    },
    /// Character data.
    Varchar {
        /// Declared maximum length in characters.
        precision: u16,
        /// True for fixed-length (`CHAR`) columns, which are space-padded
        /// to `precision` characters.
        fixed_len: bool,
        /// Presence flag.
        is_null: bool,
        /// Decoded UTF-8 bytes; buffer reused across rows.
        value: Vec<u8>,
    },
    /// Bit, 0 or 1.
    Bit {
        /// Presence flag.
        is_null: bool,
        /// Decoded value.
        value: u8,
    },
    /// Unsigned 8-bit integer.
    Tinyint {
        /// Presence flag.
        is_null: bool,
        /// Decoded value.
        value: u8,
    },
    /// Signed 16-bit integer.
    Smallint {
        /// Presence flag.
        is_null: bool,
        /// Decoded value.
        value: i16,
    },
    /// Signed 32-bit integer.
    Int {
        /// Presence flag.
        is_null: bool,
        /// Decoded value.
        value: i32,
    },
    /// Signed 64-bit integer.
    Bigint {
        /// Presence flag.
        is_null: bool,
        /// Decoded value.
        value: i64,
    },
    /// Exact decimal, kept as its wire text.
    Money {
        /// Declared precision.
        precision: u16,
        /// Declared scale.
        scale: u16,
        /// Presence flag.
        is_null: bool,
        /// Exact decimal text; buffer reused across rows.
        value: Vec<u8>,
    },
    /// Exact decimal, kept as its wire text.
    Numeric {
        /// Declared precision.
        precision: u16,
        /// Declared scale.
        scale: u16,
        /// Presence flag.
        is_null: bool,
        /// Exact decimal text; buffer reused across rows.
        value: Vec<u8>,
    },
    /// Double precision float.
    Float {
        /// Presence flag.
        is_null: bool,
        /// Decoded value.
        value: f64,
    },
    /// Calendar date, UTC midnight.
    Date {
        /// Presence flag.
        is_null: bool,
        /// Decoded instant, meaningful only when not null.
        value: DateTime<Utc>,
    },
    /// Time of day on the fixed date 1900-01-01, UTC.
    Time {
        /// Presence flag.
        is_null: bool,
        /// Decoded instant, meaningful only when not null.
        value: DateTime<Utc>,
    },
    /// Date and time, UTC.
    Datetime {
        /// Presence flag.
        is_null: bool,
        /// Decoded instant, meaningful only when not null.
        value: DateTime<Utc>,
    },
}

impl Field {
    /// The datatype this field was declared with.
    #[must_use]
    pub fn datatype(&self) -> Datatype {
        match self {
            Field::Void { .. } => Datatype::Void,
            Field::Boolean { .. } => Datatype::Boolean,
            Field::Varbinary { .. } => Datatype::Varbinary,
            Field::Varchar { .. } => Datatype::Varchar,
            Field::Bit { .. } => Datatype::Bit,
            Field::Tinyint { .. } => Datatype::Tinyint,
            Field::Smallint { .. } => Datatype::Smallint,
            Field::Int { .. } => Datatype::Int,
            Field::Bigint { .. } => Datatype::Bigint,
            Field::Money { .. } => Datatype::Money,
            Field::Numeric { .. } => Datatype::Numeric,
            Field::Float { .. } => Datatype::Float,
            Field::Date { .. } => Datatype::Date,
            Field::Time { .. } => Datatype::Time,
            Field::Datetime { .. } => Datatype::Datetime,
        }
    }

    /// Whether the field currently holds NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        match self {
            Field::Void { is_null }
            | Field::Boolean { is_null, .. }
            | Field::Varbinary { is_null, .. }
            | Field::Varchar { is_null, .. }
            | Field::Bit { is_null, .. }
            | Field::Tinyint { is_null, .. }
            | Field::Smallint { is_null, .. }
            | Field::Int { is_null, .. }
            | Field::Bigint { is_null, .. }
            | Field::Money { is_null, .. }
            | Field::Numeric { is_null, .. }
            | Field::Float { is_null, .. }
            | Field::Date { is_null, .. }
            | Field::Time { is_null, .. }
            | Field::Datetime { is_null, .. } => *is_null,
        }
    }

    /// Decode the next wire value into this field in place.
    ///
    /// Optional fields receive nil as NULL; value buffers are reused.
    pub async fn read_value<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut MessageReader<R>,
    ) -> Result<(), CodecError> {
        match self {
            Field::Void { is_null } => {
                reader.read_nil().await?;
                *is_null = true;
            }

            Field::Boolean { is_null, value } => {
                if reader.peek_type().await? == WireType::Nil {
                    reader.read_nil().await?;
                    *is_null = true;
                    *value = false;
                } else {
                    *value = reader.read_bool().await?;
                    *is_null = false;
                }
            }

            Field::Varbinary { is_null, value, .. } => {
                if reader.peek_type().await? == WireType::Nil {
                    reader.read_nil().await?;
                    *is_null = true;
                    value.clear();
                } else {
                    reader.read_bytes_into(value).await?;
                    *is_null = false;
                }
            }

            Field::Varchar {
                precision,
                fixed_len,
                is_null,
                value,
            } => {
                if reader.peek_type().await? == WireType::Nil {
                    reader.read_nil().await?;
                    *is_null = true;
                    value.clear();
                } else {
                    reader.read_string_into(value).await?;
                    *is_null = false;

                    // CHAR columns are padded with spaces up to the declared
                    // precision, measured in characters, not bytes.
                    if *fixed_len {
                        let runes = rune_count(value);
                        let precision = usize::from(*precision);
                        if runes < precision {
                            value.resize(value.len() + (precision - runes), b' ');
                        }
                    }
                }
            }

            Field::Bit { is_null, value } | Field::Tinyint { is_null, value } => {
                if reader.peek_type().await? == WireType::Nil {
                    reader.read_nil().await?;
                    *is_null = true;
                    *value = 0;
                } else {
                    *value = reader.read_uint8().await?;
                    *is_null = false;
                }
            }

            Field::Smallint { is_null, value } => {
                if reader.peek_type().await? == WireType::Nil {
                    reader.read_nil().await?;
                    *is_null = true;
                    *value = 0;
                } else {
                    *value = reader.read_int16().await?;
                    *is_null = false;
                }
            }

            Field::Int { is_null, value } => {
                if reader.peek_type().await? == WireType::Nil {
                    reader.read_nil().await?;
                    *is_null = true;
                    *value = 0;
                } else {
                    *value = reader.read_int32().await?;
                    *is_null = false;
                }
            }

            Field::Bigint { is_null, value } => {
                if reader.peek_type().await? == WireType::Nil {
                    reader.read_nil().await?;
                    *is_null = true;
                    *value = 0;
                } else {
                    *value = reader.read_int64().await?;
                    *is_null = false;
                }
            }

            Field::Money { is_null, value, .. } | Field::Numeric { is_null, value, .. } => {
                // Exact decimal text, never re-encoded numerically.
                if reader.peek_type().await? == WireType::Nil {
                    reader.read_nil().await?;
                    *is_null = true;
                    value.clear();
                } else {
                    reader.read_string_into(value).await?;
                    *is_null = false;
                }
            }

            Field::Float { is_null, value } => {
                if reader.peek_type().await? == WireType::Nil {
                    reader.read_nil().await?;
                    *is_null = true;
                    *value = 0.0;
                } else {
                    *value = reader.read_float64().await?;
                    *is_null = false;
                }
            }

            Field::Date { is_null, value } => {
                if reader.peek_type().await? == WireType::Nil {
                    reader.read_nil().await?;
                    *is_null = true;
                    *value = DateTime::UNIX_EPOCH;
                } else {
                    let delta_days = reader.read_uint32().await?;
                    let secs = UNIX_SEC_LOWEST + i64::from(delta_days) * SECONDS_PER_DAY;
                    *value = instant(secs, 0)?;
                    *is_null = false;
                }
            }

            Field::Time { is_null, value } => {
                if reader.peek_type().await? == WireType::Nil {
                    reader.read_nil().await?;
                    *is_null = true;
                    *value = DateTime::UNIX_EPOCH;
                } else {
                    let len = reader.read_array_header().await?;
                    if len != 2 {
                        return Err(ProtocolError::DescriptorArity {
                            datatype: DatatypeTag::Time as u8,
                            expected: 2,
                            actual: len,
                        }
                        .into());
                    }
                    let delta_seconds = reader.read_uint32().await?;
                    let delta_ns = reader.read_uint32().await?;
                    let secs = UNIX_SEC_1900_01_01 + i64::from(delta_seconds);
                    *value = instant(secs, delta_ns)?;
                    *is_null = false;
                }
            }

            Field::Datetime { is_null, value } => {
                if reader.peek_type().await? == WireType::Nil {
                    reader.read_nil().await?;
                    *is_null = true;
                    *value = DateTime::UNIX_EPOCH;
                } else {
                    let len = reader.read_array_header().await?;
                    if len != 3 {
                        return Err(ProtocolError::DescriptorArity {
                            datatype: DatatypeTag::Datetime as u8,
                            expected: 3,
                            actual: len,
                        }
                        .into());
                    }
                    let delta_days = reader.read_uint32().await?;
                    let delta_seconds = reader.read_uint32().await?;
                    let delta_ns = reader.read_uint32().await?;
                    let secs = UNIX_SEC_LOWEST
                        + i64::from(delta_days) * SECONDS_PER_DAY
                        + i64::from(delta_seconds);
                    *value = instant(secs, delta_ns)?;
                    *is_null = false;
                }
            }
        }

        Ok(())
    }
}

fn instant(unix_seconds: i64, nanos: u32) -> Result<DateTime<Utc>, CodecError> {
    Utc.timestamp_opt(unix_seconds, nanos)
        .single()
        .ok_or_else(|| ProtocolError::TimestampOutOfRange { unix_seconds }.into())
}

/// Count characters in a byte buffer; non-UTF-8 payloads fall back to the
/// byte length.
fn rune_count(bytes: &[u8]) -> usize {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.chars().count(),
        Err(_) => bytes.len(),
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str(NULL_STRING);
        }

        match self {
            Field::Void { .. } => f.write_str(NULL_STRING),
            Field::Boolean { value, .. } => {
                f.write_str(if *value { "true" } else { "false" })
            }
            Field::Varbinary { value, .. } => {
                f.write_str("0x")?;
                for b in value {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Field::Varchar { value, .. }
            | Field::Money { value, .. }
            | Field::Numeric { value, .. } => f.write_str(&String::from_utf8_lossy(value)),
            Field::Bit { value, .. } => f.write_str(if *value == 0 { "0" } else { "1" }),
            Field::Tinyint { value, .. } => write!(f, "{value}"),
            Field::Smallint { value, .. } => write!(f, "{value}"),
            Field::Int { value, .. } => write!(f, "{value}"),
            Field::Bigint { value, .. } => write!(f, "{value}"),
            Field::Float { value, .. } => write!(f, "{value}"),
            Field::Date { value, .. } => write!(f, "{}", value.format("%Y-%m-%d")),
            Field::Time { value, .. } => {
                if value.nanosecond() == 0 {
                    write!(f, "{}", value.format("%H:%M:%S"))
                } else {
                    write!(f, "{}", value.format("%H:%M:%S.%f"))
                }
            }
            Field::Datetime { value, .. } => {
                if value.nanosecond() == 0 {
                    write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S"))
                } else {
                    write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S.%f"))
                }
            }
        }
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
    async fn test_nil_sets_null_and_clears_buffer() {
        let mut buf = BytesMut::new();
        encode::append_nil(&mut buf);

        let mut field = Field::Varchar {
            precision: 10,
            fixed_len: false,
            is_null: false,
            value: b"stale".to_vec(),
        };
        field.read_value(&mut reader(&buf)).await.unwrap();
        assert!(field.is_null());
        assert!(matches!(&field, Field::Varchar { value, .. } if value.is_empty()));
    }

    #[tokio::test]
    async fn test_fixed_length_varchar_padding() {
        let mut buf = BytesMut::new();
        encode::append_str(&mut buf, "hi");

        let mut field = Field::Varchar {
            precision: 5,
            fixed_len: true,
            is_null: true,
            value: Vec::new(),
        };
        field.read_value(&mut reader(&buf)).await.unwrap();
        assert!(matches!(&field, Field::Varchar { value, .. } if value == b"hi   "));
    }

    #[tokio::test]
    async fn test_fixed_length_varchar_counts_characters_not_bytes() {
        // 5 characters in 6 UTF-8 bytes; precision 5 means no padding.
        let mut buf = BytesMut::new();
        encode::append_str(&mut buf, "h\u{e9}llo");

        let mut field = Field::Varchar {
            precision: 5,
            fixed_len: true,
            is_null: true,
            value: Vec::new(),
        };
        field.read_value(&mut reader(&buf)).await.unwrap();
        assert!(matches!(&field, Field::Varchar { value, .. } if value == "h\u{e9}llo".as_bytes()));
    }

    #[tokio::test]
    async fn test_date_decodes_to_utc_midnight() {
        // 719162 days after 0001-01-01 is 1970-01-01.
        let mut buf = BytesMut::new();
        encode::append_uint32(&mut buf, 719_162);

        let mut field = Field::Date {
            is_null: true,
            value: DateTime::UNIX_EPOCH,
        };
        field.read_value(&mut reader(&buf)).await.unwrap();
        match &field {
            Field::Date { value, .. } => {
                assert_eq!(value.to_rfc3339(), "1970-01-01T00:00:00+00:00");
            }
            other => panic!("unexpected field {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_time_is_anchored_to_1900() {
        let mut buf = BytesMut::new();
        encode::append_array_header(&mut buf, 2);
        encode::append_uint32(&mut buf, 11 * 3600 + 30 * 60);
        encode::append_uint32(&mut buf, 250_000_000);

        let mut field = Field::Time {
            is_null: true,
            value: DateTime::UNIX_EPOCH,
        };
        field.read_value(&mut reader(&buf)).await.unwrap();
        match &field {
            Field::Time { value, .. } => {
                assert_eq!(value.to_rfc3339(), "1900-01-01T11:30:00.250+00:00");
                assert_eq!(field.to_string(), "11:30:00.250000000");
            }
            other => panic!("unexpected field {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_datetime_epoch_arithmetic() {
        let mut buf = BytesMut::new();
        encode::append_array_header(&mut buf, 3);
        encode::append_uint32(&mut buf, 719_162); // 1970-01-01
        encode::append_uint32(&mut buf, 3600);
        encode::append_uint32(&mut buf, 500_000_000);

        let mut field = Field::Datetime {
            is_null: true,
            value: DateTime::UNIX_EPOCH,
        };
        field.read_value(&mut reader(&buf)).await.unwrap();
        match &field {
            Field::Datetime { value, .. } => {
                assert_eq!(value.to_rfc3339(), "1970-01-01T01:00:00.500+00:00");
            }
            other => panic!("unexpected field {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_numeric_keeps_exact_text() {
        let mut buf = BytesMut::new();
        encode::append_str(&mut buf, "12345.6789");

        let mut field = Field::Numeric {
            precision: 18,
            scale: 4,
            is_null: true,
            value: Vec::new(),
        };
        field.read_value(&mut reader(&buf)).await.unwrap();
        assert_eq!(field.to_string(), "12345.6789");
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(Field::Void { is_null: true }.to_string(), NULL_STRING);
        assert_eq!(
            Field::Bigint {
                is_null: true,
                value: 0
            }
            .to_string(),
            NULL_STRING
        );
        assert_eq!(
            Field::Boolean {
                is_null: false,
                value: true
            }
            .to_string(),
            "true"
        );
        assert_eq!(
            Field::Varbinary {
                precision: 8,
                is_null: false,
                value: vec![0x12, 0x34, 0xab]
            }
            .to_string(),
            "0x1234ab"
        );
        assert_eq!(
            Field::Bit {
                is_null: false,
                value: 1
            }
            .to_string(),
            "1"
        );
    }
}
