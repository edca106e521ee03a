//! Recordset layout decoding.
//!
//! A recordset announcement carries two messages: the column-name list (a
//! string array) and the column-layout descriptor (one fixed-length array
//! per column, first element the datatype tag, remaining elements the type
//! parameters).

use chrono::DateTime;
use tokio::io::AsyncRead;

use rsql_codec::{CodecError, MessageReader};
use rsql_protocol::{DatatypeTag, ProtocolError};

use crate::field::Field;

/// Read the column-name list of a recordset.
pub async fn read_column_names<R: AsyncRead + Unpin>(
    reader: &mut MessageReader<R>,
) -> Result<Vec<String>, CodecError> {
    let count = reader.read_array_header().await?;
    let mut names = Vec::with_capacity(count as usize);
    for _ in 0..count {
        names.push(reader.read_string().await?);
    }
    Ok(names)
}

/// Read the column-layout descriptor, allocating one null [`Field`] per
/// column.
pub async fn read_row_layout<R: AsyncRead + Unpin>(
    reader: &mut MessageReader<R>,
) -> Result<Vec<Field>, CodecError> {
    let count = reader.read_array_header().await?;
    let mut row = Vec::with_capacity(count as usize);
    for _ in 0..count {
        row.push(read_field_descriptor(reader).await?);
    }
    Ok(row)
}

/// Fill an existing row with the next record's values, in column order.
pub async fn read_row_values<R: AsyncRead + Unpin>(
    reader: &mut MessageReader<R>,
    row: &mut [Field],
) -> Result<(), CodecError> {
    let count = reader.read_array_header().await?;
    if count as usize != row.len() {
        return Err(ProtocolError::RowWidth {
            expected: row.len(),
            actual: count,
        }
        .into());
    }

    for field in row {
        field.read_value(reader).await?;
    }
    Ok(())
}

async fn read_field_descriptor<R: AsyncRead + Unpin>(
    reader: &mut MessageReader<R>,
) -> Result<Field, CodecError> {
    let len = reader.read_array_header().await?;
    let raw = reader.read_uint8().await?;
    let tag = DatatypeTag::from_u8(raw).ok_or(ProtocolError::UnknownDatatype(raw))?;

    let arity = |expected: u32| -> Result<(), ProtocolError> {
        if len == expected {
            Ok(())
        } else {
            Err(ProtocolError::DescriptorArity {
                datatype: raw,
                expected,
                actual: len,
            })
        }
    };

    // Every freshly constructed field starts null.
    let field = match tag {
        DatatypeTag::Void => {
            arity(1)?;
            Field::Void { is_null: true }
        }
        DatatypeTag::Boolean => {
            arity(1)?;
            Field::Boolean {
                is_null: true,
                value: false,
            }
        }
        DatatypeTag::Varbinary => {
            arity(2)?;
            Field::Varbinary {
                precision: reader.read_uint16().await?,
                is_null: true,
                value: Vec::new(),
            }
        }
        DatatypeTag::Varchar => {
            arity(3)?;
            Field::Varchar {
                precision: reader.read_uint16().await?,
                fixed_len: reader.read_bool().await?,
                is_null: true,
                value: Vec::new(),
            }
        }
        DatatypeTag::Bit => {
            arity(1)?;
            Field::Bit {
                is_null: true,
                value: 0,
            }
        }
        DatatypeTag::Tinyint => {
            arity(1)?;
            Field::Tinyint {
                is_null: true,
                value: 0,
            }
        }
        DatatypeTag::Smallint => {
            arity(1)?;
            Field::Smallint {
                is_null: true,
                value: 0,
            }
        }
        DatatypeTag::Int => {
            arity(1)?;
            Field::Int {
                is_null: true,
                value: 0,
            }
        }
        DatatypeTag::Bigint => {
            arity(1)?;
            Field::Bigint {
                is_null: true,
                value: 0,
            }
        }
        DatatypeTag::Money => {
            arity(3)?;
            Field::Money {
                precision: reader.read_uint16().await?,
                scale: reader.read_uint16().await?,
                is_null: true,
                value: Vec::new(),
            }
        }
        DatatypeTag::Numeric => {
            arity(3)?;
            Field::Numeric {
                precision: reader.read_uint16().await?,
                scale: reader.read_uint16().await?,
                is_null: true,
                value: Vec::new(),
            }
        }
        DatatypeTag::Float => {
            arity(1)?;
            Field::Float {
                is_null: true,
                value: 0.0,
            }
        }
        DatatypeTag::Date => {
            arity(1)?;
            Field::Date {
                is_null: true,
                value: DateTime::UNIX_EPOCH,
            }
        }
        DatatypeTag::Time => {
            arity(1)?;
            Field::Time {
                is_null: true,
                value: DateTime::UNIX_EPOCH,
            }
        }
        DatatypeTag::Datetime => {
            arity(1)?;
            Field::Datetime {
                is_null: true,
                value: DateTime::UNIX_EPOCH,
            }
        }
    };

    Ok(field)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::datatype::Datatype;
    use bytes::BytesMut;
    use rsql_protocol::encode;

    fn reader(buf: &BytesMut) -> MessageReader<&[u8]> {
        MessageReader::new(&buf[..])
    }

    fn append_descriptor(buf: &mut BytesMut, tag: DatatypeTag, params: &[u64]) {
        encode::append_array_header(buf, 1 + params.len() as u32);
        encode::append_uint8(buf, tag as u8);
        for &p in params {
            encode::append_uint64(buf, p);
        }
    }

    #[tokio::test]
    async fn test_column_names() {
        let mut buf = BytesMut::new();
        encode::append_array_header(&mut buf, 3);
        encode::append_str(&mut buf, "id");
        encode::append_str(&mut buf, "name");
        encode::append_str(&mut buf, "");

        let names = read_column_names(&mut reader(&buf)).await.unwrap();
        assert_eq!(names, ["id", "name", ""]);
    }

    #[tokio::test]
    async fn test_layout_builds_null_fields() {
        let mut buf = BytesMut::new();
        encode::append_array_header(&mut buf, 3);
        append_descriptor(&mut buf, DatatypeTag::Int, &[]);
        // varchar(20), variable length
        encode::append_array_header(&mut buf, 3);
        encode::append_uint8(&mut buf, DatatypeTag::Varchar as u8);
        encode::append_uint16(&mut buf, 20);
        encode::append_bool(&mut buf, false);
        append_descriptor(&mut buf, DatatypeTag::Numeric, &[18, 4]);

        let row = read_row_layout(&mut reader(&buf)).await.unwrap();
        assert_eq!(row.len(), 3);
        assert!(row.iter().all(Field::is_null));
        assert_eq!(row[0].datatype(), Datatype::Int);
        assert!(matches!(
            row[1],
            Field::Varchar {
                precision: 20,
                fixed_len: false,
                ..
            }
        ));
        assert!(matches!(
            row[2],
            Field::Numeric {
                precision: 18,
                scale: 4,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unknown_datatype_is_rejected() {
        let mut buf = BytesMut::new();
        append_descriptor(&mut buf, DatatypeTag::Int, &[]);
        // patch the tag byte to an unassigned value
        let mut raw = buf.to_vec();
        raw[1] = 99;
        let raw = BytesMut::from(&raw[..]);

        let mut r = reader(&raw);
        let err = read_field_descriptor(&mut r).await.unwrap_err();
        assert!(matches!(
            err,
            CodecError::Protocol(ProtocolError::UnknownDatatype(99))
        ));
    }

    #[tokio::test]
    async fn test_descriptor_arity_mismatch() {
        let mut buf = BytesMut::new();
        // Int with a spurious parameter
        append_descriptor(&mut buf, DatatypeTag::Int, &[7]);

        let mut r = reader(&buf);
        let err = read_field_descriptor(&mut r).await.unwrap_err();
        assert!(matches!(
            err,
            CodecError::Protocol(ProtocolError::DescriptorArity {
                expected: 1,
                actual: 2,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_row_values_width_mismatch() {
        let mut buf = BytesMut::new();
        encode::append_array_header(&mut buf, 2);
        encode::append_uint64(&mut buf, 1);
        encode::append_uint64(&mut buf, 2);

        let mut row = vec![Field::Int {
            is_null: true,
            value: 0,
        }];
        let err = read_row_values(&mut reader(&buf), &mut row)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::Protocol(ProtocolError::RowWidth {
                expected: 1,
                actual: 2
            })
        ));
    }

    #[tokio::test]
    async fn test_row_values_fill_in_place() {
        let mut buf = BytesMut::new();
        encode::append_array_header(&mut buf, 2);
        encode::append_int32(&mut buf, -7);
        encode::append_str(&mut buf, "alice");

        let mut row = vec![
            Field::Int {
                is_null: true,
                value: 0,
            },
            Field::Varchar {
                precision: 20,
                fixed_len: false,
                is_null: true,
                value: Vec::new(),
            },
        ];
        read_row_values(&mut reader(&buf), &mut row).await.unwrap();
        assert!(matches!(row[0], Field::Int { is_null: false, value: -7 }));
        assert!(matches!(&row[1], Field::Varchar { is_null: false, value, .. } if value == b"alice"));
    }
}
