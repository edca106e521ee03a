//! Protocol-level error definitions.

use thiserror::Error;

/// A violation of the wire protocol.
///
/// Any of these means the stream is out of sync with the peer. Recovery is
/// not possible; the session should be torn down.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A value started with a marker byte outside the expected family.
    #[error("{op}: bad marker byte {prefix:#010b}")]
    BadPrefix {
        /// The read operation that rejected the byte.
        op: &'static str,
        /// The offending marker byte.
        prefix: u8,
    },

    /// A decoded unsigned integer does not fit the requested width.
    #[error("{op}: overflow, read {value}")]
    UintOverflow {
        /// The narrowing read that overflowed.
        op: &'static str,
        /// The decoded value.
        value: u64,
    },

    /// A decoded signed integer does not fit the requested width.
    #[error("{op}: overflow, read {value}")]
    IntOverflow {
        /// The narrowing read that overflowed.
        op: &'static str,
        /// The decoded value.
        value: i64,
    },

    /// The server sent a tag byte outside the response tag set.
    #[error("unknown response tag {0}")]
    UnknownResponseTag(u8),

    /// A column layout descriptor named an unknown datatype.
    #[error("unknown datatype tag {0}")]
    UnknownDatatype(u8),

    /// A column layout descriptor had the wrong number of elements.
    #[error("datatype descriptor for tag {datatype} has {actual} elements, expected {expected}")]
    DescriptorArity {
        /// The datatype tag being described.
        datatype: u8,
        /// Element count the tag requires.
        expected: u32,
        /// Element count received.
        actual: u32,
    },

    /// A row value array does not match the recordset column count.
    #[error("row has {actual} values, layout has {expected} columns")]
    RowWidth {
        /// Column count of the current layout.
        expected: usize,
        /// Value count received.
        actual: u32,
    },

    /// A decoded temporal value cannot be represented.
    #[error("timestamp out of range: {unix_seconds} seconds from Unix epoch")]
    TimestampOutOfRange {
        /// The out-of-range instant, as Unix seconds.
        unix_seconds: i64,
    },
}
