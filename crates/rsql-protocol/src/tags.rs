//! Protocol tag sets shared by client and server.
//!
//! The first byte of every unit on the wire is a tag: a request tag when
//! sent by the client, a response tag when sent by the server. Recordset
//! column descriptors additionally carry a datatype tag.

/// Hard server-side limit on the SQL text of one batch, in bytes.
///
/// A larger batch makes the server abort the connection; the client
/// translates the resulting transport failure into a dedicated error.
pub const MAX_BATCH_TEXT: usize = 100_000;

/// Message types sent from client to server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestTag {
    /// Authentication message: tag followed by a credential map.
    Auth = 20,
    /// Batch submission: tag followed by the SQL text as a string.
    Batch = 21,
    /// Single-byte keepalive, sent by the session's background ticker.
    Keepalive = 30,
}

/// Message types sent from server to client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseTag {
    /// Login rejected; the server closes the connection.
    LoginFailed = 0,
    /// Login accepted.
    LoginSuccess = 1,
    /// Column names and a column layout descriptor follow.
    RecordLayout = 3,
    /// One row follows, an array of values in column order.
    Record = 4,
    /// Current recordset ended; an int64 row count follows.
    RecordFinished = 5,
    /// A statement completed; an int64 affected-row count follows.
    ExecutionFinished = 7,
    /// A layout-then-row pair follows, to be discarded.
    Print = 10,
    /// An informational string follows, to be discarded.
    Message = 11,
    /// A structured error record follows; a `BatchEnd` will follow it.
    Error = 12,
    /// Batch terminated; an int64 return code follows.
    BatchEnd = 14,
}

impl ResponseTag {
    /// Decode a raw tag byte.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::LoginFailed),
            1 => Some(Self::LoginSuccess),
            3 => Some(Self::RecordLayout),
            4 => Some(Self::Record),
            5 => Some(Self::RecordFinished),
            7 => Some(Self::ExecutionFinished),
            10 => Some(Self::Print),
            11 => Some(Self::Message),
            12 => Some(Self::Error),
            14 => Some(Self::BatchEnd),
            _ => None,
        }
    }
}

/// Column datatype tags carried in layout descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DatatypeTag {
    /// NULL literal column.
    Void = 1,
    /// Boolean.
    Boolean = 2,
    /// Variable-length binary; descriptor carries a precision.
    Varbinary = 4,
    /// Character data; descriptor carries precision and fixed-length flag.
    Varchar = 6,
    /// Bit (0 or 1).
    Bit = 9,
    /// Unsigned 8-bit integer.
    Tinyint = 10,
    /// Signed 16-bit integer.
    Smallint = 11,
    /// Signed 32-bit integer.
    Int = 12,
    /// Signed 64-bit integer.
    Bigint = 13,
    /// Exact decimal as text; descriptor carries precision and scale.
    Money = 15,
    /// Exact decimal as text; descriptor carries precision and scale.
    Numeric = 16,
    /// Double precision float.
    Float = 17,
    /// Calendar date.
    Date = 19,
    /// Time of day.
    Time = 20,
    /// Date and time.
    Datetime = 21,
}

impl DatatypeTag {
    /// Decode a raw datatype tag byte.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Void),
            2 => Some(Self::Boolean),
            4 => Some(Self::Varbinary),
            6 => Some(Self::Varchar),
            9 => Some(Self::Bit),
            10 => Some(Self::Tinyint),
            11 => Some(Self::Smallint),
            12 => Some(Self::Int),
            13 => Some(Self::Bigint),
            15 => Some(Self::Money),
            16 => Some(Self::Numeric),
            17 => Some(Self::Float),
            19 => Some(Self::Date),
            20 => Some(Self::Time),
            21 => Some(Self::Datetime),
            _ => None,
        }
    }
}
