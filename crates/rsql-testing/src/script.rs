//! Response-stream builders mirroring the server's message shapes.

use bytes::{Bytes, BytesMut};

use rsql_protocol::{encode, DatatypeTag, ResponseTag};

/// A column declaration for a scripted recordset layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnSpec {
    /// NULL literal column.
    Void,
    /// Boolean.
    Boolean,
    /// Variable-length binary with a precision.
    Varbinary {
        /// Declared maximum length in bytes.
        precision: u16,
    },
    /// Character data with a precision and a fixed-length flag.
    Varchar {
        /// Declared maximum length in characters.
        precision: u16,
        /// Whether the column is space-padded (`CHAR`).
        fixed_len: bool,
    },
    /// Bit.
    Bit,
    /// Unsigned 8-bit integer.
    Tinyint,
    /// Signed 16-bit integer.
    Smallint,
    /// Signed 32-bit integer.
    Int,
    /// Signed 64-bit integer.
    Bigint,
    /// Exact decimal with precision and scale.
    Money {
        /// Declared precision.
        precision: u16,
        /// Declared scale.
        scale: u16,
    },
    /// Exact decimal with precision and scale.
    Numeric {
        /// Declared precision.
        precision: u16,
        /// Declared scale.
        scale: u16,
    },
    /// Double precision float.
    Float,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time.
    Datetime,
}

impl ColumnSpec {
    fn append_descriptor(self, buf: &mut BytesMut) {
        match self {
            ColumnSpec::Void => append_plain(buf, DatatypeTag::Void),
            ColumnSpec::Boolean => append_plain(buf, DatatypeTag::Boolean),
            ColumnSpec::Varbinary { precision } => {
                encode::append_array_header(buf, 2);
                encode::append_uint8(buf, DatatypeTag::Varbinary as u8);
                encode::append_uint16(buf, precision);
            }
            ColumnSpec::Varchar { precision, fixed_len } => {
                encode::append_array_header(buf, 3);
                encode::append_uint8(buf, DatatypeTag::Varchar as u8);
                encode::append_uint16(buf, precision);
                encode::append_bool(buf, fixed_len);
            }
            ColumnSpec::Bit => append_plain(buf, DatatypeTag::Bit),
            ColumnSpec::Tinyint => append_plain(buf, DatatypeTag::Tinyint),
            ColumnSpec::Smallint => append_plain(buf, DatatypeTag::Smallint),
            ColumnSpec::Int => append_plain(buf, DatatypeTag::Int),
            ColumnSpec::Bigint => append_plain(buf, DatatypeTag::Bigint),
            ColumnSpec::Money { precision, scale } => {
                append_decimal(buf, DatatypeTag::Money, precision, scale);
            }
            ColumnSpec::Numeric { precision, scale } => {
                append_decimal(buf, DatatypeTag::Numeric, precision, scale);
            }
            ColumnSpec::Float => append_plain(buf, DatatypeTag::Float),
            ColumnSpec::Date => append_plain(buf, DatatypeTag::Date),
            ColumnSpec::Time => append_plain(buf, DatatypeTag::Time),
            ColumnSpec::Datetime => append_plain(buf, DatatypeTag::Datetime),
        }
    }
}

fn append_plain(buf: &mut BytesMut, tag: DatatypeTag) {
    encode::append_array_header(buf, 1);
    encode::append_uint8(buf, tag as u8);
}

fn append_decimal(buf: &mut BytesMut, tag: DatatypeTag, precision: u16, scale: u16) {
    encode::append_array_header(buf, 3);
    encode::append_uint8(buf, tag as u8);
    encode::append_uint16(buf, precision);
    encode::append_uint16(buf, scale);
}

/// A row value in a scripted record.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    /// NULL, encoded as nil.
    Null,
    /// Boolean.
    Bool(bool),
    /// Unsigned integer (bit, tinyint).
    Uint(u64),
    /// Signed integer (smallint, int, bigint).
    Int(i64),
    /// Double precision float.
    Float(f64),
    /// String (varchar, money, numeric text).
    Str(String),
    /// Binary payload (varbinary).
    Bin(Vec<u8>),
    /// Date as days since the lowest representable date.
    Date {
        /// Days since 0001-01-01.
        delta_days: u32,
    },
    /// Time as seconds plus nanoseconds since midnight.
    Time {
        /// Seconds since midnight.
        delta_seconds: u32,
        /// Nanosecond remainder.
        delta_ns: u32,
    },
    /// Datetime as days, seconds and nanoseconds since the lowest date.
    Datetime {
        /// Days since 0001-01-01.
        delta_days: u32,
        /// Seconds within the day.
        delta_seconds: u32,
        /// Nanosecond remainder.
        delta_ns: u32,
    },
}

impl WireValue {
    /// Convenience constructor for string values.
    #[must_use]
    pub fn str(value: impl Into<String>) -> Self {
        WireValue::Str(value.into())
    }

    fn append(&self, buf: &mut BytesMut) {
        match self {
            WireValue::Null => encode::append_nil(buf),
            WireValue::Bool(v) => encode::append_bool(buf, *v),
            WireValue::Uint(v) => encode::append_uint64(buf, *v),
            WireValue::Int(v) => encode::append_int64(buf, *v),
            WireValue::Float(v) => encode::append_float64(buf, *v),
            WireValue::Str(v) => encode::append_str(buf, v),
            WireValue::Bin(v) => encode::append_bin(buf, v),
            WireValue::Date { delta_days } => encode::append_uint32(buf, *delta_days),
            WireValue::Time {
                delta_seconds,
                delta_ns,
            } => {
                encode::append_array_header(buf, 2);
                encode::append_uint32(buf, *delta_seconds);
                encode::append_uint32(buf, *delta_ns);
            }
            WireValue::Datetime {
                delta_days,
                delta_seconds,
                delta_ns,
            } => {
                encode::append_array_header(buf, 3);
                encode::append_uint32(buf, *delta_days);
                encode::append_uint32(buf, *delta_seconds);
                encode::append_uint32(buf, *delta_ns);
            }
        }
    }
}

/// Fields of a scripted structured error record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorSpec {
    /// Server source file.
    pub src_file: String,
    /// Server source line.
    pub src_line_no: i64,
    /// Server function name.
    pub src_funcname: String,
    /// Server backtrace.
    pub src_backtrace: String,
    /// Error category.
    pub category: String,
    /// Error message identifier.
    pub message: String,
    /// Severity label.
    pub severity: String,
    /// Error state; 127 signals a closed connection.
    pub state: i64,
    /// Human-readable error text.
    pub text: String,
    /// Line within the batch.
    pub line_no: i64,
    /// Position within the line.
    pub line_pos: i64,
}

impl ErrorSpec {
    /// A minimal error record with the fields the driver formats.
    #[must_use]
    pub fn new(state: i64, text: impl Into<String>, line_no: i64, line_pos: i64) -> Self {
        ErrorSpec {
            state,
            text: text.into(),
            line_no,
            line_pos,
            ..ErrorSpec::default()
        }
    }
}

/// Builder for one batch's scripted response stream.
///
/// Messages are appended in server-send order and serialized exactly as the
/// real server would frame them.
#[derive(Debug, Clone, Default)]
pub struct ResponseScript {
    buf: BytesMut,
}

impl ResponseScript {
    /// Start an empty response stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Announce a recordset: tag, column names, then the layout descriptor.
    #[must_use]
    pub fn record_layout(mut self, names: &[&str], columns: &[ColumnSpec]) -> Self {
        encode::append_uint8(&mut self.buf, ResponseTag::RecordLayout as u8);
        encode::append_array_header(&mut self.buf, names.len() as u32);
        for name in names {
            encode::append_str(&mut self.buf, name);
        }
        encode::append_array_header(&mut self.buf, columns.len() as u32);
        for column in columns {
            column.append_descriptor(&mut self.buf);
        }
        self
    }

    /// One row of values, in column order.
    #[must_use]
    pub fn record(mut self, values: &[WireValue]) -> Self {
        encode::append_uint8(&mut self.buf, ResponseTag::Record as u8);
        encode::append_array_header(&mut self.buf, values.len() as u32);
        for value in values {
            value.append(&mut self.buf);
        }
        self
    }

    /// End the current recordset with the server-computed row count.
    #[must_use]
    pub fn record_finished(mut self, row_count: i64) -> Self {
        encode::append_uint8(&mut self.buf, ResponseTag::RecordFinished as u8);
        encode::append_int64(&mut self.buf, row_count);
        self
    }

    /// Report an execution statement's affected-row count.
    #[must_use]
    pub fn execution_finished(mut self, row_count: i64) -> Self {
        encode::append_uint8(&mut self.buf, ResponseTag::ExecutionFinished as u8);
        encode::append_int64(&mut self.buf, row_count);
        self
    }

    /// A print payload: a layout and one row, which the driver discards.
    #[must_use]
    pub fn print(mut self, columns: &[ColumnSpec], values: &[WireValue]) -> Self {
        encode::append_uint8(&mut self.buf, ResponseTag::Print as u8);
        encode::append_array_header(&mut self.buf, columns.len() as u32);
        for column in columns {
            column.append_descriptor(&mut self.buf);
        }
        encode::append_array_header(&mut self.buf, values.len() as u32);
        for value in values {
            value.append(&mut self.buf);
        }
        self
    }

    /// An informational message, which the driver discards.
    #[must_use]
    pub fn message(mut self, text: &str) -> Self {
        encode::append_uint8(&mut self.buf, ResponseTag::Message as u8);
        encode::append_str(&mut self.buf, text);
        self
    }

    /// A structured error record. The real server always follows this with
    /// [`ResponseScript::batch_end`].
    #[must_use]
    pub fn error(mut self, spec: &ErrorSpec) -> Self {
        encode::append_uint8(&mut self.buf, ResponseTag::Error as u8);
        encode::append_map_header(&mut self.buf, 11);

        let pairs: [(&str, &str); 7] = [
            ("src_file", &spec.src_file),
            ("src_funcname", &spec.src_funcname),
            ("src_backtrace", &spec.src_backtrace),
            ("category", &spec.category),
            ("message", &spec.message),
            ("severity", &spec.severity),
            ("text", &spec.text),
        ];
        for (key, value) in pairs {
            encode::append_str(&mut self.buf, key);
            encode::append_str(&mut self.buf, value);
        }
        for (key, value) in [
            ("src_line_no", spec.src_line_no),
            ("state", spec.state),
            ("line_no", spec.line_no),
            ("line_pos", spec.line_pos),
        ] {
            encode::append_str(&mut self.buf, key);
            encode::append_int64(&mut self.buf, value);
        }
        self
    }

    /// Terminate the batch with a return code.
    #[must_use]
    pub fn batch_end(mut self, rc: i64) -> Self {
        encode::append_uint8(&mut self.buf, ResponseTag::BatchEnd as u8);
        encode::append_int64(&mut self.buf, rc);
        self
    }

    /// Freeze the stream into the bytes sent on the wire.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}
