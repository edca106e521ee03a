//! Column datatype classification.

use std::fmt;

/// The SQL datatype of a recordset column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Datatype {
    /// NULL literal column.
    Void,
    /// Boolean expression result.
    Boolean,
    /// Variable-length binary.
    Varbinary,
    /// Character data (also covers fixed-length `CHAR`).
    Varchar,
    /// Bit (0 or 1).
    Bit,
    /// Unsigned 8-bit integer.
    Tinyint,
    /// Signed 16-bit integer.
    Smallint,
    /// Signed 32-bit integer.
    Int,
    /// Signed 64-bit integer.
    Bigint,
    /// Exact decimal, carried as text.
    Money,
    /// Exact decimal, carried as text.
    Numeric,
    /// Double precision float.
    Float,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time.
    Datetime,
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Datatype::Void => "VOID",
            Datatype::Boolean => "BOOLEAN",
            Datatype::Varbinary => "VARBINARY",
            Datatype::Varchar => "VARCHAR",
            Datatype::Bit => "BIT",
            Datatype::Tinyint => "TINYINT",
            Datatype::Smallint => "SMALLINT",
            Datatype::Int => "INT",
            Datatype::Bigint => "BIGINT",
            Datatype::Money => "MONEY",
            Datatype::Numeric => "NUMERIC",
            Datatype::Float => "FLOAT",
            Datatype::Date => "DATE",
            Datatype::Time => "TIME",
            Datatype::Datetime => "DATETIME",
        };
        f.write_str(name)
    }
}
