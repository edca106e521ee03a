//! Client error types.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use rsql_codec::CodecError;
use rsql_protocol::MAX_BATCH_TEXT;

/// Errors that can occur during client operations.
///
/// Values are `Clone` so a batch can latch its first error and hand out
/// copies from every later call.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Transport failure; the session is unusable.
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// Wire-level failure from the codec layer; the session is unusable.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The server broke the response protocol; fatal to the session.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The server rejected the login.
    #[error("login failed")]
    LoginFailed,

    /// Connection string or configuration problem.
    #[error("configuration error: {0}")]
    Config(String),

    /// The session was closed while an operation was in flight.
    #[error("session closed")]
    SessionClosed,

    /// The previous batch has not reached its end; the connection cannot
    /// start another one.
    #[error("connection still carries data from the previous batch")]
    BatchInFlight,

    /// The server aborted the connection because the batch text exceeds the
    /// hard size limit.
    #[error("connection closed by server: batch text must be smaller than {MAX_BATCH_TEXT} bytes")]
    BatchTooLarge,

    /// Structured error generated during batch execution on the server.
    #[error(transparent)]
    Batch(#[from] BatchError),

    /// Column metadata requested while no recordset is active.
    #[error("column list not available, no recordset found")]
    NoRecordset,

    /// `scan` called while no row is available.
    #[error("scan: no record available")]
    ScanNoRow,

    /// `scan` destination count differs from the column count.
    #[error("scan: {provided} destinations for {columns} columns")]
    ScanArity {
        /// Destinations supplied by the caller.
        provided: usize,
        /// Columns in the current recordset.
        columns: usize,
    },

    /// A column value does not fit its `scan` destination.
    #[error("scan: column {column} into {dest}: {reason}")]
    ScanColumn {
        /// Zero-based column index.
        column: usize,
        /// Destination type name.
        dest: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(Arc::new(e))
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// An error generated during execution of a batch on the server, such as a
/// syntax error, a division by zero or a constraint violation.
///
/// Unless [`BatchError::is_connection_fatal`] reports true, the connection
/// stays usable for further batches once the failed batch has reached its
/// end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchError {
    /// Server source file that raised the error (diagnostic only).
    pub src_file: String,
    /// Server source line (diagnostic only).
    pub src_line_no: i64,
    /// Server function name (diagnostic only).
    pub src_funcname: String,
    /// Server backtrace (diagnostic only).
    pub src_backtrace: String,

    /// Error category (diagnostic only).
    pub category: String,
    /// Error message identifier (diagnostic only).
    pub message: String,
    /// Severity label (diagnostic only).
    pub severity: String,
    /// Error state; `127` means the server has closed the connection.
    pub state: i64,
    /// Human-readable error text.
    pub text: String,
    /// Line within the batch that caused the error.
    pub line_no: i64,
    /// Position within that line.
    pub line_pos: i64,
}

/// Error state signalling that the server has unilaterally closed the
/// connection.
pub const STATE_CONNECTION_CLOSED: i64 = 127;

impl BatchError {
    /// Whether the server closed the connection along with this error.
    ///
    /// Only `THROW` and a server-side abort produce this state; the session
    /// cannot be reused afterwards.
    #[must_use]
    pub fn is_connection_fatal(&self) -> bool {
        self.state == STATE_CONNECTION_CLOSED
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}[{}] {}",
            self.line_no, self.line_pos, self.state, self.text
        )
    }
}

impl std::error::Error for BatchError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_error_display() {
        let err = BatchError {
            state: 1,
            text: "divide by zero".into(),
            line_no: 4,
            line_pos: 12,
            ..BatchError::default()
        };
        assert_eq!(err.to_string(), "4:12[1] divide by zero");
        assert!(!err.is_connection_fatal());
    }

    #[test]
    fn test_state_127_is_fatal() {
        let err = BatchError {
            state: STATE_CONNECTION_CLOSED,
            ..BatchError::default()
        };
        assert!(err.is_connection_fatal());
    }

    #[test]
    fn test_error_is_clone() {
        let err = Error::from(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"));
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
    }
}
