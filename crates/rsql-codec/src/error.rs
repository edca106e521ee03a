//! Codec error types.

use std::sync::Arc;

use thiserror::Error;

use rsql_protocol::ProtocolError;

/// Errors surfaced by the stream reader and writer.
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    /// Transport failure (wrapped in `Arc` for `Clone` support).
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// The peer violated the wire protocol.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The transport reached end-of-stream mid-value.
    #[error("connection closed")]
    ConnectionClosed,
}

impl From<std::io::Error> for CodecError {
    fn from(e: std::io::Error) -> Self {
        CodecError::Io(Arc::new(e))
    }
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
