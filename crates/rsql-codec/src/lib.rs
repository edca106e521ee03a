//! # rsql-codec
//!
//! Buffered message-pack stream I/O for the RSQL protocol.
//!
//! Two halves mirror the two directions of a session:
//!
//! - [`MessageWriter`] stages encoded values in an internal buffer and
//!   commits them to the transport on [`MessageWriter::flush`]. The first
//!   transport failure poisons the writer: later writes are silently
//!   dropped and the original error is returned from every later flush.
//! - [`MessageReader`] pulls typed values from a buffered transport, with a
//!   one-byte peek for type classification and a scratch buffer reused
//!   across string reads.
//!
//! Errors from either half are unrecoverable; the connection should be
//! closed when one surfaces.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod reader;
pub mod writer;

pub use error::CodecError;
pub use reader::MessageReader;
pub use writer::MessageWriter;
