//! Staged message-pack writer with sticky failure.

use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use rsql_protocol::encode;

use crate::error::{CodecError, Result};

const STAGING_DEFAULT_CAPACITY: usize = 1024;

/// Writes message-pack values to a transport.
///
/// Values are encoded into an internal staging buffer; [`MessageWriter::flush`]
/// commits the staged bytes to the transport. Once a transport operation has
/// failed the writer is doomed: every later write is silently dropped and
/// every later flush returns the original error. A doomed connection must be
/// closed, not retried.
pub struct MessageWriter<W> {
    inner: W,
    staging: BytesMut,
    doomed: Option<CodecError>,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    /// Wrap a transport in a message-pack writer.
    pub fn new(transport: W) -> Self {
        Self {
            inner: transport,
            staging: BytesMut::with_capacity(STAGING_DEFAULT_CAPACITY),
            doomed: None,
        }
    }

    /// Stage a nil value.
    pub fn write_nil(&mut self) {
        if self.doomed.is_none() {
            encode::append_nil(&mut self.staging);
        }
    }

    /// Stage a boolean.
    pub fn write_bool(&mut self, val: bool) {
        if self.doomed.is_none() {
            encode::append_bool(&mut self.staging, val);
        }
    }

    /// Stage an unsigned 8-bit integer.
    pub fn write_uint8(&mut self, val: u8) {
        if self.doomed.is_none() {
            encode::append_uint8(&mut self.staging, val);
        }
    }

    /// Stage an unsigned 16-bit integer.
    pub fn write_uint16(&mut self, val: u16) {
        if self.doomed.is_none() {
            encode::append_uint16(&mut self.staging, val);
        }
    }

    /// Stage an unsigned 32-bit integer.
    pub fn write_uint32(&mut self, val: u32) {
        if self.doomed.is_none() {
            encode::append_uint32(&mut self.staging, val);
        }
    }

    /// Stage an unsigned 64-bit integer.
    pub fn write_uint64(&mut self, val: u64) {
        if self.doomed.is_none() {
            encode::append_uint64(&mut self.staging, val);
        }
    }

    /// Stage a signed 8-bit integer.
    pub fn write_int8(&mut self, val: i8) {
        if self.doomed.is_none() {
            encode::append_int8(&mut self.staging, val);
        }
    }

    /// Stage a signed 16-bit integer.
    pub fn write_int16(&mut self, val: i16) {
        if self.doomed.is_none() {
            encode::append_int16(&mut self.staging, val);
        }
    }

    /// Stage a signed 32-bit integer.
    pub fn write_int32(&mut self, val: i32) {
        if self.doomed.is_none() {
            encode::append_int32(&mut self.staging, val);
        }
    }

    /// Stage a signed 64-bit integer.
    pub fn write_int64(&mut self, val: i64) {
        if self.doomed.is_none() {
            encode::append_int64(&mut self.staging, val);
        }
    }

    /// Stage a single precision float.
    pub fn write_float32(&mut self, val: f32) {
        if self.doomed.is_none() {
            encode::append_float32(&mut self.staging, val);
        }
    }

    /// Stage a double precision float.
    pub fn write_float64(&mut self, val: f64) {
        if self.doomed.is_none() {
            encode::append_float64(&mut self.staging, val);
        }
    }

    /// Stage a string.
    pub fn write_str(&mut self, val: &str) {
        if self.doomed.is_none() {
            encode::append_str(&mut self.staging, val);
        }
    }

    /// Stage a string supplied as raw bytes.
    pub fn write_str_bytes(&mut self, val: &[u8]) {
        if self.doomed.is_none() {
            encode::append_str_bytes(&mut self.staging, val);
        }
    }

    /// Stage a binary value.
    pub fn write_bin(&mut self, val: &[u8]) {
        if self.doomed.is_none() {
            encode::append_bin(&mut self.staging, val);
        }
    }

    /// Stage an array header.
    pub fn write_array_header(&mut self, len: u32) {
        if self.doomed.is_none() {
            encode::append_array_header(&mut self.staging, len);
        }
    }

    /// Stage a map header.
    pub fn write_map_header(&mut self, len: u32) {
        if self.doomed.is_none() {
            encode::append_map_header(&mut self.staging, len);
        }
    }

    /// Commit all staged bytes to the transport.
    ///
    /// If the writer is doomed, the staged bytes are dropped and the original
    /// transport error is returned.
    pub async fn flush(&mut self) -> Result<()> {
        if let Some(err) = &self.doomed {
            self.staging.clear();
            return Err(err.clone());
        }

        if let Err(e) = self.inner.write_all(&self.staging).await {
            return Err(self.doom(e));
        }
        self.staging.clear();
        if let Err(e) = self.inner.flush().await {
            return Err(self.doom(e));
        }

        Ok(())
    }

    /// Shut down the write side of the transport.
    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(err) = &self.doomed {
            return Err(err.clone());
        }
        if let Err(e) = self.inner.shutdown().await {
            return Err(self.doom(e));
        }
        Ok(())
    }

    /// The transport error that doomed this writer, if any.
    #[must_use]
    pub fn error(&self) -> Option<&CodecError> {
        self.doomed.as_ref()
    }

    fn doom(&mut self, e: std::io::Error) -> CodecError {
        let err = CodecError::from(e);
        self.doomed = Some(err.clone());
        err
    }
}
