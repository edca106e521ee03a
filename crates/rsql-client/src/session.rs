//! Session transport: connection, authentication, keepalive and close.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use rsql_codec::{MessageReader, MessageWriter};
use rsql_protocol::{ProtocolError, RequestTag, ResponseTag, MAX_BATCH_TEXT};
use rsql_types::Field;

use crate::config::Config;
use crate::error::{BatchError, Error, Result};

/// An authenticated connection to an RSQL server.
///
/// The read half is owned by the session and driven by the thread that owns
/// the current batch. The write half sits behind a mutex shared with the
/// keepalive task, so every send — batch submission or keepalive tick — is
/// serialized for the full duration of encoding plus flush.
///
/// Every read races the session's cancellation token, so [`Session::close`]
/// (or a [`CloseHandle`], from any task) unblocks an in-flight batch with a
/// transport error. Closing the session is the documented way to cancel a
/// running query: the server notices the closed connection and frees its
/// resources.
pub struct Session {
    reader: MessageReader<OwnedReadHalf>,
    shared: Arc<Shared>,
    remote_server: String,
    login_name: String,
}

struct Shared {
    writer: Mutex<MessageWriter<OwnedWriteHalf>>,
    closed: CancellationToken,
}

impl Shared {
    async fn close(&self) {
        // Idempotent: cancel is a no-op the second time, and a second
        // shutdown on the socket is harmless.
        self.closed.cancel();

        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.shutdown().await {
            tracing::debug!(error = %e, "socket shutdown during close");
        }
    }
}

/// A cloneable handle that can close its session from any task.
///
/// Useful to cancel a running query while the owning task is blocked inside
/// the batch cursor.
#[derive(Clone)]
pub struct CloseHandle {
    shared: Arc<Shared>,
}

impl CloseHandle {
    /// Close the session. Idempotent and safe to call concurrently.
    pub async fn close(&self) {
        self.shared.close().await;
    }
}

impl std::fmt::Debug for CloseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloseHandle")
            .field("closed", &self.shared.closed.is_cancelled())
            .finish()
    }
}

impl Session {
    /// Open a TCP connection, authenticate, and start the keepalive task.
    ///
    /// On login failure the socket is dropped and an error is returned; a
    /// returned session must be closed with [`Session::close`] when done.
    pub async fn connect(config: &Config) -> Result<Session> {
        tracing::debug!(
            server = %config.server_addr,
            login = %config.login,
            database = %config.database,
            "connecting to RSQL server"
        );

        let stream = TcpStream::connect(&config.server_addr).await?;
        stream.set_nodelay(true)?;
        let (read_half, write_half) = stream.into_split();

        let mut writer = MessageWriter::new(write_half);
        let mut reader = MessageReader::new(read_half);

        // Authentication: request tag, then a credential map. Option keys
        // are transmitted only when set.
        let mut entries = 3u32;
        let opts = config.options;
        entries += u32::from(opts.show_tree) + u32::from(opts.no_constant_fold) + u32::from(opts.no_exec);

        writer.write_uint8(RequestTag::Auth as u8);
        writer.write_map_header(entries);
        writer.write_str("login_name");
        writer.write_str(&config.login);
        writer.write_str("password");
        writer.write_str(&config.password);
        writer.write_str("database");
        writer.write_str(&config.database);
        if opts.show_tree {
            writer.write_str("opt_showtree");
            writer.write_bool(true);
        }
        if opts.no_constant_fold {
            writer.write_str("opt_no_cf");
            writer.write_bool(true);
        }
        if opts.no_exec {
            writer.write_str("opt_no_exec");
            writer.write_bool(true);
        }
        writer.flush().await?;

        // The server answers with a single response tag. Anything but
        // LOGIN_SUCCESS (including the dropped connection after a rejected
        // login) aborts the session.
        let tag = reader.read_uint8().await.map_err(|_| Error::LoginFailed)?;
        if tag != ResponseTag::LoginSuccess as u8 {
            return Err(Error::LoginFailed);
        }

        let shared = Arc::new(Shared {
            writer: Mutex::new(writer),
            closed: CancellationToken::new(),
        });

        spawn_keepalive(Arc::clone(&shared), config.keepalive_interval);

        tracing::debug!(server = %config.server_addr, "session established");

        Ok(Session {
            reader,
            shared,
            remote_server: config.server_addr.clone(),
            login_name: config.login.clone(),
        })
    }

    /// The address this session is connected to.
    #[must_use]
    pub fn remote_server(&self) -> &str {
        &self.remote_server
    }

    /// The login name this session authenticated with.
    #[must_use]
    pub fn login_name(&self) -> &str {
        &self.login_name
    }

    /// A handle that can close this session from another task.
    #[must_use]
    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Stop the keepalive task and tear down the socket.
    ///
    /// Idempotent and safe to call from any task at any time; a pending
    /// batch read fails with a transport error.
    pub async fn close(&self) {
        self.shared.close().await;
        tracing::debug!(server = %self.remote_server, "session closed");
    }

    /// Submit one batch of SQL text.
    pub(crate) async fn send_batch(&self, text: &str) -> Result<()> {
        let mut writer = self.shared.writer.lock().await;
        writer.write_uint8(RequestTag::Batch as u8);
        writer.write_str(text);

        match writer.flush().await {
            Ok(()) => Ok(()),
            // An oversized batch makes the server abort the connection
            // before reading it, so the failure shows up as a plain
            // transport error here.
            Err(_) if text.len() > MAX_BATCH_TEXT => Err(Error::BatchTooLarge),
            Err(e) => Err(e.into()),
        }
    }

    /// Read the next response tag.
    pub(crate) async fn read_response_tag(&mut self) -> Result<ResponseTag> {
        let closed = self.shared.closed.clone();
        let reader = &mut self.reader;
        let raw = tokio::select! {
            r = reader.read_uint8() => r?,
            () = closed.cancelled() => return Err(Error::SessionClosed),
        };
        ResponseTag::from_u8(raw)
            .ok_or_else(|| Error::Codec(ProtocolError::UnknownResponseTag(raw).into()))
    }

    /// Read one int64 payload (row counts, return codes).
    pub(crate) async fn read_int64(&mut self) -> Result<i64> {
        let closed = self.shared.closed.clone();
        let reader = &mut self.reader;
        tokio::select! {
            r = reader.read_int64() => Ok(r?),
            () = closed.cancelled() => Err(Error::SessionClosed),
        }
    }

    /// Read one string payload (informational messages).
    pub(crate) async fn read_string(&mut self) -> Result<String> {
        let closed = self.shared.closed.clone();
        let reader = &mut self.reader;
        tokio::select! {
            r = reader.read_string() => Ok(r?),
            () = closed.cancelled() => Err(Error::SessionClosed),
        }
    }

    /// Read the column-name list of a recordset announcement.
    pub(crate) async fn read_column_names(&mut self) -> Result<Vec<String>> {
        let closed = self.shared.closed.clone();
        let reader = &mut self.reader;
        tokio::select! {
            r = rsql_types::read_column_names(reader) => Ok(r?),
            () = closed.cancelled() => Err(Error::SessionClosed),
        }
    }

    /// Read a column-layout descriptor into a fresh null row.
    pub(crate) async fn read_row_layout(&mut self) -> Result<Vec<Field>> {
        let closed = self.shared.closed.clone();
        let reader = &mut self.reader;
        tokio::select! {
            r = rsql_types::read_row_layout(reader) => Ok(r?),
            () = closed.cancelled() => Err(Error::SessionClosed),
        }
    }

    /// Fill the current row with the next record's values.
    pub(crate) async fn read_row_values(&mut self, row: &mut [Field]) -> Result<()> {
        let closed = self.shared.closed.clone();
        let reader = &mut self.reader;
        tokio::select! {
            r = rsql_types::read_row_values(reader, row) => Ok(r?),
            () = closed.cancelled() => Err(Error::SessionClosed),
        }
    }

    /// Consume and discard a print payload: a layout followed by one row.
    pub(crate) async fn discard_print(&mut self) -> Result<()> {
        let closed = self.shared.closed.clone();
        let reader = &mut self.reader;
        tokio::select! {
            r = discard_print_inner(reader) => r,
            () = closed.cancelled() => Err(Error::SessionClosed),
        }
    }

    /// Read a structured error record, skipping unknown keys.
    pub(crate) async fn read_error_record(&mut self) -> Result<BatchError> {
        let closed = self.shared.closed.clone();
        let reader = &mut self.reader;
        tokio::select! {
            r = read_error_record_inner(reader) => r,
            () = closed.cancelled() => Err(Error::SessionClosed),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // A session dropped without close must not keep the keepalive task
        // (and with it the socket) alive.
        self.shared.closed.cancel();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("remote_server", &self.remote_server)
            .field("login_name", &self.login_name)
            .field("closed", &self.shared.closed.is_cancelled())
            .finish()
    }
}

/// Keep sending keepalive messages until the session is closed or a send
/// fails. The first failure stops the ticker silently: the connection is
/// broken and the next batch operation will surface it.
fn spawn_keepalive(shared: Arc<Shared>, period: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await; // the first tick completes immediately

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                () = shared.closed.cancelled() => return,
            }

            let mut writer = shared.writer.lock().await;
            writer.write_uint8(RequestTag::Keepalive as u8);
            if let Err(e) = writer.flush().await {
                tracing::debug!(error = %e, "keepalive send failed, stopping ticker");
                return;
            }
        }
    });
}

async fn discard_print_inner<R: AsyncRead + Unpin>(reader: &mut MessageReader<R>) -> Result<()> {
    let mut row = rsql_types::read_row_layout(reader).await?;
    rsql_types::read_row_values(reader, &mut row).await?;
    Ok(())
}

async fn read_error_record_inner<R: AsyncRead + Unpin>(
    reader: &mut MessageReader<R>,
) -> Result<BatchError> {
    let entries = reader.read_map_header().await?;
    let mut record = BatchError::default();

    for _ in 0..entries {
        let key = reader.read_string().await?;
        match key.as_str() {
            "src_file" => record.src_file = reader.read_string().await?,
            "src_line_no" => record.src_line_no = reader.read_int64().await?,
            "src_funcname" => record.src_funcname = reader.read_string().await?,
            "src_backtrace" => record.src_backtrace = reader.read_string().await?,
            "category" => record.category = reader.read_string().await?,
            "message" => record.message = reader.read_string().await?,
            "severity" => record.severity = reader.read_string().await?,
            "state" => record.state = reader.read_int64().await?,
            "text" => record.text = reader.read_string().await?,
            "line_no" => record.line_no = reader.read_int64().await?,
            "line_pos" => record.line_pos = reader.read_int64().await?,
            _ => reader.skip_value().await?,
        }
    }

    Ok(record)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use rsql_protocol::encode;

    #[tokio::test]
    async fn test_error_record_ignores_unknown_keys() {
        let mut buf = BytesMut::new();
        encode::append_map_header(&mut buf, 5);
        encode::append_str(&mut buf, "state");
        encode::append_int64(&mut buf, 1);
        encode::append_str(&mut buf, "text");
        encode::append_str(&mut buf, "divide by zero");
        encode::append_str(&mut buf, "introduced_later");
        encode::append_array_header(&mut buf, 2);
        encode::append_uint64(&mut buf, 1);
        encode::append_uint64(&mut buf, 2);
        encode::append_str(&mut buf, "line_no");
        encode::append_int64(&mut buf, 4);
        encode::append_str(&mut buf, "line_pos");
        encode::append_int64(&mut buf, 12);

        let mut reader = MessageReader::new(&buf[..]);
        let record = read_error_record_inner(&mut reader).await.unwrap();
        assert_eq!(record.state, 1);
        assert_eq!(record.text, "divide by zero");
        assert_eq!(record.line_no, 4);
        assert_eq!(record.line_pos, 12);
        assert_eq!(record.to_string(), "4:12[1] divide by zero");
    }
}
