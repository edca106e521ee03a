//! Scripted mock RSQL server.

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use rsql_codec::{CodecError, MessageReader};
use rsql_protocol::{RequestTag, ResponseTag};

use crate::script::ResponseScript;

/// A mock RSQL server bound to an ephemeral local port.
///
/// Accepts a single connection, performs the authentication exchange, then
/// answers each received batch with the next scripted response stream.
/// Keepalive requests are consumed and ignored at any point. When the
/// script is exhausted the server keeps the connection open (so tests can
/// exercise close-from-another-task) unless
/// [`MockServerBuilder::close_after_last_response`] was set.
pub struct MockServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl MockServer {
    /// Start building a mock server.
    #[must_use]
    pub fn builder() -> MockServerBuilder {
        MockServerBuilder::default()
    }

    /// The address the server is listening on.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// A connection string pointing at this server.
    #[must_use]
    pub fn connection_string(&self) -> String {
        format!(
            "server={};login=sa;password=changeme;database=mytest",
            self.addr
        )
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl std::fmt::Debug for MockServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockServer").field("addr", &self.addr).finish()
    }
}

/// Configuration for a [`MockServer`].
#[derive(Debug, Default)]
pub struct MockServerBuilder {
    reject_login: bool,
    responses: Vec<Bytes>,
    close_after_last: bool,
}

impl MockServerBuilder {
    /// Answer the authentication exchange with `LOGIN_FAILED` and drop the
    /// connection.
    #[must_use]
    pub fn reject_login(mut self) -> Self {
        self.reject_login = true;
        self
    }

    /// Queue the response stream for the next received batch.
    #[must_use]
    pub fn response(mut self, script: ResponseScript) -> Self {
        self.responses.push(script.into_bytes());
        self
    }

    /// Drop the connection right after the last scripted response has been
    /// sent, the way the server behaves after a state-127 error.
    #[must_use]
    pub fn close_after_last_response(mut self) -> Self {
        self.close_after_last = true;
        self
    }

    /// Bind an ephemeral port and start serving.
    pub async fn start(self) -> std::io::Result<MockServer> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            let Ok((stream, peer)) = listener.accept().await else {
                return;
            };
            tracing::debug!(%peer, "mock server accepted connection");
            if let Err(e) = serve_connection(stream, self).await {
                tracing::debug!(error = %e, "mock server connection ended");
            }
        });

        Ok(MockServer { addr, handle })
    }
}

async fn serve_connection(
    stream: TcpStream,
    config: MockServerBuilder,
) -> Result<(), CodecError> {
    stream.set_nodelay(true)?;
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = MessageReader::new(read_half);

    if !authenticate(&mut reader, &mut write_half, config.reject_login).await? {
        return Ok(());
    }

    let mut responses = config.responses.into_iter();
    loop {
        // Client closing the socket is the normal way a test ends.
        let tag = match reader.read_uint8().await {
            Ok(tag) => tag,
            Err(_) => return Ok(()),
        };

        if tag == RequestTag::Keepalive as u8 {
            continue;
        }
        if tag != RequestTag::Batch as u8 {
            return Ok(());
        }

        let sql = reader.read_string().await?;
        tracing::debug!(bytes = sql.len(), "mock server received batch");

        let Some(frame) = responses.next() else {
            // Script exhausted: hold the connection open so the client
            // blocks, as a quiet real server would.
            continue;
        };
        write_half.write_all(&frame).await?;
        write_half.flush().await?;

        if responses.len() == 0 && config.close_after_last {
            return Ok(());
        }
    }
}

async fn authenticate(
    reader: &mut MessageReader<tokio::net::tcp::OwnedReadHalf>,
    write_half: &mut OwnedWriteHalf,
    reject: bool,
) -> Result<bool, CodecError> {
    let tag = reader.read_uint8().await?;
    if tag != RequestTag::Auth as u8 {
        return Ok(false);
    }

    let entries = reader.read_map_header().await?;
    for _ in 0..entries {
        let _key = reader.read_string().await?;
        reader.skip_value().await?;
    }

    let answer = if reject {
        ResponseTag::LoginFailed
    } else {
        ResponseTag::LoginSuccess
    };
    write_half.write_all(&[answer as u8]).await?;
    write_half.flush().await?;

    Ok(!reject)
}
