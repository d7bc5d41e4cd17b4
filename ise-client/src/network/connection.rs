/// WebSocket connection to the assessment service
///
/// This module opens the signed channel and provides the write half used by
/// the session driver.

use crate::network::error::{NetworkError, NetworkResult};
use crate::network::signer::redact_url;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half of the WebSocket stream
pub type WsWriter = SplitSink<WsStream, Message>;

/// Read half of the WebSocket stream
pub type WsReader = SplitStream<WsStream>;

/// Open channel to the assessment service
///
/// One connection belongs to exactly one session.
///
/// # Example
/// ```no_run
/// use chrono::Utc;
/// use ise_client::network::{sign, Credentials, IseConnection, ServiceEndpoint};
///
/// #[tokio::main]
/// async fn main() {
///     let creds = Credentials::new("app-id", "api-key", "api-secret");
///     let url = sign(&creds, &ServiceEndpoint::default(), Utc::now()).unwrap();
///     let conn = IseConnection::connect(&url, 10_000).await.unwrap();
///     let (_writer, _reader) = conn.split();
/// }
/// ```
#[derive(Debug)]
pub struct IseConnection {
    /// WebSocket stream
    ws_stream: WsStream,
}

impl IseConnection {
    /// Connect to a signed assessment URL
    ///
    /// # Arguments
    /// * `url` - Signed URL produced by [`crate::network::sign`]
    /// * `timeout_ms` - Handshake timeout in milliseconds
    ///
    /// # Errors
    /// Returns `NetworkError` if the handshake fails, is rejected or times out
    pub async fn connect(url: &str, timeout_ms: u64) -> NetworkResult<Self> {
        info!("Connecting to assessment service at {}", redact_url(url));

        let connect_future = connect_async(url);
        let timeout = tokio::time::Duration::from_millis(timeout_ms);

        let (ws_stream, response) = tokio::time::timeout(timeout, connect_future)
            .await
            .map_err(|_| NetworkError::Timeout(timeout_ms))?
            .map_err(|e| {
                if let tokio_tungstenite::tungstenite::Error::Http(resp) = &e {
                    let status = resp.status().as_u16();
                    if status == 401 || status == 403 {
                        return NetworkError::AuthenticationFailed(status);
                    }
                }
                NetworkError::ConnectionFailed(e.to_string())
            })?;

        info!(
            "Connected to assessment service (status: {})",
            response.status()
        );

        Ok(Self { ws_stream })
    }

    /// Split the connection into separate write and read halves
    ///
    /// The write half is wrapped in a [`FrameWriter`] so closing it twice is harmless.
    pub fn split(self) -> (FrameWriter, WsReader) {
        let (writer, reader) = self.ws_stream.split();
        (FrameWriter::new(writer), reader)
    }
}

/// Serializing write half with idempotent close
pub struct FrameWriter {
    inner: WsWriter,
    closed: bool,
    frames_sent: usize,
}

impl FrameWriter {
    /// Wrap a raw write half
    pub fn new(inner: WsWriter) -> Self {
        Self {
            inner,
            closed: false,
            frames_sent: 0,
        }
    }

    /// Serialize a frame to JSON and send it as a text message
    ///
    /// # Errors
    /// Returns `NetworkError::ConnectionClosed` after [`FrameWriter::close`],
    /// or the underlying serialization / WebSocket error
    pub async fn send<T: Serialize>(&mut self, frame: &T) -> NetworkResult<()> {
        if self.closed {
            return Err(NetworkError::ConnectionClosed);
        }

        let json = serde_json::to_string(frame)?;
        debug!("Sending frame #{} ({} bytes)", self.frames_sent + 1, json.len());

        self.inner.send(Message::Text(json.into())).await?;
        self.frames_sent += 1;

        Ok(())
    }

    /// Close the channel
    ///
    /// Safe to call any number of times; transport errors while closing are
    /// logged and swallowed.
    pub async fn close(&mut self) {
        if self.closed {
            debug!("Channel already closed");
            return;
        }
        self.closed = true;

        match self.inner.close().await {
            Ok(()) => info!("Assessment channel closed after {} frames", self.frames_sent),
            Err(e) => warn!("Error while closing assessment channel: {}", e),
        }
    }

    /// Check if the writer has been closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of frames written so far
    pub fn frames_sent(&self) -> usize {
        self.frames_sent
    }
}
