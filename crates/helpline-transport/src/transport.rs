//! WebSocket transport layer.
//!
//! Single responsibility: connect to a WebSocket and send/receive JSON text
//! frames. No knowledge of the chat protocol or reconnection policy.

use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};
use tracing::debug;

use helpline_core::error::{HelplineError, Result};

/// Type alias for the WebSocket send half
pub type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>, Message>;

/// Type alias for the WebSocket receive half
pub type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// A connected WebSocket transport.
///
/// This type represents a raw WebSocket connection with no protocol
/// knowledge. It can only be constructed via `SocketTransport::connect()`.
pub struct SocketTransport {
    sink: WsSink,
    stream: WsStream,
}

impl SocketTransport {
    /// Connect to a WebSocket endpoint.
    ///
    /// Returns a transport only when the connection is established.
    pub async fn connect(url: &str) -> Result<Self> {
        debug!(url = %url, "Connecting to WebSocket");

        let (ws, _) = connect_async(url)
            .await
            .map_err(|e| HelplineError::transport(format!("WebSocket connect failed: {}", e)))?;

        let (sink, stream) = ws.split();

        debug!(url = %url, "WebSocket connected");
        Ok(Self { sink, stream })
    }

    /// Send a text frame.
    pub async fn send(&mut self, text: String) -> Result<()> {
        self.sink
            .send(Message::Text(text))
            .await
            .map_err(|e| HelplineError::transport(format!("Failed to send: {}", e)))
    }

    /// Receive the next text frame.
    ///
    /// Returns None if the connection is closed.
    /// Skips non-text messages (ping/pong handled automatically).
    pub async fn recv(&mut self) -> Result<Option<String>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Ok(_)) => continue, // Skip binary, ping, pong, frame messages
                Some(Err(e)) => {
                    return Err(HelplineError::transport(format!("WebSocket error: {}", e)));
                }
                None => return Ok(None), // Stream ended
            }
        }
    }

    /// Split into separate sink and stream for concurrent send/receive.
    pub fn split(self) -> (WsSink, WsStream) {
        (self.sink, self.stream)
    }
}
