//! Reconnecting support channel.
//!
//! `SocketChannel` keeps one WebSocket alive for the lifetime of a
//! conversation: outbound events are queued into the socket task, inbound
//! frames are decoded and broadcast to subscribers, and a dropped
//! connection is re-established with bounded, backed-off retries.
//!
//! The channel does not resend anything on reconnect; in-flight messages
//! are the caller's concern (the controller keeps its placeholder visible
//! and the session identity stable across reconnects).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{error, info, warn};

use helpline_core::channel::RealtimeChannel;
use helpline_core::error::{HelplineError, Result};
use helpline_core::protocol::{ClientEvent, ServerEvent};

use crate::transport::{SocketTransport, WsSink, WsStream};

const INBOUND_BUFFER: usize = 100;

/// Configuration for the socket channel.
///
/// Defaults mirror the browser client's socket settings.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// WebSocket endpoint of the support backend.
    pub url: String,
    /// Maximum reconnection attempts before giving up (0 = unlimited).
    pub max_reconnect_attempts: u32,
    /// Initial delay between reconnection attempts.
    pub reconnect_delay: Duration,
    /// Upper bound for the reconnection backoff.
    pub reconnect_delay_max: Duration,
    /// Timeout for a single connection attempt.
    pub connect_timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8000/ws".to_string(),
            max_reconnect_attempts: 10,
            reconnect_delay: Duration::from_millis(500),
            reconnect_delay_max: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(20),
        }
    }
}

/// Why the socket pump stopped.
enum PumpExit {
    /// `disconnect()` was called.
    Shutdown,
    /// Every outbound sender is gone; nothing left to serve.
    OutboundClosed,
    /// The connection dropped; reconnection should be attempted.
    ConnectionLost,
}

/// A `RealtimeChannel` over one reconnecting WebSocket.
///
/// # Lifecycle
///
/// `connect()` establishes the first connection (failing fast if the
/// backend is unreachable) and spawns the socket task; afterwards the task
/// owns reconnection. `disconnect()` shuts the task down for good; a
/// channel is not reusable after that; construct a new one.
pub struct SocketChannel {
    config: ChannelConfig,
    outbound_tx: mpsc::UnboundedSender<ClientEvent>,
    outbound_rx: std::sync::Mutex<Option<mpsc::UnboundedReceiver<ClientEvent>>>,
    inbound_tx: broadcast::Sender<ServerEvent>,
    connected: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SocketChannel {
    /// Creates a channel; no connection is made until `connect()`.
    pub fn new(config: ChannelConfig) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, _) = broadcast::channel(INBOUND_BUFFER);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            outbound_tx,
            outbound_rx: std::sync::Mutex::new(Some(outbound_rx)),
            inbound_tx,
            connected: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            task: tokio::sync::Mutex::new(None),
        }
    }
}

#[async_trait]
impl RealtimeChannel for SocketChannel {
    async fn connect(&self) -> Result<()> {
        let outbound_rx = {
            let mut guard = self
                .outbound_rx
                .lock()
                .map_err(|_| HelplineError::internal("Outbound queue lock poisoned"))?;
            guard
                .take()
                .ok_or_else(|| HelplineError::internal("Channel already connected"))?
        };

        let attempt = timeout(
            self.config.connect_timeout,
            SocketTransport::connect(&self.config.url),
        )
        .await
        .unwrap_or_else(|_| {
            Err(HelplineError::transport(format!(
                "Connection attempt to {} timed out",
                self.config.url
            )))
        });

        let transport = match attempt {
            Ok(transport) => transport,
            Err(e) => {
                // Hand the queue back so connect() can be retried.
                if let Ok(mut guard) = self.outbound_rx.lock() {
                    *guard = Some(outbound_rx);
                }
                return Err(e);
            }
        };

        self.connected.store(true, Ordering::SeqCst);
        info!(url = %self.config.url, "Support channel connected");

        let handle = tokio::spawn(run_loop(
            self.config.clone(),
            transport,
            outbound_rx,
            self.inbound_tx.clone(),
            self.connected.clone(),
            self.shutdown_tx.subscribe(),
        ));
        *self.task.lock().await = Some(handle);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.task.lock().await.take() {
            let _ = handle.await;
        }
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, event: ClientEvent) -> Result<()> {
        if !self.is_connected() {
            return Err(HelplineError::transport("Channel is disconnected"));
        }
        self.outbound_tx
            .send(event)
            .map_err(|_| HelplineError::transport("Socket task has stopped"))
    }

    fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.inbound_tx.subscribe()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Socket task: pump the live connection, reconnect when it drops.
async fn run_loop(
    config: ChannelConfig,
    mut transport: SocketTransport,
    mut outbound_rx: mpsc::UnboundedReceiver<ClientEvent>,
    inbound_tx: broadcast::Sender<ServerEvent>,
    connected: Arc<AtomicBool>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let exit = pump(transport, &mut outbound_rx, &inbound_tx, &mut shutdown_rx).await;
        connected.store(false, Ordering::SeqCst);

        match exit {
            PumpExit::Shutdown | PumpExit::OutboundClosed => return,
            PumpExit::ConnectionLost => {}
        }

        transport = match reconnect(&config, &mut shutdown_rx).await {
            Some(transport) => transport,
            None => return,
        };
        connected.store(true, Ordering::SeqCst);
        info!(url = %config.url, "Support channel reconnected");
    }
}

/// Serves one live connection until it drops or the channel shuts down.
async fn pump(
    transport: SocketTransport,
    outbound_rx: &mut mpsc::UnboundedReceiver<ClientEvent>,
    inbound_tx: &broadcast::Sender<ServerEvent>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> PumpExit {
    let (mut sink, mut stream): (WsSink, WsStream) = transport.split();

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                let _ = sink.send(Message::Close(None)).await;
                return PumpExit::Shutdown;
            }
            maybe_event = outbound_rx.recv() => {
                let Some(event) = maybe_event else {
                    return PumpExit::OutboundClosed;
                };
                let text = match event.encode() {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "Dropping unencodable outbound event");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(text)).await {
                    warn!(error = %e, "Outbound send failed; connection lost");
                    return PumpExit::ConnectionLost;
                }
            }
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(event) = ServerEvent::decode(&text) {
                            // Only fails when nobody is subscribed.
                            let _ = inbound_tx.send(event);
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        warn!("Server closed the connection");
                        return PumpExit::ConnectionLost;
                    }
                    Some(Ok(_)) => {} // Skip binary, ping, pong, frame messages
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error; connection lost");
                        return PumpExit::ConnectionLost;
                    }
                }
            }
        }
    }
}

/// Re-establishes the connection with exponential backoff.
///
/// Returns `None` when the retry attempts are exhausted or shutdown was
/// requested while waiting.
async fn reconnect(
    config: &ChannelConfig,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Option<SocketTransport> {
    let mut attempts = 0u32;
    let mut delay = config.reconnect_delay;

    loop {
        attempts += 1;
        if config.max_reconnect_attempts > 0 && attempts > config.max_reconnect_attempts {
            error!(
                max = config.max_reconnect_attempts,
                "Max reconnection attempts exceeded; giving up"
            );
            return None;
        }

        tokio::select! {
            _ = shutdown_rx.changed() => return None,
            _ = sleep(delay) => {}
        }
        delay = (delay * 2).min(config.reconnect_delay_max);

        warn!(
            attempt = attempts,
            max = config.max_reconnect_attempts,
            "Connection lost, attempting reconnection"
        );

        match timeout(config.connect_timeout, SocketTransport::connect(&config.url)).await {
            Ok(Ok(transport)) => return Some(transport),
            Ok(Err(e)) => warn!(error = %e, attempt = attempts, "Reconnection failed"),
            Err(_) => warn!(attempt = attempts, "Reconnection attempt timed out"),
        }
    }
}
