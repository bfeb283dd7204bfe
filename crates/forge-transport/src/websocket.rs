//! WebSocket transport implementation using `tokio-tungstenite`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Default ceiling on a single incoming frame, matching the spec's
/// "rejects payloads over a size limit" requirement.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 256 * 1024;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
    max_payload_bytes: usize,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        Self::bind_with_max_payload(addr, DEFAULT_MAX_PAYLOAD_BYTES).await
    }

    /// Binds a new WebSocket transport, rejecting any incoming frame
    /// larger than `max_payload_bytes` on every connection it accepts.
    pub async fn bind_with_max_payload(
        addr: &str,
        max_payload_bytes: usize,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            TransportError::AcceptFailed(e)
        })?;
        tracing::info!(addr, max_payload_bytes, "WebSocket transport listening");
        Ok(Self { listener, max_payload_bytes })
    }

    /// Returns the address this transport is actually bound to (useful
    /// when `bind` was given a `:0` port and the OS picked one).
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| {
                TransportError::AcceptFailed(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                ))
            })?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %addr, "accepted WebSocket connection");

        Ok(WebSocketConnection {
            id,
            ws: Arc::new(Mutex::new(ws)),
            max_payload_bytes: self.max_payload_bytes,
            last_activity_ms: AtomicU64::new(wall_clock_ms()),
        })
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// A single WebSocket connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    ws: Arc<Mutex<WsStream>>,
    max_payload_bytes: usize,
    /// Wall-clock timestamp of the last frame seen from the peer,
    /// including pings/pongs — the heartbeat loop's liveness check reads
    /// this rather than tracking pong arrival alone, since any traffic
    /// proves the connection is up.
    last_activity_ms: AtomicU64,
}

impl WebSocketConnection {
    /// Sends a heartbeat ping. Callers drive this on their own interval
    /// (see `forge`'s connection handler); the transport layer doesn't
    /// run its own timer, matching how `send`/`recv` are driven by the
    /// caller rather than this crate.
    pub async fn send_ping(&self) -> Result<(), TransportError> {
        use futures_util::SinkExt;
        self.ws
            .lock()
            .await
            .send(Message::Ping(Vec::new().into()))
            .await
            .map_err(|e| {
                TransportError::SendFailed(std::io::Error::new(std::io::ErrorKind::BrokenPipe, e))
            })
    }

    /// Milliseconds since the epoch at which any frame (data, ping, or
    /// pong) was last observed from the peer.
    pub fn last_activity_ms(&self) -> u64 {
        self.last_activity_ms.load(Ordering::Relaxed)
    }

    /// Whether the connection has been silent longer than `timeout`.
    pub fn is_stale(&self, timeout: Duration) -> bool {
        let elapsed = wall_clock_ms().saturating_sub(self.last_activity_ms());
        elapsed > timeout.as_millis() as u64
    }

    fn touch(&self) {
        self.last_activity_ms.store(wall_clock_ms(), Ordering::Relaxed);
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        use futures_util::SinkExt;
        let msg = Message::Binary(data.to_vec().into());
        self.ws
            .lock()
            .await
            .send(msg)
            .await
            .map_err(|e| {
                TransportError::SendFailed(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    e,
                ))
            })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        use futures_util::StreamExt;
        loop {
            let msg = self.ws.lock().await.next().await;
            match msg {
                Some(Ok(Message::Binary(data))) => {
                    self.touch();
                    if data.len() > self.max_payload_bytes {
                        return Err(TransportError::PayloadTooLarge {
                            size: data.len(),
                            limit: self.max_payload_bytes,
                        });
                    }
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Text(text))) => {
                    self.touch();
                    if text.len() > self.max_payload_bytes {
                        return Err(TransportError::PayloadTooLarge {
                            size: text.len(),
                            limit: self.max_payload_bytes,
                        });
                    }
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                    // tungstenite answers Ping with Pong on our behalf;
                    // either is proof of life for the heartbeat check.
                    self.touch();
                    continue;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.ws.lock().await.close(None).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
