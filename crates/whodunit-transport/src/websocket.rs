//! WebSocket transport implementation using `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

use crate::{Connection, ConnectionId, Incoming, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// How long a peer has to send its HTTP upgrade request.
pub const UPGRADE_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
    upgrade_timeout: Duration,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::BindFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self {
            listener,
            upgrade_timeout: UPGRADE_TIMEOUT,
        })
    }

    /// Replaces [`UPGRADE_TIMEOUT`] for sockets accepted from now on.
    pub fn with_upgrade_timeout(mut self, timeout: Duration) -> Self {
        self.upgrade_timeout = timeout;
        self
    }

    /// Returns the bound address (useful when binding port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Pending = PendingWebSocket;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Pending, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::trace!(%addr, "accepted TCP connection");
        Ok(PendingWebSocket {
            stream,
            addr,
            timeout: self.upgrade_timeout,
        })
    }
}

/// A TCP socket waiting for its WebSocket upgrade request.
pub struct PendingWebSocket {
    stream: TcpStream,
    addr: SocketAddr,
    timeout: Duration,
}

impl PendingWebSocket {
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Incoming for PendingWebSocket {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn upgrade(self) -> Result<Self::Connection, Self::Error> {
        let Self {
            stream,
            addr,
            timeout,
        } = self;

        // The upgrade request's path picks which game the connection plays.
        let mut route = String::from("/");
        let capture_route = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            route = req.uri().path().to_owned();
            Ok(resp)
        };
        let upgrade = tokio_tungstenite::accept_hdr_async(stream, capture_route);
        let ws = match tokio::time::timeout(timeout, upgrade).await {
            Ok(Ok(ws)) => ws,
            Ok(Err(e)) => {
                return Err(TransportError::AcceptFailed(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                )));
            }
            Err(_) => {
                tracing::debug!(%addr, "WebSocket upgrade timed out");
                return Err(TransportError::AcceptFailed(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "WebSocket upgrade timed out",
                )));
            }
        };

        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %addr, %route, "accepted WebSocket connection");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            route,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

/// A single WebSocket connection.
///
/// The socket is split so a reader blocked in [`recv`](Connection::recv)
/// never holds up a concurrent [`send`](Connection::send).
pub struct WebSocketConnection {
    id: ConnectionId,
    route: String,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, text: &str) -> Result<(), Self::Error> {
        self.sink
            .lock()
            .await
            .send(Message::Text(text.to_owned().into()))
            .await
            .map_err(|e| {
                TransportError::SendFailed(std::io::Error::new(std::io::ErrorKind::BrokenPipe, e))
            })
    }

    async fn recv(&self) -> Result<Option<String>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_owned())),
                Some(Ok(Message::Binary(data))) => {
                    return String::from_utf8(data.to_vec())
                        .map(Some)
                        .map_err(|_| TransportError::InvalidText);
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink.lock().await.close().await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(std::io::ErrorKind::BrokenPipe, e))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn route(&self) -> &str {
        &self.route
    }
}
