//! Transport layer for Whodunit.
//!
//! Provides the [`Transport`] and [`Connection`] traits the server is
//! written against, plus a WebSocket implementation. A transport has three
//! jobs and no others: hand each connection a unique [`ConnectionId`],
//! deliver text frames in order, and report when a connection is gone
//! (`recv` returning `Ok(None)` or an error).
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{PendingWebSocket, UPGRADE_TIMEOUT, WebSocketConnection, WebSocketTransport};

use std::fmt;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
///
/// Accepting is split in two so the listener never waits on a peer:
/// [`accept`](Self::accept) only takes the next socket, and the protocol
/// handshake runs later through [`Incoming::upgrade`], usually on the
/// connection's own task.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// A socket that has been accepted but not yet upgraded.
    type Pending: Incoming<Connection = Self::Connection, Error = Self::Error>;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming socket.
    async fn accept(&mut self) -> Result<Self::Pending, Self::Error>;
}

/// An accepted socket whose protocol handshake has not run yet.
pub trait Incoming: Send + 'static {
    /// The connection this socket becomes once upgraded.
    type Connection: Connection;
    /// The error type for the upgrade.
    type Error: std::error::Error + Send + Sync;

    /// Runs the handshake. Fails if the peer does not finish it in time.
    async fn upgrade(self) -> Result<Self::Connection, Self::Error>;
}

/// A single connection carrying text frames.
///
/// `send` and `recv` may be called concurrently from different tasks: the
/// server reads requests on one task while a writer task drains the
/// connection's outbound queue.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one text frame.
    async fn send(&self, text: &str) -> Result<(), Self::Error>;

    /// Receives the next text frame.
    ///
    /// Returns `Ok(None)` when the peer closed the connection cleanly.
    async fn recv(&self) -> Result<Option<String>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// The request path the connection was opened on, e.g. `/elimination`.
    fn route(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(1), "alice");
        map.insert(ConnectionId::new(2), "bob");
        assert_eq!(map[&ConnectionId::new(1)], "alice");
        assert_ne!(ConnectionId::new(1), ConnectionId::new(2));
    }
}
