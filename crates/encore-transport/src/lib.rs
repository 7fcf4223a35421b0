//! Connection layer for Encore.
//!
//! The room engine never touches sockets. It sees a [`Connection`]: an
//! ordered, reliable, per-client channel of text frames with a stable
//! [`ConnectionId`], plus a [`Transport`] that hands out new connections.
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
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::net::SocketAddr;

/// Opaque identifier for a connection, unique for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
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
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Address the listener is bound to.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// A single client connection carrying text frames.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one text frame to the peer.
    async fn send(&self, frame: &str) -> Result<(), Self::Error>;

    /// Receives the next data frame (text or binary) as raw bytes.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Remote address of the peer.
    fn peer_addr(&self) -> SocketAddr;
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
    fn test_connection_id_orders_by_value() {
        let mut ids = vec![ConnectionId::new(3), ConnectionId::new(1), ConnectionId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![ConnectionId::new(1), ConnectionId::new(2), ConnectionId::new(3)]);
    }
}
