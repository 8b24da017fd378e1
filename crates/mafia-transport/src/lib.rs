//! Transport layer for the Mafia server.
//!
//! A player needs one long-lived, two-way channel: the server pushes game
//! events down it whenever they happen, while also reading the player's
//! requests from it. [`Transport`] hands out such channels and
//! [`Connection`] is one of them.
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
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique number of an accepted connection. Only used to tie log
/// lines together; the game identifies players by token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocates the next id.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Listens for players.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next player connection, handshake included.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// The address being listened on. Useful after binding port `0`.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// One player's channel, carrying whole frames.
///
/// `send` and `recv` may run at the same time from the same task, e.g.
/// in two arms of a `tokio::select!`: a `recv` waiting for the player's
/// next request never holds up an event push.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Sends one frame.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next frame, or `Ok(None)` once the peer has closed.
    ///
    /// Cancel-safe: if the future is dropped before it completes, no
    /// frame is lost.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Starts the closing handshake.
    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;

    /// The remote end, as seen when the connection was accepted.
    fn peer_addr(&self) -> SocketAddr;
}
