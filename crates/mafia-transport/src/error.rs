//! Error types for the transport layer.

use std::io;

/// A failure on the listener or on one player connection.
///
/// Listener failures ([`Bind`](Self::Bind), [`Accept`](Self::Accept),
/// [`Upgrade`](Self::Upgrade)) concern a connection that never reached
/// the game. The others end one player's connection and nothing else.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to accept TCP connection: {0}")]
    Accept(#[source] io::Error),

    /// The TCP stream connected but the WebSocket handshake didn't
    /// complete.
    #[error("WebSocket upgrade failed: {0}")]
    Upgrade(String),

    /// The peer is gone.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_names_address() {
        let err = TransportError::Bind {
            addr: "10.0.0.1:9000".into(),
            source: io::Error::from(io::ErrorKind::AddrInUse),
        };
        assert!(err.to_string().contains("10.0.0.1:9000"));
    }
}
