//! Unified error type for the Mafia server.

use mafia_lobby::LobbyError;
use mafia_protocol::ProtocolError;
use mafia_session::QuotaError;
use mafia_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
#[derive(Debug, thiserror::Error)]
pub enum MafiaError {
    /// Connection, send or receive failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame couldn't be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A lobby or game rule rejected the call.
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// The configured role quotas can't make a playable game.
    #[error("invalid role quotas: {0}")]
    Quota(#[from] QuotaError),
}

#[cfg(test)]
mod tests {
    use mafia_session::GameError;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let mafia_err: MafiaError = err.into();
        assert!(matches!(mafia_err, MafiaError::Transport(_)));
        assert!(mafia_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let mafia_err: MafiaError = err.into();
        assert!(matches!(mafia_err, MafiaError::Protocol(_)));
    }

    #[test]
    fn test_from_lobby_error() {
        let err = LobbyError::Game(GameError::SessionEnded);
        let mafia_err: MafiaError = err.into();
        assert!(matches!(mafia_err, MafiaError::Lobby(_)));
        assert_eq!(mafia_err.to_string(), "session has ended");
    }

    #[test]
    fn test_from_quota_error() {
        let mafia_err: MafiaError = QuotaError::NoMafia.into();
        assert!(matches!(mafia_err, MafiaError::Quota(_)));
        assert!(mafia_err.to_string().starts_with("invalid role quotas"));
    }
}
