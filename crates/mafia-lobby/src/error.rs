//! Error types for the lobby.

use mafia_protocol::ErrorCode;
use mafia_session::GameError;

/// Why a lobby call was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LobbyError {
    /// The token was never issued, or its session has been reclaimed.
    #[error("unknown session token")]
    UnknownToken,

    /// The session itself refused the action.
    #[error(transparent)]
    Game(#[from] GameError),
}

impl LobbyError {
    /// The wire code reported to the caller.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownToken => ErrorCode::UnknownToken,
            Self::Game(err) => err.code(),
        }
    }
}
