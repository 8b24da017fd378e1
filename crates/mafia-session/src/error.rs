//! Error types for the session layer.

use mafia_protocol::{ErrorCode, SessionId};

/// Why a session operation was rejected.
///
/// None of these leave a mark on the session: the state is checked
/// before anything is mutated, so a bad call from one player never
/// affects the others.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// Usernames must not be the empty string.
    #[error("username must not be empty")]
    InvalidUsername,

    /// Another player in this session already uses the name.
    #[error("username {0} is already taken in this session")]
    UsernameTaken(String),

    /// Every seat is taken (the session has started or is over).
    #[error("session {0} is full")]
    SessionFull(SessionId),

    #[error("session has not started yet")]
    SessionNotStarted,

    #[error("session has ended")]
    SessionEnded,

    /// The voter is unknown or no longer alive.
    #[error("{0} can't vote")]
    InvalidVoter(String),

    /// The target is unknown or no longer alive (or is the checker's
    /// own seat being looked up as someone else's).
    #[error("{0} is not a valid target")]
    InvalidTarget(String),

    /// Wrong role or wrong phase for this action.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    #[error("{0} has already voted this phase")]
    AlreadyVoted(String),

    #[error("the sheriff can't check themselves")]
    SelfCheck,

    #[error("the check for this night has already been used")]
    CheckAlreadyUsed,

    /// The requester has no seat in this session.
    #[error("{0} is not in this session")]
    UnknownPlayer(String),
}

impl GameError {
    /// The wire code reported to the caller.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidUsername => ErrorCode::InvalidUsername,
            Self::UsernameTaken(_) => ErrorCode::UsernameTaken,
            Self::SessionFull(_) => ErrorCode::SessionFull,
            Self::SessionNotStarted => ErrorCode::SessionNotStarted,
            Self::SessionEnded => ErrorCode::SessionEnded,
            Self::InvalidVoter(_) => ErrorCode::InvalidVoter,
            Self::InvalidTarget(_) => ErrorCode::InvalidTarget,
            Self::NotAuthorized(_) => ErrorCode::NotAuthorized,
            Self::AlreadyVoted(_) => ErrorCode::AlreadyVoted,
            Self::SelfCheck => ErrorCode::SelfCheck,
            Self::CheckAlreadyUsed => ErrorCode::CheckAlreadyUsed,
            Self::UnknownPlayer(_) => ErrorCode::UnknownPlayer,
        }
    }
}

/// A [`RoleQuotas`](crate::RoleQuotas) combination that can't produce a
/// playable game.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuotaError {
    #[error("at least one mafia seat is required")]
    NoMafia,

    /// A started game would already be won by the mafia.
    #[error("mafia seats ({mafia}) must be fewer than the other seats ({others})")]
    MafiaMajority { mafia: usize, others: usize },
}
