//! Game-level types shared by the server core and its clients.
//!
//! Everything here is data: roles, teams, phases, the roster views that
//! players are allowed to see, and the events pushed to every participant.
//! No behavior beyond small helpers lives in this module.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Identifier of one game session.
///
/// Newtype over `u64` so a session id can't be mixed up with a phase
/// number or a request id. Serialized as a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Roles and teams
// ---------------------------------------------------------------------------

/// The secret role a player receives when joining a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Role {
    /// Votes at night to eliminate a player.
    Mafia,
    /// May check one player's true role each night.
    Sheriff,
    /// No night action.
    Civilian,
}

impl Role {
    /// The team this role plays for.
    pub fn team(self) -> Team {
        match self {
            Self::Mafia => Team::Mafia,
            Self::Sheriff | Self::Civilian => Team::Civilians,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mafia => write!(f, "mafia"),
            Self::Sheriff => write!(f, "sheriff"),
            Self::Civilian => write!(f, "civilian"),
        }
    }
}

/// One of the two sides that can win a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Team {
    Mafia,
    Civilians,
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mafia => write!(f, "mafia"),
            Self::Civilians => write!(f, "civilians"),
        }
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// The phase counter of a session.
///
/// `0` means the session hasn't started. After that the counter goes up
/// by exactly one per resolved phase: odd values are nights, even values
/// are days.
///
/// ```text
/// 0 (lobby) → 1 (night 1) → 2 (day 1) → 3 (night 2) → 4 (day 2) → ...
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
    Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Phase(pub u32);

impl Phase {
    /// Phase value before the session has started.
    pub const LOBBY: Self = Self(0);

    /// The first phase of every started session.
    pub const FIRST_NIGHT: Self = Self(1);

    /// Returns `true` for odd counters.
    pub fn is_night(self) -> bool {
        self.0 % 2 == 1
    }

    /// Returns `true` for even, non-zero counters.
    pub fn is_day(self) -> bool {
        self.0 != 0 && self.0 % 2 == 0
    }

    /// Which night/day pair this phase belongs to (night 1 and day 1
    /// both return 1). Returns 0 in the lobby.
    pub fn round(self) -> u32 {
        self.0.div_ceil(2)
    }

    /// The phase that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_night() {
            write!(f, "night {}", self.round())
        } else if self.is_day() {
            write!(f, "day {}", self.round())
        } else {
            write!(f, "lobby")
        }
    }
}

// ---------------------------------------------------------------------------
// Roster views
// ---------------------------------------------------------------------------

/// One roster entry as a particular player is allowed to see it.
///
/// `role` is `None` when the role is hidden from the viewer. Players always
/// see their own role; everyone's role is revealed once the session ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub username: String,
    pub role: Option<Role>,
    pub alive: bool,
}

/// What `GetState` returns: the session as seen by one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub phase: Phase,
    /// The requesting player, role always visible.
    pub you: PlayerView,
    /// Every player in the session, ordered by username.
    pub players: Vec<PlayerView>,
    /// Set once the session has ended.
    pub winner: Option<Team>,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Server-push notifications delivered on each player's event stream.
///
/// Every variant except `SessionStarted` is broadcast to all players of
/// the session. `SessionStarted` is private: each player gets their own
/// copy carrying their own role.
///
/// Internally tagged, so `PlayerJoined` becomes
/// `{ "type": "PlayerJoined", "username": "alice" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A player took a seat in the session.
    PlayerJoined { username: String },

    /// The last seat was filled; the first night begins.
    SessionStarted {
        your_role: Role,
        players: Vec<PlayerView>,
    },

    /// A phase resolved and its vote target is out of the game.
    /// `phase` is the phase that resolved (a night kill or a day vote).
    PlayerEliminated { username: String, phase: Phase },

    /// A living player's stream closed; they count as dead from now on.
    PlayerDisconnected { username: String },

    /// A team won. Every role is revealed in `players`.
    SessionEnded {
        winner: Team,
        players: Vec<PlayerView>,
    },
}

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Machine-readable reason a request was rejected.
///
/// All of these are local to the caller: the session keeps running
/// and no other player is affected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ErrorCode {
    InvalidUsername,
    UsernameTaken,
    SessionFull,
    UnknownToken,
    SessionNotStarted,
    SessionEnded,
    InvalidVoter,
    InvalidTarget,
    NotAuthorized,
    AlreadyVoted,
    SelfCheck,
    CheckAlreadyUsed,
    /// The requester has no seat in the session.
    UnknownPlayer,
    /// The request couldn't be decoded or isn't valid on this connection.
    BadRequest,
}

// =========================================================================
// Tests
// =========================================================================
