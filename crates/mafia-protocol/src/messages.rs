//! Request and response frames exchanged over a player's connection.
//!
//! The flow on one connection:
//!
//! ```text
//! client                                   server
//!   │ ClientMessage { Join }  ──────────────→ │
//!   │ ←──────────── Envelope { Reply Joined } │  token first, always
//!   │ ←──────────── Envelope { Event ... }    │  push stream
//!   │ ClientMessage { Vote }  ──────────────→ │
//!   │ ←──────────── Envelope { Reply Voted }  │
//!   │ ←──────────── Envelope { Event ... }    │
//! ```
//!
//! Replies echo the `id` of the request they answer, so a client can
//! match them up even though events are interleaved on the same stream.

use serde::{Deserialize, Serialize};

use crate::{ErrorCode, Event, Role, SessionId, SessionSnapshot};

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// What a client asks the server to do.
///
/// After `Join` succeeds the connection is bound to the issued token, so
/// the other actions never carry a username: the server acts for whoever
/// joined on this connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    /// Take a seat in the currently open session.
    Join { username: String },
    /// Vote to eliminate `target` in the current phase.
    Vote { target: String },
    /// Sheriff only: learn `target`'s true role.
    Check { target: String },
    /// Fetch the session as this player may see it.
    GetState,
}

/// A request frame. `id` is chosen by the client and echoed in the reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMessage {
    pub id: u64,
    pub action: Action,
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// The answer to one [`Action`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Reply {
    /// Join accepted. `token` identifies this player from now on.
    Joined {
        token: String,
        session_id: SessionId,
    },
    /// Vote recorded.
    Voted,
    /// Result of a sheriff check.
    Checked { username: String, role: Role },
    /// Answer to `GetState`.
    State { snapshot: SessionSnapshot },
    /// The action was rejected. Nothing changed.
    Error { code: ErrorCode, message: String },
}

impl Reply {
    /// Builds an error reply.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }
}

/// The content of a server frame.
///
/// Adjacently tagged:
///   `{ "type": "Event", "data": { "type": "PlayerJoined", ... } }`
///   `{ "type": "Reply", "data": { "request_id": 3, "reply": { ... } } }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    /// Answer to the request with id `request_id`.
    Reply { request_id: u64, reply: Reply },
    /// A pushed game event.
    Event(Event),
}

/// Every frame the server sends is an `Envelope`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-connection counter, starting at 0.
    pub seq: u64,
    /// Milliseconds since the connection was accepted.
    pub timestamp: u64,
    pub payload: Payload,
}

// =========================================================================
// Tests
// =========================================================================
