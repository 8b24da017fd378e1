//! The lobby: where players are matched into sessions and identified
//! afterwards.
//!
//! # How it fits in the stack
//!
//! ```text
//! Server glue (above)  ← one call per client action, carrying a token
//!     ↕
//! Lobby (this crate)   ← open-session pointer + token → (username, session)
//!     ↕
//! Session (below)      ← the game itself
//! ```
//!
//! A player joins with a username and gets back a [`SessionToken`]. Every
//! later action presents that token and the lobby routes it to the right
//! session under the right name; a caller-supplied username is never
//! trusted after join.

mod error;
mod lobby;

pub use error::LobbyError;
pub use lobby::{JoinTicket, Lobby, Seat, SessionToken};
