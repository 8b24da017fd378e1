//! The game session: one Mafia match from first join to final reveal.
//!
//! A [`Session`] owns the roster, the secret role of every player, the
//! night/day phase counter, the pending votes of the current phase, and
//! one outbound event queue per player. Every operation runs under the
//! session's lock, so each transition is atomic to observers.
//!
//! # Key types
//!
//! - [`Session`]: the state machine itself
//! - [`RoleQuotas`]: how many seats of each role a session has
//! - [`SessionState`]: Open → Started → Ended
//! - [`GameError`]: why an action was rejected

mod config;
mod error;
mod session;

pub use config::{RoleQuotas, SessionState};
pub use error::{GameError, QuotaError};
pub use session::{
    EventReceiver, EventSender, JoinOutcome, Session, SessionInfo,
};
