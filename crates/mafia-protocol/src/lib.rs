//! Wire protocol for the Mafia server.
//!
//! - **Types** ([`Role`], [`Team`], [`Phase`], [`Event`], [`SessionSnapshot`],
//!   [`ErrorCode`]): the game model as clients see it.
//! - **Messages** ([`ClientMessage`], [`Envelope`]): request and response
//!   frames on a player's connection.
//! - **Codec** ([`Codec`], [`JsonCodec`]): how frames become bytes.
//!
//! ```text
//! Transport (bytes) → Protocol (frames) → Lobby → Session
//! ```

mod codec;
mod error;
mod messages;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use messages::{Action, ClientMessage, Envelope, Payload, Reply};
pub use types::{
    ErrorCode, Event, Phase, PlayerView, Role, SessionId, SessionSnapshot,
    Team,
};
