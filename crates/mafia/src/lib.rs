//! # Mafia
//!
//! Server for Mafia, the hidden-role party game. Players connect over
//! WebSocket, are matched into sessions of a fixed size, and play
//! alternating night and day phases until one team wins.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mafia::prelude::*;
//!
//! # async fn start() -> Result<(), MafiaError> {
//! let server = MafiaServer::builder()
//!     .bind("0.0.0.0:9000")
//!     .quotas(RoleQuotas::default())
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::MafiaError;
pub use server::{DEFAULT_BIND_ADDR, MafiaServer, MafiaServerBuilder, ServerConfig};

pub mod prelude {
    pub use crate::{
        DEFAULT_BIND_ADDR, MafiaError, MafiaServer, MafiaServerBuilder,
        ServerConfig,
    };
    pub use mafia_lobby::{Lobby, LobbyError, SessionToken};
    pub use mafia_protocol::{
        Action, ClientMessage, Codec, Envelope, ErrorCode, Event, JsonCodec,
        Payload, Phase, PlayerView, Reply, Role, SessionId, SessionSnapshot,
        Team,
    };
    pub use mafia_session::{GameError, QuotaError, RoleQuotas};
}
