//! `MafiaServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → lobby → session.

use std::sync::Arc;

use mafia_lobby::Lobby;
use mafia_protocol::{Codec, JsonCodec};
use mafia_session::RoleQuotas;
use mafia_transport::{Transport, WebSocketTransport};
use serde::{Deserialize, Serialize};

use crate::MafiaError;
use crate::handler::handle_connection;

/// Address used when none is configured.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:9000";

/// Everything needed to start a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Role seats per session; their sum is the session size.
    pub quotas: RoleQuotas,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            quotas: RoleQuotas::default(),
        }
    }
}

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) lobby: Lobby,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Mafia server.
///
/// # Example
///
/// ```rust,ignore
/// use mafia::prelude::*;
///
/// let server = MafiaServer::builder()
///     .bind("0.0.0.0:9000")
///     .quotas(RoleQuotas { mafia: 2, sheriff: 1, civilian: 4 })
///     .build()
///     .await?;
/// server.run().await
/// ```
#[derive(Debug, Clone, Default)]
pub struct MafiaServerBuilder {
    config: ServerConfig,
}

impl MafiaServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the role quotas of every session.
    pub fn quotas(mut self, quotas: RoleQuotas) -> Self {
        self.config.quotas = quotas;
        self
    }

    /// Validates the quotas, binds the listener and returns the server.
    ///
    /// Uses `JsonCodec` over `WebSocketTransport`.
    ///
    /// # Errors
    /// - [`MafiaError::Quota`] if the quotas can't make a playable game
    /// - [`MafiaError::Transport`] if the address can't be bound
    pub async fn build(self) -> Result<MafiaServer<JsonCodec>, MafiaError> {
        self.config.quotas.validate()?;
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            lobby: Lobby::new(self.config.quotas),
            codec: JsonCodec,
        });

        Ok(MafiaServer { transport, state })
    }
}

/// A Mafia server bound to its address.
///
/// Call [`run()`](Self::run) to start accepting players.
pub struct MafiaServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl MafiaServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> MafiaServerBuilder {
        MafiaServerBuilder::new()
    }
}

impl<C: Codec> MafiaServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop, one task per connection. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), MafiaError> {
        tracing::info!(
            capacity = self.state.lobby.quotas().total(),
            "Mafia server running"
        );

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
