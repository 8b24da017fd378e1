//! Matchmaking and the token registry.
//!
//! # Locking
//!
//! The lobby has one lock over two things: the pointer to the session
//! currently accepting players, and the token map. A join holds it across
//! the session's own join call, so the pointer can't hand a seat to a
//! fifth player while the fourth one is starting the session. Every other
//! call only holds it for a map lookup, then talks to the session with
//! the lobby lock released.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use mafia_protocol::{Role, SessionSnapshot};
use mafia_session::{EventReceiver, RoleQuotas, Session};
use rand::Rng;
use tokio::sync::{Mutex, mpsc};

use crate::LobbyError;

/// Opaque credential issued at join: 128 random bits as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    fn generate() -> Self {
        let bytes: [u8; 16] = rand::rng().random();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything a successful join hands back.
#[derive(Debug)]
pub struct JoinTicket {
    pub token: SessionToken,
    pub session: Arc<Session>,
    /// The player's push stream. Drain it for as long as the connection
    /// lives, then call [`Lobby::leave`].
    pub events: EventReceiver,
}

/// Who a token belongs to.
#[derive(Debug, Clone)]
pub struct Seat {
    pub username: String,
    pub session: Arc<Session>,
}

#[derive(Debug, Default)]
struct LobbyInner {
    /// The session new players are seated in. Cleared the moment it
    /// starts; the next join creates a fresh one.
    open: Option<Arc<Session>>,
    tokens: HashMap<SessionToken, Seat>,
}

/// Routes players into sessions and resolves their tokens.
#[derive(Debug)]
pub struct Lobby {
    quotas: RoleQuotas,
    inner: Mutex<LobbyInner>,
}

impl Lobby {
    /// Creates an empty lobby. Every session it opens uses `quotas`.
    pub fn new(quotas: RoleQuotas) -> Self {
        Self {
            quotas,
            inner: Mutex::new(LobbyInner::default()),
        }
    }

    pub fn quotas(&self) -> RoleQuotas {
        self.quotas
    }

    /// Seats `username` in the open session, creating one if needed.
    ///
    /// The token is only registered if the session accepted the player.
    /// If this join took the last seat, the session is detached: it keeps
    /// running for its players, but nobody else can be matched into it.
    ///
    /// # Errors
    /// Whatever [`Session::join`] rejects with, as [`LobbyError::Game`].
    pub async fn join(&self, username: &str) -> Result<JoinTicket, LobbyError> {
        let mut inner = self.inner.lock().await;

        let current = inner.open.clone();
        let session = match current {
            Some(session) if session.info().await.state.is_joinable() => session,
            _ => {
                let session = Arc::new(Session::new(self.quotas));
                inner.open = Some(Arc::clone(&session));
                session
            }
        };

        let (sender, events) = mpsc::unbounded_channel();
        let outcome = session.join(username, sender).await?;

        let mut token = SessionToken::generate();
        while inner.tokens.contains_key(&token) {
            token = SessionToken::generate();
        }
        inner.tokens.insert(
            token.clone(),
            Seat {
                username: username.to_string(),
                session: Arc::clone(&session),
            },
        );

        if outcome.started {
            inner.open = None;
            tracing::info!(session_id = %session.id(), "session detached");
        }

        Ok(JoinTicket {
            token,
            session,
            events,
        })
    }

    /// Looks up who `token` belongs to.
    ///
    /// # Errors
    /// [`LobbyError::UnknownToken`] if it was never issued or has been
    /// dropped.
    pub async fn resolve(&self, token: &SessionToken) -> Result<Seat, LobbyError> {
        let inner = self.inner.lock().await;
        inner.tokens.get(token).cloned().ok_or(LobbyError::UnknownToken)
    }

    /// Votes as the token's owner.
    pub async fn vote(
        &self,
        token: &SessionToken,
        target: &str,
    ) -> Result<(), LobbyError> {
        let seat = self.resolve(token).await?;
        seat.session.vote(&seat.username, target).await?;
        Ok(())
    }

    /// Checks `target` as the token's owner.
    pub async fn check(
        &self,
        token: &SessionToken,
        target: &str,
    ) -> Result<Role, LobbyError> {
        let seat = self.resolve(token).await?;
        Ok(seat.session.check(&seat.username, target).await?)
    }

    /// The token owner's view of their session.
    pub async fn state(
        &self,
        token: &SessionToken,
    ) -> Result<SessionSnapshot, LobbyError> {
        let seat = self.resolve(token).await?;
        Ok(seat.session.state(&seat.username).await?)
    }

    /// Called once the token owner's push stream is gone.
    ///
    /// Disconnects the player from their session. The token stays valid
    /// until the session is abandoned (ended with no stream left), at
    /// which point every token of that session is dropped. Unknown tokens
    /// are ignored.
    pub async fn leave(&self, token: &SessionToken) {
        let Ok(seat) = self.resolve(token).await else {
            tracing::debug!("leave with unknown token");
            return;
        };
        seat.session.disconnect(&seat.username).await;

        if seat.session.is_abandoned().await {
            let mut inner = self.inner.lock().await;
            let before = inner.tokens.len();
            inner
                .tokens
                .retain(|_, other| !Arc::ptr_eq(&other.session, &seat.session));
            tracing::info!(
                session_id = %seat.session.id(),
                tokens = before - inner.tokens.len(),
                "session reclaimed"
            );
        }
    }

    /// Number of tokens currently registered.
    pub async fn token_count(&self) -> usize {
        self.inner.lock().await.tokens.len()
    }
}

// =========================================================================
// Tests
// =========================================================================
