//! Per-connection handler: join, then requests and pushed events.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive requests until a `Join` succeeds → reply `Joined`
//!   2. Loop: relay the player's events and answer their requests
//!   3. On exit, the leave guard tells the lobby the stream is gone
//!
//! The `Joined` reply is sent before the first event is relayed, so the
//! token is always the first thing a player receives after joining.

use std::sync::Arc;
use std::time::Instant;

use mafia_lobby::{JoinTicket, LobbyError, SessionToken};
use mafia_protocol::{
    Action, ClientMessage, Codec, Envelope, ErrorCode, Event, Payload, Reply,
};
use mafia_transport::{Connection, WebSocketConnection};

use crate::MafiaError;
use crate::server::ServerState;

/// Drop guard that reports the player's departure when the handler exits.
///
/// Fires on clean close, transport error, or panic alike. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async call.
struct LeaveGuard<C: Codec> {
    token: SessionToken,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for LeaveGuard<C> {
    fn drop(&mut self) {
        let token = self.token.clone();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.lobby.leave(&token).await;
        });
    }
}

/// Frames going out on one connection, numbered from 0.
struct Outbox<'a, C: Codec> {
    conn: &'a WebSocketConnection,
    codec: &'a C,
    seq: u64,
    start: Instant,
}

impl<'a, C: Codec> Outbox<'a, C> {
    fn new(conn: &'a WebSocketConnection, codec: &'a C) -> Self {
        Self {
            conn,
            codec,
            seq: 0,
            start: Instant::now(),
        }
    }

    async fn send(&mut self, payload: Payload) -> Result<(), MafiaError> {
        let envelope = Envelope {
            seq: self.seq,
            timestamp: u64::try_from(self.start.elapsed().as_millis())
                .unwrap_or(u64::MAX),
            payload,
        };
        self.seq += 1;
        let bytes = self.codec.encode(&envelope)?;
        self.conn.send(&bytes).await?;
        Ok(())
    }

    async fn reply(
        &mut self,
        request_id: u64,
        reply: Reply,
    ) -> Result<(), MafiaError> {
        self.send(Payload::Reply { request_id, reply }).await
    }

    async fn event(&mut self, event: Event) -> Result<(), MafiaError> {
        self.send(Payload::Event(event)).await
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), MafiaError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");
    let mut outbox = Outbox::new(&conn, &state.codec);

    // --- Step 1: Join ---
    let Some((
        request_id,
        JoinTicket {
            token,
            session,
            mut events,
        },
    )) = await_join(&conn, &state, &mut outbox).await?
    else {
        tracing::debug!(%conn_id, "connection closed before joining");
        return Ok(());
    };
    // Armed before the first write to the seated player.
    let _guard = LeaveGuard {
        token: token.clone(),
        state: Arc::clone(&state),
    };
    tracing::debug!(%conn_id, session_id = %session.id(), "connection bound");
    outbox
        .reply(
            request_id,
            Reply::Joined {
                token: token.to_string(),
                session_id: session.id(),
            },
        )
        .await?;

    // --- Step 2: Events and requests ---
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    break;
                };
                outbox.event(event).await?;
            }
            frame = conn.recv() => {
                let data = match frame {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::debug!(%conn_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        break;
                    }
                };
                let Some(msg) = decode_request(&state.codec, &data, &mut outbox).await?
                else {
                    continue;
                };
                let reply = handle_action(&state, &token, msg.action).await;
                outbox.reply(msg.id, reply).await?;
            }
        }
    }

    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
    // _guard drops here → lobby.leave fires.
    Ok(())
}

/// Reads requests until one is a successful `Join`, returning its request
/// id with the ticket. The caller sends the `Joined` reply.
///
/// Everything else is answered with an error reply. Returns `None` if the
/// peer goes away first.
async fn await_join<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    outbox: &mut Outbox<'_, C>,
) -> Result<Option<(u64, JoinTicket)>, MafiaError> {
    while let Some(data) = conn.recv().await? {
        let Some(msg) = decode_request(&state.codec, &data, outbox).await? else {
            continue;
        };
        let Action::Join { username } = msg.action else {
            outbox
                .reply(msg.id, Reply::error(ErrorCode::BadRequest, "join first"))
                .await?;
            continue;
        };

        match state.lobby.join(&username).await {
            Ok(ticket) => return Ok(Some((msg.id, ticket))),
            Err(e) => {
                tracing::debug!(%username, error = %e, "join rejected");
                outbox.reply(msg.id, error_reply(&e)).await?;
            }
        }
    }
    Ok(None)
}

/// Decodes one request frame. A frame that doesn't decode gets a
/// `BadRequest` reply with request id 0 and yields `None`.
async fn decode_request<C: Codec>(
    codec: &C,
    data: &[u8],
    outbox: &mut Outbox<'_, C>,
) -> Result<Option<ClientMessage>, MafiaError> {
    match codec.decode::<ClientMessage>(data) {
        Ok(msg) => Ok(Some(msg)),
        Err(e) => {
            tracing::debug!(error = %e, "failed to decode request");
            outbox
                .reply(0, Reply::error(ErrorCode::BadRequest, e.to_string()))
                .await?;
            Ok(None)
        }
    }
}

/// Runs one action for the player bound to `token`.
async fn handle_action<C: Codec>(
    state: &ServerState<C>,
    token: &SessionToken,
    action: Action,
) -> Reply {
    let result = match action {
        Action::Join { .. } => {
            return Reply::error(ErrorCode::BadRequest, "already joined");
        }
        Action::Vote { target } => {
            state.lobby.vote(token, &target).await.map(|()| Reply::Voted)
        }
        Action::Check { target } => state
            .lobby
            .check(token, &target)
            .await
            .map(|role| Reply::Checked {
                username: target,
                role,
            }),
        Action::GetState => state
            .lobby
            .state(token)
            .await
            .map(|snapshot| Reply::State { snapshot }),
    };

    result.unwrap_or_else(|e| {
        tracing::debug!(error = %e, "action rejected");
        error_reply(&e)
    })
}

fn error_reply(err: &LobbyError) -> Reply {
    Reply::error(err.code(), err.to_string())
}
