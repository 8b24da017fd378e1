//! The session state machine.
//!
//! # Concurrency
//!
//! Each `Session` has a single `tokio::sync::Mutex` around its state.
//! Every operation, including the read-only [`Session::state`], holds it
//! for its whole duration, event fan-out included. At most one operation
//! is ever active on a session, so no observer can see a half-resolved
//! phase.
//!
//! Fan-out under the lock is safe because every player queue is an
//! unbounded `mpsc` channel: `send` never waits, so a player who stops
//! reading can't stall anyone else, and events reach each queue in the
//! order they were broadcast. A queue whose receiver is gone is skipped.
//!
//! # Phases
//!
//! ```text
//!            last seat taken          resolution              win
//!   Open ─────────────────────→ night 1 ──────────→ day 1 ──→ ... ──→ Ended
//! ```
//!
//! A night resolves once every living mafia member has voted and the
//! night's check is used (or no sheriff is alive). A day resolves once
//! every living player has voted.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use mafia_protocol::{
    Event, Phase, PlayerView, Role, SessionId, SessionSnapshot, Team,
};
use rand::Rng;
use tokio::sync::{Mutex, mpsc};

use crate::{GameError, RoleQuotas, SessionState};

/// Counter for generating unique session IDs.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Sending half of a player's event queue.
pub type EventSender = mpsc::UnboundedSender<Event>;

/// Receiving half of a player's event queue. Whoever holds it relays the
/// events onto the player's push stream.
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// What a successful join tells the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    /// The role drawn for the new player.
    pub role: Role,
    /// `true` if this join took the last seat and started the session.
    pub started: bool,
}

/// Session metadata, without any secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub state: SessionState,
    pub phase: Phase,
    pub player_count: usize,
    pub capacity: usize,
}

/// One seat in the roster.
#[derive(Debug)]
struct PlayerRecord {
    role: Role,
    /// Flips to `false` exactly once: by elimination or by disconnect.
    alive: bool,
    /// `false` once the player's push stream has been released.
    attached: bool,
    sender: EventSender,
}

/// Everything behind the lock.
#[derive(Debug)]
struct SessionInner {
    state: SessionState,
    phase: Phase,
    /// Keyed by username. Players are never removed, and the `BTreeMap`
    /// keeps every listing in username order.
    players: BTreeMap<String, PlayerRecord>,
    /// voter → target for the current phase. Both always name living
    /// players.
    votes: BTreeMap<String, String>,
    /// Whether tonight's check has been used. Reset at every phase change.
    sheriff_checked: bool,
    winner: Option<Team>,
}

/// One Mafia match.
///
/// Shared as `Arc<Session>` between the lobby and every connection of
/// its players; all methods take `&self`.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    quotas: RoleQuotas,
    inner: Mutex<SessionInner>,
}

impl Session {
    /// Creates an open, empty session.
    pub fn new(quotas: RoleQuotas) -> Self {
        let id = SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::info!(session_id = %id, capacity = quotas.total(), "session created");
        Self {
            id,
            quotas,
            inner: Mutex::new(SessionInner {
                state: SessionState::Open,
                phase: Phase::LOBBY,
                players: BTreeMap::new(),
                votes: BTreeMap::new(),
                sheriff_checked: false,
                winner: None,
            }),
        }
    }

    /// Returns the session's unique ID.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Number of seats; the session starts when all are taken.
    pub fn capacity(&self) -> usize {
        self.quotas.total()
    }

    /// Seats a new player and draws their role.
    ///
    /// Every player, the newcomer included, gets a `PlayerJoined` event.
    /// If this join takes the last seat the session starts on the spot:
    /// the phase becomes night 1 and each player privately receives
    /// `SessionStarted` with their own role.
    ///
    /// # Errors
    /// - [`GameError::InvalidUsername`]: empty name
    /// - [`GameError::SessionFull`]: no seat left (started or ended)
    /// - [`GameError::UsernameTaken`]: name already seated here
    pub async fn join(
        &self,
        username: &str,
        sender: EventSender,
    ) -> Result<JoinOutcome, GameError> {
        if username.is_empty() {
            return Err(GameError::InvalidUsername);
        }

        let mut inner = self.inner.lock().await;
        if !inner.state.is_joinable() {
            return Err(GameError::SessionFull(self.id));
        }
        if inner.players.contains_key(username) {
            return Err(GameError::UsernameTaken(username.to_string()));
        }
        let role = self
            .draw_role(&inner.players)
            .ok_or(GameError::SessionFull(self.id))?;

        inner.players.insert(
            username.to_string(),
            PlayerRecord {
                role,
                alive: true,
                attached: true,
                sender,
            },
        );
        tracing::info!(
            session_id = %self.id,
            %username,
            players = inner.players.len(),
            capacity = self.capacity(),
            "player joined"
        );
        inner.broadcast(&Event::PlayerJoined {
            username: username.to_string(),
        });

        let started = inner.players.len() == self.capacity();
        if started {
            self.start(&mut inner);
        }
        Ok(JoinOutcome { role, started })
    }

    /// Records `voter`'s vote against `target`, then resolves the phase
    /// if this was the last vote it was waiting for.
    ///
    /// At night only living mafia members vote; by day every living
    /// player does. One vote per player per phase.
    ///
    /// # Errors
    /// - [`GameError::SessionNotStarted`] / [`GameError::SessionEnded`]
    /// - [`GameError::InvalidVoter`]: voter unknown or dead
    /// - [`GameError::InvalidTarget`]: target unknown or dead
    /// - [`GameError::NotAuthorized`]: non-mafia voting at night
    /// - [`GameError::AlreadyVoted`]
    pub async fn vote(&self, voter: &str, target: &str) -> Result<(), GameError> {
        let mut inner = self.inner.lock().await;
        inner.ensure_running()?;

        let voter_role = inner
            .living(voter)
            .map(|p| p.role)
            .ok_or_else(|| GameError::InvalidVoter(voter.to_string()))?;
        if inner.living(target).is_none() {
            return Err(GameError::InvalidTarget(target.to_string()));
        }
        if inner.phase.is_night() && voter_role != Role::Mafia {
            return Err(GameError::NotAuthorized(
                "only mafia vote at night".into(),
            ));
        }
        if inner.votes.contains_key(voter) {
            return Err(GameError::AlreadyVoted(voter.to_string()));
        }

        inner.votes.insert(voter.to_string(), target.to_string());
        tracing::debug!(
            session_id = %self.id,
            phase = %inner.phase,
            %voter,
            %target,
            "vote recorded"
        );

        self.try_resolve(&mut inner);
        Ok(())
    }

    /// Sheriff's night action: reveals `target`'s true role to the caller.
    ///
    /// Each night allows one check. Using it may complete the night, so
    /// resolution is attempted afterwards.
    ///
    /// # Errors
    /// - [`GameError::SessionNotStarted`] / [`GameError::SessionEnded`]
    /// - [`GameError::NotAuthorized`]: caller isn't a living sheriff,
    ///   or it's daytime
    /// - [`GameError::CheckAlreadyUsed`]
    /// - [`GameError::SelfCheck`]
    /// - [`GameError::InvalidTarget`]: target unknown or dead
    pub async fn check(
        &self,
        checker: &str,
        target: &str,
    ) -> Result<Role, GameError> {
        let mut inner = self.inner.lock().await;
        inner.ensure_running()?;

        match inner.living(checker) {
            Some(p) if p.role == Role::Sheriff => {}
            _ => {
                return Err(GameError::NotAuthorized(
                    "only a living sheriff can check".into(),
                ));
            }
        }
        if !inner.phase.is_night() {
            return Err(GameError::NotAuthorized(
                "checks happen at night".into(),
            ));
        }
        if inner.sheriff_checked {
            return Err(GameError::CheckAlreadyUsed);
        }
        if checker == target {
            return Err(GameError::SelfCheck);
        }
        let role = inner
            .living(target)
            .map(|p| p.role)
            .ok_or_else(|| GameError::InvalidTarget(target.to_string()))?;

        inner.sheriff_checked = true;
        tracing::debug!(
            session_id = %self.id,
            phase = %inner.phase,
            %checker,
            %target,
            "check used"
        );

        self.try_resolve(&mut inner);
        Ok(role)
    }

    /// Called when `username`'s push stream is gone.
    ///
    /// Only has a game effect while the session is running: a living
    /// player is marked dead, votes by or against them are dropped, and
    /// everyone gets `PlayerDisconnected`. The departure can decide the
    /// game (last mafia leaving) or complete the current phase (last
    /// missing voter or the sheriff leaving), so both are re-evaluated.
    ///
    /// Idempotent, and a no-op for unknown names.
    pub async fn disconnect(&self, username: &str) {
        let mut inner = self.inner.lock().await;
        let running = inner.state.is_running();
        let Some(player) = inner.players.get_mut(username) else {
            return;
        };
        player.attached = false;
        if !running || !player.alive {
            return;
        }
        player.alive = false;

        inner
            .votes
            .retain(|voter, target| voter != username && target != username);
        tracing::info!(
            session_id = %self.id,
            phase = %inner.phase,
            %username,
            "player disconnected"
        );
        inner.broadcast(&Event::PlayerDisconnected {
            username: username.to_string(),
        });

        if !self.check_winner(&mut inner) {
            self.try_resolve(&mut inner);
        }
    }

    /// The session as `username` may see it: their own role always, the
    /// others' only after the session has ended.
    ///
    /// Answers in every lifecycle state.
    ///
    /// # Errors
    /// [`GameError::UnknownPlayer`] if `username` has no seat here.
    pub async fn state(
        &self,
        username: &str,
    ) -> Result<SessionSnapshot, GameError> {
        let inner = self.inner.lock().await;
        let player = inner
            .players
            .get(username)
            .ok_or_else(|| GameError::UnknownPlayer(username.to_string()))?;
        Ok(SessionSnapshot {
            session_id: self.id,
            phase: inner.phase,
            you: PlayerView {
                username: username.to_string(),
                role: Some(player.role),
                alive: player.alive,
            },
            players: inner.roster_for(Some(username)),
            winner: inner.winner,
        })
    }

    /// Returns `true` once the session has ended and every player's
    /// stream has been released. Nothing can reach it after that.
    pub async fn is_abandoned(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.state == SessionState::Ended
            && inner.players.values().all(|p| !p.attached)
    }

    /// Returns the session's metadata.
    pub async fn info(&self) -> SessionInfo {
        let inner = self.inner.lock().await;
        SessionInfo {
            session_id: self.id,
            state: inner.state,
            phase: inner.phase,
            player_count: inner.players.len(),
            capacity: self.capacity(),
        }
    }

    // -- Internals (all called with the lock held) ------------------------

    /// Draws a role uniformly from the seats still open.
    ///
    /// The draw is over seats, not roles: with one sheriff seat and two
    /// civilian seats left, a civilian comes out two times in three.
    /// Returns `None` when every seat is taken.
    fn draw_role(&self, players: &BTreeMap<String, PlayerRecord>) -> Option<Role> {
        let open_seats: Vec<Role> = [Role::Mafia, Role::Sheriff, Role::Civilian]
            .into_iter()
            .flat_map(|role| {
                let taken = players.values().filter(|p| p.role == role).count();
                let open = self.quotas.quota(role).saturating_sub(taken);
                std::iter::repeat_n(role, open)
            })
            .collect();
        if open_seats.is_empty() {
            return None;
        }
        let index = rand::rng().random_range(0..open_seats.len());
        Some(open_seats[index])
    }

    fn start(&self, inner: &mut SessionInner) {
        debug_assert!(inner.state.can_transition_to(SessionState::Started));
        inner.state = SessionState::Started;
        inner.phase = Phase::FIRST_NIGHT;
        inner.sheriff_checked = false;
        tracing::info!(
            session_id = %self.id,
            players = inner.players.len(),
            "session started"
        );

        for (username, player) in &inner.players {
            let event = Event::SessionStarted {
                your_role: player.role,
                players: inner.roster_for(Some(username)),
            };
            let _ = player.sender.send(event);
        }
    }

    /// Resolves the current phase if every vote it needs is in.
    fn try_resolve(&self, inner: &mut SessionInner) {
        if !inner.state.is_running() || !inner.phase_complete() {
            return;
        }
        let Some(target) = tally(&inner.votes) else {
            return;
        };

        if let Some(player) = inner.players.get_mut(&target) {
            player.alive = false;
        }
        let resolved = inner.phase;
        inner.votes.clear();
        inner.phase = resolved.next();
        inner.sheriff_checked = false;

        tracing::info!(
            session_id = %self.id,
            phase = %resolved,
            username = %target,
            "player eliminated"
        );
        inner.broadcast(&Event::PlayerEliminated {
            username: target,
            phase: resolved,
        });

        self.check_winner(inner);
    }

    /// Ends the session if a team has won. Returns `true` if it did.
    ///
    /// Civilians win when no mafia is left; mafia wins once they are at
    /// least as many as everyone else alive. The first check wins, so
    /// both can't fire together.
    fn check_winner(&self, inner: &mut SessionInner) -> bool {
        let mafia = inner.living_count(|role| role.team() == Team::Mafia);
        let others = inner.living_count(|role| role.team() == Team::Civilians);

        let winner = if mafia == 0 {
            Team::Civilians
        } else if mafia >= others {
            Team::Mafia
        } else {
            return false;
        };

        inner.state = SessionState::Ended;
        inner.winner = Some(winner);
        inner.votes.clear();
        tracing::info!(session_id = %self.id, %winner, "session ended");

        let players = inner.roster_for(None);
        inner.broadcast(&Event::SessionEnded { winner, players });
        true
    }
}

impl SessionInner {
    fn ensure_running(&self) -> Result<(), GameError> {
        match self.state {
            SessionState::Open => Err(GameError::SessionNotStarted),
            SessionState::Started => Ok(()),
            SessionState::Ended => Err(GameError::SessionEnded),
        }
    }

    fn living(&self, username: &str) -> Option<&PlayerRecord> {
        self.players.get(username).filter(|p| p.alive)
    }

    fn living_count(&self, pred: impl Fn(Role) -> bool) -> usize {
        self.players
            .values()
            .filter(|p| p.alive && pred(p.role))
            .count()
    }

    /// Whether the current phase has every vote (and check) it waits for.
    fn phase_complete(&self) -> bool {
        if self.votes.is_empty() {
            return false;
        }
        if self.phase.is_night() {
            let mafia = self.living_count(|role| role == Role::Mafia);
            let sheriff = self.living_count(|role| role == Role::Sheriff);
            self.votes.len() == mafia && (sheriff == 0 || self.sheriff_checked)
        } else {
            self.votes.len() == self.living_count(|_| true)
        }
    }

    /// Roster in username order. Roles are shown to `viewer` only for
    /// their own seat, unless the session has ended. `None` reveals all.
    fn roster_for(&self, viewer: Option<&str>) -> Vec<PlayerView> {
        let reveal_all = viewer.is_none() || self.state == SessionState::Ended;
        self.players
            .iter()
            .map(|(username, p)| PlayerView {
                username: username.clone(),
                role: (reveal_all || viewer == Some(username.as_str()))
                    .then_some(p.role),
                alive: p.alive,
            })
            .collect()
    }

    fn broadcast(&self, event: &Event) {
        for player in self.players.values() {
            let _ = player.sender.send(event.clone());
        }
    }
}

/// Picks the phase's target: most votes wins, ties go to the
/// lexicographically smallest username.
fn tally(votes: &BTreeMap<String, String>) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for target in votes.values() {
        *counts.entry(target.as_str()).or_default() += 1;
    }

    // Ascending username order; only a strictly higher count replaces
    // the current leader.
    let mut leader: Option<(&str, usize)> = None;
    for (target, count) in counts {
        match leader {
            Some((_, best)) if count <= best => {}
            _ => leader = Some((target, count)),
        }
    }
    leader.map(|(target, _)| target.to_string())
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn votes(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(v, t)| (v.to_string(), t.to_string()))
            .collect()
    }

    fn sender() -> EventSender {
        mpsc::unbounded_channel().0
    }

    // =====================================================================
    // tally()
    // =====================================================================

    #[test]
    fn test_tally_majority_wins() {
        let v = votes(&[("a", "c"), ("b", "c"), ("c", "a")]);
        assert_eq!(tally(&v).as_deref(), Some("c"));
    }

    #[test]
    fn test_tally_tie_picks_smallest_username() {
        let v = votes(&[("a", "zed"), ("b", "amy"), ("c", "max")]);
        assert_eq!(tally(&v).as_deref(), Some("amy"));
    }

    #[test]
    fn test_tally_tie_is_independent_of_vote_order() {
        let first = votes(&[("x", "bob"), ("y", "al")]);
        let second = votes(&[("x", "al"), ("y", "bob")]);
        assert_eq!(tally(&first), tally(&second));
        assert_eq!(tally(&first).as_deref(), Some("al"));
    }

    #[test]
    fn test_tally_empty_returns_none() {
        assert_eq!(tally(&BTreeMap::new()), None);
    }

    // =====================================================================
    // draw_role()
    // =====================================================================

    #[test]
    fn test_draw_role_only_offers_open_seats() {
        let session = Session::new(RoleQuotas {
            mafia: 1,
            sheriff: 0,
            civilian: 1,
        });
        let mut players = BTreeMap::new();
        players.insert(
            "a".to_string(),
            PlayerRecord {
                role: Role::Mafia,
                alive: true,
                attached: true,
                sender: sender(),
            },
        );
        for _ in 0..20 {
            assert_eq!(session.draw_role(&players), Some(Role::Civilian));
        }
    }

    #[test]
    fn test_draw_role_none_when_full() {
        let session = Session::new(RoleQuotas {
            mafia: 1,
            sheriff: 0,
            civilian: 0,
        });
        let mut players = BTreeMap::new();
        players.insert(
            "a".to_string(),
            PlayerRecord {
                role: Role::Mafia,
                alive: true,
                attached: true,
                sender: sender(),
            },
        );
        assert_eq!(session.draw_role(&players), None);
    }

    // =====================================================================
    // join()
    // =====================================================================

    #[tokio::test]
    async fn test_join_empty_username_rejected() {
        let session = Session::new(RoleQuotas::default());
        let result = session.join("", sender()).await;
        assert_eq!(result, Err(GameError::InvalidUsername));
    }

    #[tokio::test]
    async fn test_join_whitespace_username_accepted() {
        let session = Session::new(RoleQuotas::default());
        let outcome = session.join("   ", sender()).await.unwrap();
        assert!(!outcome.started);
        assert!(session.state("   ").await.is_ok());
    }

    #[tokio::test]
    async fn test_join_duplicate_username_rejected() {
        let session = Session::new(RoleQuotas::default());
        session.join("alice", sender()).await.unwrap();
        let result = session.join("alice", sender()).await;
        assert_eq!(result, Err(GameError::UsernameTaken("alice".into())));
    }

    #[tokio::test]
    async fn test_join_broadcasts_to_newcomer_too() {
        let session = Session::new(RoleQuotas::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        session.join("alice", tx).await.unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            Event::PlayerJoined {
                username: "alice".into()
            }
        );
    }

    #[tokio::test]
    async fn test_join_last_seat_starts_session() {
        let session = Session::new(RoleQuotas::default());
        for name in ["a", "b", "c"] {
            let outcome = session.join(name, sender()).await.unwrap();
            assert!(!outcome.started);
        }
        let outcome = session.join("d", sender()).await.unwrap();
        assert!(outcome.started);

        let info = session.info().await;
        assert_eq!(info.state, SessionState::Started);
        assert_eq!(info.phase, Phase::FIRST_NIGHT);
        assert_eq!(info.player_count, 4);
    }

    #[tokio::test]
    async fn test_join_after_start_returns_full() {
        let session = Session::new(RoleQuotas::default());
        for name in ["a", "b", "c", "d"] {
            session.join(name, sender()).await.unwrap();
        }
        let result = session.join("e", sender()).await;
        assert_eq!(result, Err(GameError::SessionFull(session.id())));
        assert_eq!(session.info().await.player_count, 4);
    }

    // =====================================================================
    // Lifecycle guards
    // =====================================================================

    #[tokio::test]
    async fn test_vote_before_start_returns_not_started() {
        let session = Session::new(RoleQuotas::default());
        session.join("a", sender()).await.unwrap();
        session.join("b", sender()).await.unwrap();
        let result = session.vote("a", "b").await;
        assert_eq!(result, Err(GameError::SessionNotStarted));
    }

    #[tokio::test]
    async fn test_check_before_start_returns_not_started() {
        let session = Session::new(RoleQuotas::default());
        session.join("a", sender()).await.unwrap();
        session.join("b", sender()).await.unwrap();
        let result = session.check("a", "b").await;
        assert_eq!(result, Err(GameError::SessionNotStarted));
    }

    #[tokio::test]
    async fn test_disconnect_while_open_keeps_player_alive() {
        let session = Session::new(RoleQuotas::default());
        session.join("a", sender()).await.unwrap();
        session.disconnect("a").await;

        let snapshot = session.state("a").await.unwrap();
        assert!(snapshot.you.alive);
        assert_eq!(session.info().await.player_count, 1);
    }

    #[tokio::test]
    async fn test_state_unknown_player_rejected() {
        let session = Session::new(RoleQuotas::default());
        let result = session.state("ghost").await;
        assert_eq!(result, Err(GameError::UnknownPlayer("ghost".into())));
    }

    #[tokio::test]
    async fn test_state_in_lobby_shows_phase_zero() {
        let session = Session::new(RoleQuotas::default());
        session.join("a", sender()).await.unwrap();
        let snapshot = session.state("a").await.unwrap();
        assert_eq!(snapshot.phase, Phase::LOBBY);
        assert!(snapshot.you.role.is_some());
        assert_eq!(snapshot.winner, None);
    }

    #[tokio::test]
    async fn test_is_abandoned_false_while_open() {
        let session = Session::new(RoleQuotas::default());
        session.join("a", sender()).await.unwrap();
        session.disconnect("a").await;
        assert!(!session.is_abandoned().await);
    }

    #[tokio::test]
    async fn test_session_ids_are_unique() {
        let a = Session::new(RoleQuotas::default());
        let b = Session::new(RoleQuotas::default());
        assert_ne!(a.id(), b.id());
    }
}
