//! Role quotas and the session lifecycle state.

use mafia_protocol::Role;
use serde::{Deserialize, Serialize};

use crate::QuotaError;

// ---------------------------------------------------------------------------
// RoleQuotas
// ---------------------------------------------------------------------------

/// How many seats of each role a session has. The sum is the session's
/// capacity: the session starts the moment the last seat is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleQuotas {
    pub mafia: usize,
    pub sheriff: usize,
    pub civilian: usize,
}

impl Default for RoleQuotas {
    fn default() -> Self {
        Self {
            mafia: 1,
            sheriff: 1,
            civilian: 2,
        }
    }
}

impl RoleQuotas {
    /// Total number of seats.
    pub fn total(&self) -> usize {
        self.mafia + self.sheriff + self.civilian
    }

    /// Seats configured for `role`.
    pub fn quota(&self, role: Role) -> usize {
        match role {
            Role::Mafia => self.mafia,
            Role::Sheriff => self.sheriff,
            Role::Civilian => self.civilian,
        }
    }

    /// Rejects combinations that can't produce a playable game.
    ///
    /// # Errors
    /// - [`QuotaError::NoMafia`]: zero mafia seats
    /// - [`QuotaError::MafiaMajority`]: mafia would win on the first
    ///   win check
    pub fn validate(&self) -> Result<(), QuotaError> {
        if self.mafia == 0 {
            return Err(QuotaError::NoMafia);
        }
        let others = self.sheriff + self.civilian;
        if self.mafia >= others {
            return Err(QuotaError::MafiaMajority {
                mafia: self.mafia,
                others,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The lifecycle of a session. Strictly forward:
///
/// ```text
/// Open → Started → Ended
/// ```
///
/// - **Open**: accepting joins, nothing else takes effect.
/// - **Started**: all seats taken, phases running.
/// - **Ended**: a team won. Terminal; only `GetState` still answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Open,
    Started,
    Ended,
}

impl SessionState {
    /// Returns `true` if the session accepts new players.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` while phases are running.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Started)
    }

    /// The state that follows this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Open => Some(Self::Started),
            Self::Started => Some(Self::Ended),
            Self::Ended => None,
        }
    }

    /// Returns `true` if moving to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::Started => write!(f, "Started"),
            Self::Ended => write!(f, "Ended"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_quotas_default() {
        let quotas = RoleQuotas::default();
        assert_eq!(quotas.mafia, 1);
        assert_eq!(quotas.sheriff, 1);
        assert_eq!(quotas.civilian, 2);
        assert_eq!(quotas.total(), 4);
    }

    #[test]
    fn test_role_quotas_quota_per_role() {
        let quotas = RoleQuotas {
            mafia: 2,
            sheriff: 1,
            civilian: 4,
        };
        assert_eq!(quotas.quota(Role::Mafia), 2);
        assert_eq!(quotas.quota(Role::Sheriff), 1);
        assert_eq!(quotas.quota(Role::Civilian), 4);
    }

    #[test]
    fn test_validate_default_is_ok() {
        assert!(RoleQuotas::default().validate().is_ok());
    }

    #[test]
    fn test_validate_no_mafia_rejected() {
        let quotas = RoleQuotas {
            mafia: 0,
            ..RoleQuotas::default()
        };
        assert_eq!(quotas.validate(), Err(QuotaError::NoMafia));
    }

    #[test]
    fn test_validate_mafia_majority_rejected() {
        let quotas = RoleQuotas {
            mafia: 2,
            sheriff: 1,
            civilian: 1,
        };
        assert_eq!(
            quotas.validate(),
            Err(QuotaError::MafiaMajority { mafia: 2, others: 2 })
        );
    }

    #[test]
    fn test_session_state_next_follows_strict_order() {
        assert_eq!(SessionState::Open.next(), Some(SessionState::Started));
        assert_eq!(SessionState::Started.next(), Some(SessionState::Ended));
        assert_eq!(SessionState::Ended.next(), None);
    }

    #[test]
    fn test_session_state_can_transition_to() {
        assert!(SessionState::Open.can_transition_to(SessionState::Started));
        assert!(!SessionState::Open.can_transition_to(SessionState::Ended));
        assert!(!SessionState::Ended.can_transition_to(SessionState::Open));
    }

    #[test]
    fn test_session_state_predicates() {
        assert!(SessionState::Open.is_joinable());
        assert!(!SessionState::Started.is_joinable());
        assert!(SessionState::Started.is_running());
        assert!(!SessionState::Ended.is_running());
    }
}
