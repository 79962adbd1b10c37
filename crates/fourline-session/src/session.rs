//! Session types: one match between two participants.

use std::fmt;

use fourline_game::{Board, Placement};
use fourline_protocol::{HumanId, Outcome, Participant, ServerEvent, SessionId};

use crate::SessionError;

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a session.
///
/// ```text
///   Created ──→ Active ──┬──→ Won
///                        ├──→ Drawn
///                        └──→ Forfeited
/// ```
///
/// The three right-hand states are terminal. A participant waiting out a
/// reconnect grace period does not change the status; the session stays
/// `Active` until the grace period ends one way or the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Created,
    Active,
    Won,
    Drawn,
    Forfeited,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Won | Self::Drawn | Self::Forfeited)
    }

    /// Returns `true` if moving from `self` to `target` is allowed.
    pub fn can_transition_to(self, target: Self) -> bool {
        match self {
            Self::Created => target == Self::Active,
            Self::Active => target.is_terminal(),
            Self::Won | Self::Drawn | Self::Forfeited => false,
        }
    }

    /// The terminal status an outcome leads to.
    pub fn for_outcome(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Win { .. } => Self::Won,
            Outcome::Draw => Self::Drawn,
            Outcome::Forfeit { .. } => Self::Forfeited,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Active => write!(f, "active"),
            Self::Won => write!(f, "won"),
            Self::Drawn => write!(f, "drawn"),
            Self::Forfeited => write!(f, "forfeited"),
        }
    }
}

// ---------------------------------------------------------------------------
// PendingDisconnect
// ---------------------------------------------------------------------------

/// A participant who dropped mid-game and may still come back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDisconnect {
    pub participant: HumanId,
    pub session_id: SessionId,
    /// Milliseconds since the Unix epoch.
    pub since: u64,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One match. Only the registry mutates it.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    /// Turn order: `participants[0]` moves first.
    pub participants: [Participant; 2],
    pub display_names: [String; 2],
    pub board: Board,
    /// Whose move it is. After the game ends this keeps the last mover.
    pub current_turn: Participant,
    /// Set exactly once, when the game ends.
    pub outcome: Option<Outcome>,
    pub status: SessionStatus,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Milliseconds since the Unix epoch.
    pub last_activity: u64,
}

/// What a single accepted move did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AppliedMove {
    pub placement: Placement,
    pub outcome: Option<Outcome>,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        participants: [Participant; 2],
        display_names: [String; 2],
        now: u64,
    ) -> Self {
        Self {
            id,
            participants,
            display_names,
            board: Board::new(),
            current_turn: participants[0],
            outcome: None,
            status: SessionStatus::Created,
            created_at: now,
            last_activity: now,
        }
    }

    pub(crate) fn activate(&mut self) {
        if self.status.can_transition_to(SessionStatus::Active) {
            self.status = SessionStatus::Active;
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn is_bot_game(&self) -> bool {
        self.participants.iter().any(Participant::is_bot)
    }

    pub fn contains(&self, participant: Participant) -> bool {
        self.participants.contains(&participant)
    }

    /// The other participant, or `None` if `participant` isn't playing.
    pub fn opponent_of(&self, participant: Participant) -> Option<Participant> {
        match self.participants {
            [a, b] if a == participant => Some(b),
            [a, b] if b == participant => Some(a),
            _ => None,
        }
    }

    pub fn display_name_of(&self, participant: Participant) -> Option<&str> {
        self.participants
            .iter()
            .position(|p| *p == participant)
            .map(|i| self.display_names[i].as_str())
    }

    /// The human participants, in turn order.
    pub fn humans(&self) -> impl Iterator<Item = HumanId> + '_ {
        self.participants.iter().filter_map(Participant::human)
    }

    /// Plays `column` for `participant` and passes the turn to the
    /// opponent, also on the move that ends the game. Does not set the
    /// outcome; the registry does that as part of ending the session.
    pub(crate) fn apply_move(
        &mut self,
        column: usize,
        participant: Participant,
        now: u64,
    ) -> Result<AppliedMove, SessionError> {
        match self.status {
            SessionStatus::Active => {}
            SessionStatus::Created => {
                return Err(SessionError::NotStarted(self.id.clone()));
            }
            _ => return Err(SessionError::Terminal(self.id.clone())),
        }
        let Some(opponent) = self.opponent_of(participant) else {
            return Err(SessionError::NotParticipant(participant, self.id.clone()));
        };
        if self.current_turn != participant {
            return Err(SessionError::NotYourTurn);
        }

        let placement = self.board.place_disc(column, participant)?;
        self.last_activity = now;

        let outcome = if placement.wins {
            Some(Outcome::Win {
                winner: participant,
            })
        } else if self.board.is_full() {
            Some(Outcome::Draw)
        } else {
            None
        };
        self.current_turn = opponent;
        Ok(AppliedMove { placement, outcome })
    }

    /// Records the outcome. Returns `false` (and changes nothing) if the
    /// session already had one.
    pub(crate) fn finish(&mut self, outcome: Outcome, now: u64) -> bool {
        let status = SessionStatus::for_outcome(&outcome);
        if self.outcome.is_some() || !self.status.can_transition_to(status) {
            return false;
        }
        self.outcome = Some(outcome);
        self.status = status;
        self.last_activity = now;
        true
    }

    /// Full resync payload for a reconnecting participant.
    pub fn state_event(&self) -> ServerEvent {
        ServerEvent::GameState {
            session_id: self.id.clone(),
            board: self.board.grid(),
            current_turn: self.current_turn,
            participants: self.participants,
            display_names: self.display_names.clone(),
        }
    }
}
