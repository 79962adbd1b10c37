//! Error types for the session layer.

use fourline_game::BoardError;
use fourline_protocol::{ErrorKind, HumanId, Participant, SessionId};

/// Errors returned to whoever tried to act on a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// No live session has this id (never existed, or already ended).
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// The participant is in the session but it is the other side's turn.
    #[error("not your turn")]
    NotYourTurn,

    /// The participant is not one of the session's two players.
    #[error("{0} is not playing in session {1}")]
    NotParticipant(Participant, SessionId),

    /// The session already has an outcome.
    #[error("session {0} is over")]
    Terminal(SessionId),

    /// The session exists but has not been started.
    #[error("session {0} has not started")]
    NotStarted(SessionId),

    /// The move itself was illegal on the board.
    #[error(transparent)]
    Board(#[from] BoardError),

    /// A participant tried to join a second live session.
    #[error("{0} is already in a session")]
    AlreadyInSession(HumanId),

    /// `create_session` was called twice with the same id.
    #[error("session {0} already exists")]
    DuplicateSession(SessionId),

    /// The pair was not two distinct participants with at most one bot.
    #[error("a session needs two distinct participants")]
    InvalidPairing,
}

impl SessionError {
    /// How this error is reported back to the client.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::NotYourTurn
            | Self::Terminal(_)
            | Self::NotStarted(_)
            | Self::NotParticipant(..) => ErrorKind::InvalidMove,
            Self::Board(e) => e.kind(),
            Self::AlreadyInSession(_)
            | Self::DuplicateSession(_)
            | Self::InvalidPairing => ErrorKind::Validation,
        }
    }
}

/// Errors raised by a [`MatchStore`](crate::MatchStore). These are logged
/// and never reach a client.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A move or result arrived for a match the store has no record of.
    #[error("no match record for session {0}")]
    UnknownMatch(SessionId),

    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_maps_board_errors_through() {
        let out_of_range = SessionError::from(BoardError::ColumnOutOfRange {
            column: 9,
            cols: 7,
        });
        assert_eq!(out_of_range.kind(), ErrorKind::Validation);
        assert_eq!(
            SessionError::from(BoardError::ColumnFull(0)).kind(),
            ErrorKind::InvalidMove
        );
    }

    #[test]
    fn test_kind_for_turn_and_lookup_errors() {
        assert_eq!(SessionError::NotYourTurn.kind(), ErrorKind::InvalidMove);
        assert_eq!(
            SessionError::Terminal(SessionId::new("s")).kind(),
            ErrorKind::InvalidMove
        );
        assert_eq!(
            SessionError::NotFound(SessionId::new("s")).kind(),
            ErrorKind::NotFound
        );
    }
}
