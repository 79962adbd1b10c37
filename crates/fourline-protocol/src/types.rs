//! Core protocol types for fourline's wire format.
//!
//! Everything in this module either travels on the wire or names something
//! that does. Field names are camelCase in JSON because the browser client
//! is written in JavaScript.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifier of a human participant.
///
/// Assigned by the server when a connection is accepted, so it is unique
/// per connection. A newtype rather than a bare `u64` so that it can never
/// be confused with a column index or a timestamp.
///
/// `#[serde(transparent)]` makes `HumanId(42)` serialize as `42`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct HumanId(pub u64);

impl fmt::Display for HumanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H-{}", self.0)
    }
}

/// One side of a match: a connected human or the scripted bot.
///
/// The bot is its own variant rather than a reserved id, so no human id
/// can collide with it.
///
/// JSON shape (adjacently tagged):
///   `{"kind":"human","id":7}` and `{"kind":"bot"}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Participant {
    /// A human bound to a connection.
    Human(HumanId),
    /// The singleton scripted opponent.
    Bot,
}

impl Participant {
    /// Returns `true` for the bot marker.
    pub fn is_bot(&self) -> bool {
        matches!(self, Self::Bot)
    }

    /// Returns the human id, or `None` for the bot.
    pub fn human(&self) -> Option<HumanId> {
        match self {
            Self::Human(id) => Some(*id),
            Self::Bot => None,
        }
    }
}

impl From<HumanId> for Participant {
    fn from(id: HumanId) -> Self {
        Self::Human(id)
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Human(id) => write!(f, "{id}"),
            Self::Bot => write!(f, "BOT"),
        }
    }
}

/// Identifier of a match session.
///
/// Generated by the server as a random hex string. Clients echo it back in
/// `makeMove` and `reconnect`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Wraps any string as a session id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// How a session ended. Once set on a session it never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "result",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Outcome {
    /// `winner` connected four discs.
    Win { winner: Participant },
    /// The board filled up with no line of four.
    Draw,
    /// `forfeited_by` disconnected and did not come back in time.
    Forfeit {
        winner: Participant,
        forfeited_by: Participant,
    },
}

impl Outcome {
    /// The winning participant, if the match was not a draw.
    pub fn winner(&self) -> Option<Participant> {
        match self {
            Self::Win { winner } | Self::Forfeit { winner, .. } => {
                Some(*winner)
            }
            Self::Draw => None,
        }
    }

    /// What this outcome means for one participant's record.
    pub fn result_for(&self, participant: Participant) -> GameResult {
        match self.winner() {
            None => GameResult::Draw,
            Some(winner) if winner == participant => GameResult::Win,
            Some(_) => GameResult::Loss,
        }
    }

    /// The reason reported in the `gameOver` event.
    pub fn reason(&self) -> GameOverReason {
        match self {
            Self::Win { .. } => GameOverReason::FourInARow,
            Self::Draw => GameOverReason::BoardFull,
            Self::Forfeit { .. } => GameOverReason::OpponentDisconnected,
        }
    }

    /// Returns `true` if the match ended by forfeit.
    pub fn is_forfeit(&self) -> bool {
        matches!(self, Self::Forfeit { .. })
    }
}

/// A single participant's result, used for aggregate stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameResult {
    Win,
    Loss,
    Draw,
}

/// Why a `gameOver` event was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameOverReason {
    FourInARow,
    BoardFull,
    OpponentDisconnected,
}

/// Classification of a rejected request, reported alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Bad input at the boundary (empty username, column out of range,
    /// undecodable frame).
    Validation,
    /// A well-formed move the rules don't allow (wrong turn, full column,
    /// finished session).
    InvalidMove,
    /// The referenced session (or queue entry) doesn't exist.
    NotFound,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::InvalidMove => write!(f, "invalid move"),
            Self::NotFound => write!(f, "not found"),
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Client → server events.
///
/// Internally tagged: `{"type":"makeMove","sessionId":"…","column":3}`.
/// Disconnects are not an event; the transport reports them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// "Put me in the queue under this display name."
    FindMatch { username: String },

    /// "Drop my disc in this column."
    MakeMove { session_id: SessionId, column: usize },

    /// "I was `participant` in this session before my connection dropped."
    Reconnect {
        session_id: SessionId,
        participant: HumanId,
    },

    /// "Take me out of the queue."
    CancelSearch,
}

/// Server → client events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Sent once on connect: the identity this connection plays as.
    Welcome { participant: Participant },

    /// The caller has been queued.
    WaitingForOpponent,

    /// Periodic reminder while queued.
    WaitingTime { seconds: u64 },

    /// A session was created for the caller. Sent to both sides with the
    /// same id and the same participant order.
    MatchFound {
        session_id: SessionId,
        participants: [Participant; 2],
        display_names: [String; 2],
        is_bot: bool,
    },

    /// A disc was placed.
    MoveMade {
        session_id: SessionId,
        column: usize,
        row: usize,
        participant: Participant,
        /// `None` once the move ended the game.
        next_turn: Option<Participant>,
    },

    /// The session reached a terminal state.
    GameOver {
        session_id: SessionId,
        /// `None` for a draw.
        winner: Option<Participant>,
        winner_display_name: Option<String>,
        reason: GameOverReason,
    },

    /// Full resync after a successful reconnect. `board[0]` is the top row.
    GameState {
        session_id: SessionId,
        board: Vec<Vec<Option<Participant>>>,
        current_turn: Participant,
        participants: [Participant; 2],
        display_names: [String; 2],
    },

    /// A request from this connection was rejected.
    Error { kind: ErrorKind, message: String },
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The browser client parses these exact JSON shapes, so the serde
    //! attributes are tested directly.

    use super::*;

    fn human(id: u64) -> Participant {
        Participant::Human(HumanId(id))
    }

    // =====================================================================
    // Participant
    // =====================================================================

    #[test]
    fn test_participant_human_serializes_with_kind_and_id() {
        let json = serde_json::to_string(&human(7)).unwrap();
        assert_eq!(json, r#"{"kind":"human","id":7}"#);
    }

    #[test]
    fn test_participant_bot_serializes_without_id() {
        let json = serde_json::to_string(&Participant::Bot).unwrap();
        assert_eq!(json, r#"{"kind":"bot"}"#);
    }

    #[test]
    fn test_participant_bot_never_equals_a_human() {
        // The old string-sentinel design let a human named "BOT" collide
        // with the bot. The enum makes that impossible.
        assert_ne!(Participant::Bot, human(0));
        assert!(Participant::Bot.is_bot());
        assert_eq!(Participant::Bot.human(), None);
        assert_eq!(human(3).human(), Some(HumanId(3)));
    }

    #[test]
    fn test_participant_display() {
        assert_eq!(human(12).to_string(), "H-12");
        assert_eq!(Participant::Bot.to_string(), "BOT");
    }

    // =====================================================================
    // Outcome
    // =====================================================================

    #[test]
    fn test_outcome_result_for_each_side() {
        let win = Outcome::Win { winner: human(1) };
        assert_eq!(win.result_for(human(1)), GameResult::Win);
        assert_eq!(win.result_for(human(2)), GameResult::Loss);

        assert_eq!(Outcome::Draw.result_for(human(1)), GameResult::Draw);
        assert_eq!(Outcome::Draw.winner(), None);
    }

    #[test]
    fn test_outcome_forfeit_winner_and_reason() {
        let outcome = Outcome::Forfeit {
            winner: Participant::Bot,
            forfeited_by: human(4),
        };

        assert_eq!(outcome.winner(), Some(Participant::Bot));
        assert_eq!(outcome.result_for(human(4)), GameResult::Loss);
        assert_eq!(outcome.reason(), GameOverReason::OpponentDisconnected);
        assert!(outcome.is_forfeit());
    }

    #[test]
    fn test_outcome_serializes_with_result_tag() {
        let json = serde_json::to_string(&Outcome::Forfeit {
            winner: human(1),
            forfeited_by: human(2),
        })
        .unwrap();

        assert_eq!(
            json,
            r#"{"result":"forfeit","winner":{"kind":"human","id":1},"forfeitedBy":{"kind":"human","id":2}}"#
        );
    }

    // =====================================================================
    // Client events
    // =====================================================================

    #[test]
    fn test_client_make_move_uses_camel_case_fields() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"makeMove","sessionId":"s-1","column":3}"#,
        )
        .unwrap();

        assert_eq!(
            event,
            ClientEvent::MakeMove {
                session_id: SessionId::new("s-1"),
                column: 3,
            }
        );
    }

    #[test]
    fn test_client_reconnect_carries_previous_identity() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"reconnect","sessionId":"s-1","participant":9}"#,
        )
        .unwrap();

        assert_eq!(
            event,
            ClientEvent::Reconnect {
                session_id: SessionId::new("s-1"),
                participant: HumanId(9),
            }
        );
    }

    #[test]
    fn test_client_cancel_search_is_a_bare_tag() {
        let event: ClientEvent = serde_json::from_str(r#"{"type":"cancelSearch"}"#).unwrap();
        assert_eq!(event, ClientEvent::CancelSearch);
    }

    // =====================================================================
    // Server events
    // =====================================================================

    #[test]
    fn test_server_waiting_for_opponent_is_a_bare_tag() {
        let json = serde_json::to_string(&ServerEvent::WaitingForOpponent).unwrap();
        assert_eq!(json, r#"{"type":"waitingForOpponent"}"#);
    }

    #[test]
    fn test_server_match_found_shape() {
        let event = ServerEvent::MatchFound {
            session_id: SessionId::new("abc"),
            participants: [human(1), Participant::Bot],
            display_names: ["ada".into(), "BOT".into()],
            is_bot: true,
        };

        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["type"], "matchFound");
        assert_eq!(value["sessionId"], "abc");
        assert_eq!(value["participants"][1]["kind"], "bot");
        assert_eq!(value["displayNames"][0], "ada");
        assert_eq!(value["isBot"], true);
    }

    #[test]
    fn test_server_game_over_draw_has_null_winner() {
        let event = ServerEvent::GameOver {
            session_id: SessionId::new("abc"),
            winner: None,
            winner_display_name: None,
            reason: GameOverReason::BoardFull,
        };

        let value = serde_json::to_value(&event).unwrap();

        assert!(value["winner"].is_null());
        assert_eq!(value["reason"], "boardFull");
    }

    #[test]
    fn test_server_error_carries_kind() {
        let json = serde_json::to_string(&ServerEvent::Error {
            kind: ErrorKind::InvalidMove,
            message: "not your turn".into(),
        })
        .unwrap();

        assert_eq!(
            json,
            r#"{"type":"error","kind":"invalidMove","message":"not your turn"}"#
        );
    }
}
