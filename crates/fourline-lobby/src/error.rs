//! Error types for matchmaking.

use fourline_protocol::ErrorKind;

/// Errors raised before a participant is allowed into the queue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LobbyError {
    /// The username was empty or only whitespace.
    #[error("username must not be empty")]
    EmptyDisplayName,
}

impl LobbyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyDisplayName => ErrorKind::Validation,
        }
    }
}
