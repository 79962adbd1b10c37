//! Error types for the game rules.

use fourline_protocol::ErrorKind;

/// Errors produced by the board and the opponent heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// The column has no empty cell left.
    #[error("column {0} is full")]
    ColumnFull(usize),

    /// The column index is outside `0..COLS`.
    #[error("column {column} is out of range (0..{cols})")]
    ColumnOutOfRange { column: usize, cols: usize },

    /// Every column is full. Callers check for a draw first, so seeing this
    /// means the board was asked for a move after the game ended.
    #[error("no playable column left")]
    NoMoveAvailable,
}

impl BoardError {
    /// How this error is reported back to the client.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ColumnOutOfRange { .. } => ErrorKind::Validation,
            Self::ColumnFull(_) | Self::NoMoveAvailable => {
                ErrorKind::InvalidMove
            }
        }
    }
}
