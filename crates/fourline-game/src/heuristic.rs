//! The bot's move policy.
//!
//! A shallow cascade, not a search. Each step is consulted only if the
//! previous one found nothing:
//!
//! 1. **Win**: the first column (left to right) that wins right now.
//! 2. **Block**: the first column that would let the opponent win.
//! 3. **Threat**: the column whose placement lines up three on the most
//!    axes (strictly greater wins, so the leftmost column keeps ties).
//! 4. **Center**: a random playable column among 2, 3 and 4.
//! 5. **Fallback**: a random playable column.
//!
//! All probing happens on a copy of the board; the caller's board is
//! borrowed immutably and cannot change.

use std::ops::RangeInclusive;

use fourline_protocol::Participant;
use rand::Rng;

use crate::{Axis, Board, BoardError, COLS};

/// Columns preferred when nothing tactical is on the board.
const CENTER_COLUMNS: RangeInclusive<usize> = 2..=4;

/// A run of this length on an axis counts as one threat.
const THREAT_RUN: usize = 3;

/// Which step of the cascade produced a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionStep {
    Win,
    Block,
    Threat,
    Center,
    Fallback,
}

/// A chosen column and the reason it was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub column: usize,
    pub step: DecisionStep,
}

/// The heuristic opponent. Stateless; randomness comes from the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpponentHeuristic;

impl OpponentHeuristic {
    /// Creates the heuristic.
    pub fn new() -> Self {
        Self
    }

    /// Picks a column for `me` to play against `opponent`.
    ///
    /// # Errors
    /// [`BoardError::NoMoveAvailable`] if the board is full.
    pub fn select_move<R: Rng>(
        &self,
        board: &Board,
        me: Participant,
        opponent: Participant,
        rng: &mut R,
    ) -> Result<usize, BoardError> {
        self.decide(board, me, opponent, rng).map(|d| d.column)
    }

    /// Same as [`select_move`](Self::select_move), but also reports which
    /// step of the cascade fired.
    pub fn decide<R: Rng>(
        &self,
        board: &Board,
        me: Participant,
        opponent: Participant,
        rng: &mut R,
    ) -> Result<Decision, BoardError> {
        let playable = board.playable_columns();
        if playable.is_empty() {
            return Err(BoardError::NoMoveAvailable);
        }

        if let Some(column) = winning_column(board, me) {
            return Ok(Decision { column, step: DecisionStep::Win });
        }
        if let Some(column) = winning_column(board, opponent) {
            return Ok(Decision { column, step: DecisionStep::Block });
        }
        if let Some(column) = best_threat_column(board, me) {
            return Ok(Decision { column, step: DecisionStep::Threat });
        }

        let center: Vec<usize> = playable
            .iter()
            .copied()
            .filter(|c| CENTER_COLUMNS.contains(c))
            .collect();
        if !center.is_empty() {
            let column = center[rng.random_range(0..center.len())];
            return Ok(Decision { column, step: DecisionStep::Center });
        }

        let column = playable[rng.random_range(0..playable.len())];
        Ok(Decision { column, step: DecisionStep::Fallback })
    }
}

/// The leftmost column where `who` wins immediately, if any.
pub(crate) fn winning_column(board: &Board, who: Participant) -> Option<usize> {
    (0..COLS).find(|&column| {
        let mut probe = *board;
        probe
            .place_disc(column, who)
            .map(|placement| placement.wins)
            .unwrap_or(false)
    })
}

/// Number of axes on which dropping `who` into `column` makes a run of at
/// least three. `None` if the column is not playable.
pub(crate) fn threat_count(board: &Board, column: usize, who: Participant) -> Option<usize> {
    let mut probe = *board;
    let placement = probe.place_disc(column, who).ok()?;
    Some(
        Axis::ALL
            .iter()
            .filter(|&&axis| {
                probe.run_length(placement.row, placement.column, axis)
                    >= THREAT_RUN
            })
            .count(),
    )
}

/// The column with the strictly highest non-zero threat count, scanning
/// left to right.
fn best_threat_column(board: &Board, who: Participant) -> Option<usize> {
    let mut best: Option<usize> = None;
    let mut best_count = 0;
    for column in 0..COLS {
        if let Some(count) = threat_count(board, column, who) {
            if count > best_count {
                best_count = count;
                best = Some(column);
            }
        }
    }
    best
}
