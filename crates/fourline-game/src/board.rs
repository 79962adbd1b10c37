//! The board: a fixed 6×7 grid with gravity.
//!
//! Row 0 is the top, row 5 the bottom. A disc dropped in a column lands
//! in the lowest empty row. Cells are append-only: nothing on this type
//! ever clears or overwrites an occupied cell.

use fourline_protocol::Participant;

use crate::BoardError;

/// Number of rows.
pub const ROWS: usize = 6;

/// Number of columns.
pub const COLS: usize = 7;

/// Discs in a line needed to win.
pub const WIN_LENGTH: usize = 4;

/// How far a run is followed in each direction from the placed cell.
/// Three steps each way is enough to see any line of four through it.
const RUN_RADIUS: usize = WIN_LENGTH - 1;

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// One grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Occupied(Participant),
}

impl Cell {
    /// The owner of the disc in this cell, if any.
    pub fn owner(&self) -> Option<Participant> {
        match self {
            Self::Empty => None,
            Self::Occupied(p) => Some(*p),
        }
    }

    /// Returns `true` if no disc is here.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

// ---------------------------------------------------------------------------
// Axis
// ---------------------------------------------------------------------------

/// The four line directions checked for a win.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Left ↔ right.
    Horizontal,
    /// Up ↕ down.
    Vertical,
    /// Top-left ↘ bottom-right.
    Diagonal,
    /// Top-right ↙ bottom-left.
    AntiDiagonal,
}

impl Axis {
    /// All axes, in the order they are checked.
    pub const ALL: [Axis; 4] = [
        Axis::Horizontal,
        Axis::Vertical,
        Axis::Diagonal,
        Axis::AntiDiagonal,
    ];

    /// The `(row, column)` step of the positive direction.
    fn step(self) -> (isize, isize) {
        match self {
            Self::Horizontal => (0, 1),
            Self::Vertical => (1, 0),
            Self::Diagonal => (1, 1),
            Self::AntiDiagonal => (1, -1),
        }
    }
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

/// Where a dropped disc landed, and whether it completed a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub row: usize,
    pub column: usize,
    /// `true` if the disc made four (or more) in a row on some axis.
    pub wins: bool,
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// The game grid.
///
/// The heuristic probes moves on a copy; the caller's board is never
/// touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Board {
    cells: [[Cell; COLS]; ROWS],
}

impl Board {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cell at `(row, column)`, or `None` if out of range.
    pub fn cell(&self, row: usize, column: usize) -> Option<Cell> {
        self.cells.get(row)?.get(column).copied()
    }

    /// The row a disc dropped in `column` would land in.
    ///
    /// `None` if the column is full or doesn't exist.
    pub fn landing_row(&self, column: usize) -> Option<usize> {
        if column >= COLS {
            return None;
        }
        (0..ROWS).rev().find(|&row| self.cells[row][column].is_empty())
    }

    /// Returns `true` if a disc can still be dropped in `column`.
    pub fn is_playable(&self, column: usize) -> bool {
        self.landing_row(column).is_some()
    }

    /// All columns that still have room, ascending.
    pub fn playable_columns(&self) -> Vec<usize> {
        (0..COLS).filter(|&c| self.is_playable(c)).collect()
    }

    /// Drops `participant`'s disc into `column`.
    ///
    /// The disc lands in the lowest empty row. The win check runs only
    /// at that cell. On error the board is unchanged.
    ///
    /// # Errors
    /// - [`BoardError::ColumnOutOfRange`] if `column >= COLS`
    /// - [`BoardError::ColumnFull`] if the column has no empty cell
    pub fn place_disc(
        &mut self,
        column: usize,
        participant: Participant,
    ) -> Result<Placement, BoardError> {
        if column >= COLS {
            return Err(BoardError::ColumnOutOfRange { column, cols: COLS });
        }
        let row = self
            .landing_row(column)
            .ok_or(BoardError::ColumnFull(column))?;

        self.cells[row][column] = Cell::Occupied(participant);

        Ok(Placement {
            row,
            column,
            wins: self.wins_at(row, column),
        })
    }

    /// Length of the same-owner run through `(row, column)` along `axis`.
    ///
    /// Counts the cell itself plus contiguous same-owner cells in the
    /// positive and negative directions, each followed at most three
    /// steps. Returns 0 for an empty or out-of-range cell.
    pub fn run_length(&self, row: usize, column: usize, axis: Axis) -> usize {
        let Some(owner) = self.cell(row, column).and_then(|c| c.owner())
        else {
            return 0;
        };
        let (dr, dc) = axis.step();

        1 + self.count_direction(row, column, dr, dc, owner)
            + self.count_direction(row, column, -dr, -dc, owner)
    }

    /// Returns `true` if the disc at `(row, column)` is part of a line of
    /// at least four on any axis.
    pub fn wins_at(&self, row: usize, column: usize) -> bool {
        Axis::ALL
            .iter()
            .any(|&axis| self.run_length(row, column, axis) >= WIN_LENGTH)
    }

    /// Returns `true` once the top row has no empty cell.
    ///
    /// With gravity, a full top row means a full board.
    pub fn is_full(&self) -> bool {
        self.cells[0].iter().all(|c| !c.is_empty())
    }

    /// Number of discs on the board.
    pub fn disc_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|c| !c.is_empty())
            .count()
    }

    /// The grid as nested rows of owners, top row first. This is the
    /// shape sent to clients in a `gameState` resync.
    pub fn grid(&self) -> Vec<Vec<Option<Participant>>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(Cell::owner).collect())
            .collect()
    }

    /// Walks from `(row, column)` in direction `(dr, dc)` and counts
    /// contiguous cells owned by `owner`, not counting the start cell.
    fn count_direction(
        &self,
        row: usize,
        column: usize,
        dr: isize,
        dc: isize,
        owner: Participant,
    ) -> usize {
        let mut count = 0;
        for i in 1..=RUN_RADIUS as isize {
            let r = row as isize + dr * i;
            let c = column as isize + dc * i;
            if r < 0 || c < 0 {
                break;
            }
            match self.cell(r as usize, c as usize) {
                Some(Cell::Occupied(p)) if p == owner => count += 1,
                _ => break,
            }
        }
        count
    }
}
