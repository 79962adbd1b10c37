//! Game rules for fourline.
//!
//! - [`Board`]: the 6×7 grid, gravity placement, and win detection at the
//!   last placed cell.
//! - [`OpponentHeuristic`]: the bot's move policy: win, block, build
//!   threats, prefer the center, otherwise random.
//!
//! Nothing here is async or shared. The session layer owns a board per
//! match and serializes access to it.

mod board;
mod error;
mod heuristic;

pub use board::{Axis, Board, Cell, Placement, COLS, ROWS, WIN_LENGTH};
pub use error::BoardError;
pub use heuristic::{Decision, DecisionStep, OpponentHeuristic};
