//! Live match sessions for fourline.
//!
//! This crate owns everything that happens between "two participants were
//! paired" and "the match is over":
//!
//! 1. **Turn enforcement**: [`SessionRegistry::make_move`] serializes moves
//!    per session and rejects anyone playing out of turn.
//! 2. **The bot**: when it is the bot's turn the registry schedules a
//!    delayed move and plays it through the same path as a human move.
//! 3. **Disconnects**: a dropped participant gets a grace period to
//!    reconnect before the opponent wins by forfeit.
//! 4. **Bookkeeping**: match records, moves, results and per-player stats
//!    are pushed to a [`MatchStore`] on a side channel that never blocks
//!    play.
//!
//! # How it fits in the stack
//!
//! ```text
//! fourline (router)   ← calls into the registry for every in-game event
//!     ↕
//! fourline-session    ← this crate: sessions, timers, store writes, outbox
//!     ↕
//! fourline-game       ← board rules and the heuristic opponent
//! ```

mod config;
mod error;
mod outbox;
mod registry;
mod session;
mod store;

pub use config::SessionConfig;
pub use error::{SessionError, StoreError};
pub use outbox::{EventSender, Outbox};
pub use registry::{MoveReport, SessionRegistry};
pub use session::{PendingDisconnect, Session, SessionStatus};
pub use store::{
    spawn_store_writer, InMemoryStore, MatchRecord, MatchStore, MoveRecord,
    ParticipantRecord, PlayerStats, StoreCommand, StoreSender, StoredMatch,
    TerminalRecord, TerminalStatus,
};
