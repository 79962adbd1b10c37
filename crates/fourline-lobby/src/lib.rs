//! Matchmaking for fourline.
//!
//! [`MatchQueue`] is the waiting list: first come, first paired. It is a
//! plain value with no locking and no timers of its own. The router wraps it
//! in a mutex and arms two timers per queued participant, per
//! [`MatchmakingConfig`]:
//!
//! - a periodic "you have waited N seconds" notification, and
//! - a one-shot bot fallback.
//!
//! Whichever resolves first (a human opponent or the fallback) wins the
//! race. The loser notices because the participant is no longer in the
//! queue: [`MatchQueue::match_with_bot`] returns `None` for anyone already
//! removed.

mod config;
mod error;
mod queue;

pub use config::MatchmakingConfig;
pub use error::LobbyError;
pub use queue::{
    validate_display_name, MatchQueue, Pairing, QueueEntry, BOT_DISPLAY_NAME,
};
