//! Timers and time sources for fourline.
//!
//! Every piece of delayed work in the server (the waiting-time ticker, the
//! bot-fallback timer, the bot's move delay, the reconnect grace period) is
//! a task spawned through a [`Scheduler`] and owned through a
//! [`TimerHandle`]. Whoever owns the handle decides when to cancel it.
//!
//! Timers run on tokio time, so tests drive them with
//! `#[tokio::test(start_paused = true)]`. Timestamps that end up in records
//! (enqueue time, last activity, disconnect time) come from a [`Clock`] so
//! they can be pinned in tests as well.
//!
//! ```ignore
//! let scheduler = Scheduler::new();
//! let handle = scheduler.once("bot-fallback", Duration::from_secs(10), async move {
//!     router.fallback_to_bot(human).await
//! });
//! // ...matched with a human first:
//! handle.cancel();
//! ```

mod clock;
mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use scheduler::{Scheduler, TimerHandle};
