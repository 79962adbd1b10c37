//! Matchmaking timings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timings for a queued participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchmakingConfig {
    /// Period of the `waitingTime` notification.
    pub waiting_interval: Duration,

    /// How long a participant waits alone before being paired with the bot.
    pub bot_fallback: Duration,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            waiting_interval: Duration::from_secs(1),
            bot_fallback: Duration::from_secs(10),
        }
    }
}
