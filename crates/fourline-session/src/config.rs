//! Session timings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for live sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long a disconnected participant has to come back before the
    /// opponent wins by forfeit.
    ///
    /// Default: 30 seconds.
    pub reconnect_grace: Duration,

    /// Pause before the bot plays, so its moves read as moves and not as
    /// part of the human's.
    ///
    /// Default: 800 milliseconds.
    pub bot_move_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_grace: Duration::from_secs(30),
            bot_move_delay: Duration::from_millis(800),
        }
    }
}
