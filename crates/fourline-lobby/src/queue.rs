//! The FIFO waiting list.

use std::collections::VecDeque;
use std::sync::Arc;

use fourline_protocol::{HumanId, Participant};
use fourline_timer::Clock;
use tracing::debug;

use crate::LobbyError;

/// Display name used for the bot in pairings.
pub const BOT_DISPLAY_NAME: &str = "Bot";

/// One waiting participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub human: HumanId,
    pub display_name: String,
    /// Milliseconds since the Unix epoch, from the queue's clock.
    pub enqueued_at: u64,
}

/// Two participants ready to play, in turn order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    pub participants: [Participant; 2],
    pub display_names: [String; 2],
    pub is_bot: bool,
}

/// Trims a requested username and rejects it if nothing is left.
pub fn validate_display_name(raw: &str) -> Result<String, LobbyError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(LobbyError::EmptyDisplayName);
    }
    Ok(name.to_owned())
}

/// First-in, first-out queue of humans waiting for an opponent.
///
/// A participant appears at most once. Not synchronized; the owner wraps it
/// in a lock.
#[derive(Debug)]
pub struct MatchQueue {
    entries: VecDeque<QueueEntry>,
    clock: Arc<dyn Clock>,
}

impl MatchQueue {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: VecDeque::new(),
            clock,
        }
    }

    /// Adds `human` to the back of the queue.
    ///
    /// The name is validated before anything changes. Returns `Ok(false)`
    /// if the participant was already queued; their original entry (and
    /// place in line) is kept.
    pub fn enqueue(&mut self, human: HumanId, display_name: &str) -> Result<bool, LobbyError> {
        let display_name = validate_display_name(display_name)?;
        if self.contains(human) {
            debug!(%human, "already queued");
            return Ok(false);
        }
        self.entries.push_back(QueueEntry {
            human,
            display_name,
            enqueued_at: self.clock.now_millis(),
        });
        debug!(%human, waiting = self.entries.len(), "queued");
        Ok(true)
    }

    /// Takes the two longest-waiting entries, if there are two.
    pub fn try_pair(&mut self) -> Option<Pairing> {
        if self.entries.len() < 2 {
            return None;
        }
        let first = self.entries.pop_front()?;
        let second = self.entries.pop_front()?;
        Some(Pairing {
            participants: [first.human.into(), second.human.into()],
            display_names: [first.display_name, second.display_name],
            is_bot: false,
        })
    }

    /// Takes `human` out of the queue and pairs them with the bot.
    ///
    /// `None` means the participant was no longer waiting (already paired,
    /// cancelled, or disconnected), and the caller should do nothing.
    pub fn match_with_bot(&mut self, human: HumanId) -> Option<Pairing> {
        let entry = self.take(human)?;
        Some(Pairing {
            participants: [entry.human.into(), Participant::Bot],
            display_names: [entry.display_name, BOT_DISPLAY_NAME.to_owned()],
            is_bot: true,
        })
    }

    /// Puts `human` back at the head of the line after a pairing fell
    /// through. Returns `false` if they were already queued.
    pub fn requeue_front(&mut self, human: HumanId, display_name: String) -> bool {
        if self.contains(human) {
            return false;
        }
        self.entries.push_front(QueueEntry {
            human,
            display_name,
            enqueued_at: self.clock.now_millis(),
        });
        debug!(%human, waiting = self.entries.len(), "requeued at the front");
        true
    }

    /// Removes `human` if present. Returns whether anything was removed.
    pub fn remove(&mut self, human: HumanId) -> bool {
        self.take(human).is_some()
    }

    pub fn contains(&self, human: HumanId) -> bool {
        self.entries.iter().any(|e| e.human == human)
    }

    /// The entry for `human`, if queued.
    pub fn entry(&self, human: HumanId) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| e.human == human)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn take(&mut self, human: HumanId) -> Option<QueueEntry> {
        let idx = self.entries.iter().position(|e| e.human == human)?;
        self.entries.remove(idx)
    }
}
