//! Delivery of server events to connected humans.

use std::collections::HashMap;
use std::sync::Arc;

use fourline_protocol::{HumanId, Participant, ServerEvent};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

/// Channel a connection handler drains to write events to its socket.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Maps each connected human to their connection's event channel.
///
/// Cheap to clone; clones share the same map. Events for the bot, or for a
/// human with no live connection (mid-grace-period, for example), are
/// dropped quietly.
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    senders: Arc<Mutex<HashMap<HumanId, EventSender>>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Points `human` at `sender`, replacing any previous connection.
    pub async fn register(&self, human: HumanId, sender: EventSender) {
        self.senders.lock().await.insert(human, sender);
    }

    /// Removes `human`'s channel, but only if it is still `sender`.
    ///
    /// A reconnect re-points the mapping at the new connection; the old
    /// connection's teardown must not undo that.
    pub async fn unregister(&self, human: HumanId, sender: &EventSender) -> bool {
        let mut senders = self.senders.lock().await;
        match senders.get(&human) {
            Some(current) if current.same_channel(sender) => {
                senders.remove(&human);
                true
            }
            _ => false,
        }
    }

    pub async fn is_connected(&self, human: HumanId) -> bool {
        self.senders.lock().await.contains_key(&human)
    }

    /// Sends one event. Returns whether it was handed to a live channel.
    pub async fn send(&self, participant: Participant, event: ServerEvent) -> bool {
        let Some(human) = participant.human() else {
            return false;
        };
        let senders = self.senders.lock().await;
        match senders.get(&human) {
            Some(tx) => tx.send(event).is_ok(),
            None => {
                debug!(%human, "no connection for event, dropped");
                false
            }
        }
    }

    /// Sends a copy of `event` to every human in `participants`.
    pub async fn broadcast(&self, participants: &[Participant], event: &ServerEvent) {
        let senders = self.senders.lock().await;
        for human in participants.iter().filter_map(Participant::human) {
            if let Some(tx) = senders.get(&human) {
                let _ = tx.send(event.clone());
            }
        }
    }
}
