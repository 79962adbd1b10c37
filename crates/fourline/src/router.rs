//! Routes client events to the match queue and the session registry.
//!
//! One [`ConnectionRouter`] serves every connection. Each connection
//! handler owns a [`ClientHandle`] and passes it in with every event; the
//! router keeps the queue-side timers (`waitingTime` ticker and bot
//! fallback) per queued human.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use fourline_lobby::{MatchQueue, MatchmakingConfig, Pairing, validate_display_name};
use fourline_protocol::{ClientEvent, ErrorKind, HumanId, Participant, ServerEvent, SessionId};
use fourline_session::{EventSender, Outbox, SessionError, SessionRegistry};
use fourline_timer::{Clock, Scheduler, TimerHandle};
use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// A connection as the router sees it: who it speaks for and where its
/// outbound events go.
#[derive(Debug)]
pub struct ClientHandle {
    human: HumanId,
    sender: EventSender,
}

impl ClientHandle {
    /// The participant this connection currently plays as. Changes when a
    /// reconnect rebinds the connection to an earlier identity.
    pub fn human(&self) -> HumanId {
        self.human
    }
}

/// Timers that belong to one queued human.
struct QueueTimers {
    /// Distinguishes this arming from a later `findMatch` by the same human.
    generation: u64,
    waiting: TimerHandle,
    /// `None` once the fallback task has taken its own handle.
    fallback: Option<TimerHandle>,
}

impl QueueTimers {
    fn cancel(self) {
        self.waiting.cancel();
        if let Some(fallback) = self.fallback {
            fallback.cancel();
        }
    }
}

/// Entry point for everything a client says.
///
/// Lock order: `queue`, then `timers`, then the registry's own locks.
/// A pairing registers its session before `queue` is released, and
/// `disconnect` holds `queue` across its registry call, so a departing
/// human is always found either in the queue or in a live session.
pub struct ConnectionRouter {
    config: MatchmakingConfig,
    queue: Mutex<MatchQueue>,
    timers: Mutex<HashMap<HumanId, QueueTimers>>,
    registry: Arc<SessionRegistry>,
    outbox: Outbox,
    scheduler: Scheduler,
    next_generation: AtomicU64,
}

impl ConnectionRouter {
    pub fn new(
        config: MatchmakingConfig,
        registry: Arc<SessionRegistry>,
        outbox: Outbox,
        scheduler: Scheduler,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            queue: Mutex::new(MatchQueue::new(clock)),
            timers: Mutex::new(HashMap::new()),
            registry,
            outbox,
            scheduler,
            next_generation: AtomicU64::new(1),
        })
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Registers a new connection and greets it with its identity.
    pub async fn connect(&self, human: HumanId, sender: EventSender) -> ClientHandle {
        self.outbox.register(human, sender.clone()).await;
        self.outbox
            .send(
                human.into(),
                ServerEvent::Welcome {
                    participant: human.into(),
                },
            )
            .await;
        debug!(%human, "client connected");
        ClientHandle { human, sender }
    }

    /// Dispatches one decoded client event.
    pub async fn handle_event(self: &Arc<Self>, client: &mut ClientHandle, event: ClientEvent) {
        match event {
            ClientEvent::FindMatch { username } => {
                self.find_match(client.human, &username).await;
            }
            ClientEvent::MakeMove { session_id, column } => {
                self.make_move(client.human, session_id, column).await;
            }
            ClientEvent::Reconnect {
                session_id,
                participant,
            } => {
                self.reconnect(client, participant, session_id).await;
            }
            ClientEvent::CancelSearch => {
                self.cancel_search(client.human).await;
            }
        }
    }

    /// Cleans up after a closed connection: queue entry, queue timers, and
    /// a grace period if the human was mid-game.
    pub async fn disconnect(self: &Arc<Self>, client: ClientHandle) {
        let human = client.human;
        let (was_queued, in_game) = {
            let mut queue = self.queue.lock().await;
            let was_queued = queue.remove(human);
            self.cancel_timers(human).await;
            let in_game = self.registry.handle_disconnect(human).await;
            (was_queued, in_game)
        };
        self.outbox.unregister(human, &client.sender).await;
        info!(%human, was_queued, in_game, "client disconnected");
    }

    /// Answers the acting connection with an `error` event.
    pub async fn reject(&self, human: HumanId, kind: ErrorKind, message: impl Into<String>) {
        let message = message.into();
        debug!(%human, ?kind, %message, "request rejected");
        self.outbox
            .send(human.into(), ServerEvent::Error { kind, message })
            .await;
    }

    pub async fn is_queued(&self, human: HumanId) -> bool {
        self.queue.lock().await.contains(human)
    }

    /// Cancels every queue timer and every session timer.
    pub async fn shutdown(&self) {
        let timers: Vec<QueueTimers> = self.timers.lock().await.drain().map(|(_, t)| t).collect();
        let count = timers.len();
        for t in timers {
            t.cancel();
        }
        self.registry.shutdown().await;
        info!(queue_timers = count, "router shut down");
    }

    // -----------------------------------------------------------------------
    // findMatch
    // -----------------------------------------------------------------------

    async fn find_match(self: &Arc<Self>, human: HumanId, username: &str) {
        let name = match validate_display_name(username) {
            Ok(name) => name,
            Err(e) => {
                self.reject(human, e.kind(), e.to_string()).await;
                return;
            }
        };

        let mut queue = self.queue.lock().await;
        // A pairing in flight holds `queue` until its session is live.
        if let Some(session_id) = self.registry.session_of(human).await {
            drop(queue);
            self.reject(
                human,
                ErrorKind::Validation,
                format!("already playing in session {session_id}"),
            )
            .await;
            return;
        }

        self.cancel_timers(human).await;
        self.outbox.send(human.into(), ServerEvent::WaitingForOpponent).await;
        if let Err(e) = queue.enqueue(human, &name) {
            drop(queue);
            self.reject(human, e.kind(), e.to_string()).await;
            return;
        }
        info!(%human, display_name = %name, queued = queue.len(), "queued for a match");

        // Timers are armed before the queue lock goes so whoever pairs
        // these humans next finds them to cancel.
        match queue.try_pair() {
            Some(pairing) => {
                for partner in self.start_match(&mut queue, pairing).await {
                    self.arm_timers(partner).await;
                }
            }
            None => self.arm_timers(human).await,
        }
    }

    async fn arm_timers(self: &Arc<Self>, human: HumanId) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        let outbox = self.outbox.clone();
        let waiting = self.scheduler.every(
            "waiting-time",
            self.config.waiting_interval,
            move |elapsed| {
                let outbox = outbox.clone();
                async move {
                    outbox
                        .send(
                            human.into(),
                            ServerEvent::WaitingTime {
                                seconds: elapsed.as_secs(),
                            },
                        )
                        .await;
                    Ok::<_, Infallible>(())
                }
            },
        );

        let router = Arc::clone(self);
        let fallback = self.scheduler.once("bot-fallback", self.config.bot_fallback, async move {
            router.fall_back_to_bot(human, generation).await;
            Ok::<_, Infallible>(())
        });

        let previous = self.timers.lock().await.insert(
            human,
            QueueTimers {
                generation,
                waiting,
                fallback: Some(fallback),
            },
        );
        if let Some(previous) = previous {
            previous.cancel();
        }
    }

    /// Runs when a human has waited `bot_fallback` without an opponent.
    async fn fall_back_to_bot(self: &Arc<Self>, human: HumanId, generation: u64) {
        let timers = {
            let mut timers = self.timers.lock().await;
            match timers.get(&human) {
                Some(t) if t.generation == generation => timers.remove(&human),
                _ => None,
            }
        };
        let Some(mut timers) = timers else {
            debug!(%human, "stale bot fallback ignored");
            return;
        };
        // This task is the fallback; dropping its handle leaves it running.
        drop(timers.fallback.take());
        timers.waiting.cancel();

        let mut queue = self.queue.lock().await;
        match queue.match_with_bot(human) {
            Some(pairing) => {
                info!(%human, "no opponent found, pairing with the bot");
                // The bot side never needs requeueing.
                self.start_match(&mut queue, pairing).await;
            }
            None => debug!(%human, "bot fallback found the human already gone"),
        }
    }

    /// Registers and announces the session for `pairing`, under the queue
    /// lock the caller holds.
    ///
    /// If one human turns out to be in a live session already, they get an
    /// error and their partner goes back to the head of `queue`. Returns
    /// the humans requeued that way; the caller re-arms their timers.
    async fn start_match(&self, queue: &mut MatchQueue, pairing: Pairing) -> Vec<HumanId> {
        for human in pairing.participants.iter().filter_map(Participant::human) {
            self.cancel_timers(human).await;
        }

        let session_id = new_session_id();
        let result = self
            .registry
            .create_session(
                session_id.clone(),
                pairing.participants,
                pairing.display_names.clone(),
            )
            .await;
        let e = match result {
            Ok(session) => {
                info!(%session_id, is_bot = pairing.is_bot, "match found");
                self.outbox
                    .broadcast(
                        &pairing.participants,
                        &ServerEvent::MatchFound {
                            session_id,
                            participants: session.participants,
                            display_names: session.display_names,
                            is_bot: pairing.is_bot,
                        },
                    )
                    .await;
                return Vec::new();
            }
            Err(e) => e,
        };

        warn!(%session_id, error = %e, "could not start match");
        let busy = match &e {
            SessionError::AlreadyInSession(busy) => Some(*busy),
            _ => None,
        };
        let mut requeued = Vec::new();
        for (participant, name) in pairing.participants.iter().zip(pairing.display_names) {
            let Some(human) = participant.human() else {
                continue;
            };
            if busy.is_some_and(|busy| busy != human) {
                if queue.requeue_front(human, name) {
                    info!(%human, "partner unavailable, back at the head of the queue");
                    requeued.push(human);
                }
            } else {
                self.reject(human, e.kind(), e.to_string()).await;
            }
        }
        requeued
    }

    async fn cancel_timers(&self, human: HumanId) {
        let timers = self.timers.lock().await.remove(&human);
        if let Some(timers) = timers {
            timers.cancel();
        }
    }

    // -----------------------------------------------------------------------
    // makeMove / reconnect / cancelSearch
    // -----------------------------------------------------------------------

    async fn make_move(&self, human: HumanId, session_id: SessionId, column: usize) {
        if let Err(e) = self
            .registry
            .make_move(&session_id, column, human.into())
            .await
        {
            debug!(%human, %session_id, column, error = %e, "move rejected");
            self.reject(human, e.kind(), e.to_string()).await;
        }
    }

    async fn reconnect(&self, client: &mut ClientHandle, previous: HumanId, session_id: SessionId) {
        let current = client.human;
        let mut queue = self.queue.lock().await;
        if current != previous && self.registry.session_of(current).await.is_some() {
            drop(queue);
            self.reject(
                current,
                ErrorKind::Validation,
                "this connection is already playing",
            )
            .await;
            return;
        }

        let Some(session) = self.registry.handle_reconnect(previous, &session_id).await else {
            // Unknown session or no pending disconnect: nothing to resume.
            return;
        };

        if current != previous {
            queue.remove(current);
            self.cancel_timers(current).await;
            drop(queue);
            self.outbox.unregister(current, &client.sender).await;
            self.outbox.register(previous, client.sender.clone()).await;
            client.human = previous;
        }
        info!(human = %previous, %session_id, "connection rebound after reconnect");
        self.outbox
            .send(previous.into(), session.state_event())
            .await;
    }

    async fn cancel_search(&self, human: HumanId) {
        self.cancel_timers(human).await;
        let removed = self.queue.lock().await.remove(human);
        if removed {
            info!(%human, "search cancelled");
        }
    }
}

/// A fresh 128-bit session id as lowercase hex.
fn new_session_id() -> SessionId {
    let bits: u128 = rand::rng().random();
    SessionId::new(format!("{bits:032x}"))
}
