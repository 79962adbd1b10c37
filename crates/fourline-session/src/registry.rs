//! The session registry: every live match, and the timers around them.
//!
//! # Locking
//!
//! Three kinds of lock, always taken in this order and never the other way
//! round:
//!
//! 1. a per-session slot lock, held for the whole of a move (this is what
//!    serializes moves within one session),
//! 2. `live`, the session table and participant index,
//! 3. `pending`, the disconnected participants.
//!
//! Lookups take `live` just long enough to clone a slot's `Arc`, then drop
//! it before locking the slot. Different sessions never contend on
//! anything but those brief lookups.
//!
//! # Timers
//!
//! Two timers live here: the bot's move delay (one per session, held in the
//! slot) and the reconnect grace period (one per disconnected participant,
//! held in the pending entry). A timer that fires re-checks the live state
//! under the proper lock before doing anything, so a late or superseded
//! timer is a no-op. A timer's own task removes its handle with `take()`
//! and drops it; only *other* code cancels.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fourline_game::{Board, BoardError, OpponentHeuristic, Placement};
use fourline_protocol::{HumanId, Outcome, Participant, ServerEvent, SessionId};
use fourline_timer::{Clock, Scheduler, TimerHandle};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::session::AppliedMove;
use crate::store::{
    MatchRecord, MoveRecord, ParticipantRecord, StoreCommand, StoreSender, TerminalRecord,
    TerminalStatus,
};
use crate::{Outbox, PendingDisconnect, Session, SessionConfig, SessionError};

/// What an accepted move did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReport {
    pub session_id: SessionId,
    pub participant: Participant,
    pub placement: Placement,
    /// Set if this move ended the game.
    pub outcome: Option<Outcome>,
    /// Who moves next; `None` once the game is over.
    pub next_turn: Option<Participant>,
}

type Slot = Arc<Mutex<SessionSlot>>;

struct SessionSlot {
    session: Session,
    /// The scheduled bot move, if it is the bot's turn.
    bot_move: Option<TimerHandle>,
}

#[derive(Default)]
struct Live {
    sessions: HashMap<SessionId, Slot>,
    by_participant: HashMap<HumanId, SessionId>,
}

struct PendingEntry {
    info: PendingDisconnect,
    /// Distinguishes this disconnect from an earlier one by the same
    /// participant whose timer may still fire.
    generation: u64,
    grace_timer: Option<TimerHandle>,
}

/// Owns all live sessions.
///
/// Built once at startup and shared as `Arc<SessionRegistry>`. Operations
/// that schedule timers take `self: &Arc<Self>` so the timer task can hold
/// its own reference.
pub struct SessionRegistry {
    config: SessionConfig,
    live: Mutex<Live>,
    pending: Mutex<HashMap<HumanId, PendingEntry>>,
    outbox: Outbox,
    store: StoreSender,
    scheduler: Scheduler,
    clock: Arc<dyn Clock>,
    heuristic: OpponentHeuristic,
    next_generation: AtomicU64,
}

impl SessionRegistry {
    pub fn new(
        config: SessionConfig,
        outbox: Outbox,
        store: StoreSender,
        scheduler: Scheduler,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            live: Mutex::new(Live::default()),
            pending: Mutex::new(HashMap::new()),
            outbox,
            store,
            scheduler,
            clock,
            heuristic: OpponentHeuristic::new(),
            next_generation: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Starts a new session and records it with the store.
    ///
    /// `participants[0]` moves first. If that is the bot, its first move is
    /// scheduled right away.
    ///
    /// # Errors
    /// - [`SessionError::DuplicateSession`] if `id` is already live
    /// - [`SessionError::AlreadyInSession`] if either human is already
    ///   playing
    /// - [`SessionError::InvalidPairing`] if both sides are the same
    pub async fn create_session(
        self: &Arc<Self>,
        id: SessionId,
        participants: [Participant; 2],
        display_names: [String; 2],
    ) -> Result<Session, SessionError> {
        if participants[0] == participants[1] {
            return Err(SessionError::InvalidPairing);
        }
        let mut session = Session::new(
            id.clone(),
            participants,
            display_names,
            self.clock.now_millis(),
        );
        session.activate();
        let snapshot = session.clone();
        let slot = Arc::new(Mutex::new(SessionSlot {
            session,
            bot_move: None,
        }));

        {
            let mut live = self.live.lock().await;
            if live.sessions.contains_key(&id) {
                return Err(SessionError::DuplicateSession(id));
            }
            if let Some(busy) = snapshot.humans().find(|h| live.by_participant.contains_key(h)) {
                return Err(SessionError::AlreadyInSession(busy));
            }
            for human in snapshot.humans() {
                live.by_participant.insert(human, id.clone());
            }
            live.sessions.insert(id.clone(), Arc::clone(&slot));
        }

        self.store.send(StoreCommand::CreateMatch(match_record(&snapshot)));
        info!(
            session_id = %id,
            first = %participants[0],
            second = %participants[1],
            bot = snapshot.is_bot_game(),
            "session created"
        );

        if snapshot.current_turn.is_bot() {
            let mut state = slot.lock().await;
            if state.session.is_active() && state.bot_move.is_none() {
                state.bot_move = Some(self.schedule_bot_move(id));
            }
        }
        Ok(snapshot)
    }

    /// Plays `column` for `participant` in session `id`.
    ///
    /// On success every human in the session gets a `moveMade`, and a
    /// `gameOver` too if the move ended the game (the session is gone from
    /// the registry by the time this returns). If the bot is next, its move
    /// is scheduled.
    ///
    /// # Errors
    /// [`SessionError::NotFound`], [`SessionError::NotYourTurn`],
    /// [`SessionError::Terminal`], or a board error for an illegal column.
    /// Nothing changes on error.
    pub async fn make_move(
        self: &Arc<Self>,
        id: &SessionId,
        column: usize,
        participant: Participant,
    ) -> Result<MoveReport, SessionError> {
        let slot = self
            .slot(id)
            .await
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;
        let mut state = slot.lock().await;
        self.play_locked(&mut state, column, participant).await
    }

    /// Plays the bot's move in session `id`, if it is still due.
    ///
    /// Returns `Ok(None)` when there is nothing to do: the session ended,
    /// or it is no longer the bot's turn.
    pub async fn run_bot_move(
        self: &Arc<Self>,
        id: &SessionId,
    ) -> Result<Option<MoveReport>, SessionError> {
        let Some(slot) = self.slot(id).await else {
            debug!(session_id = %id, "bot move for a finished session, skipped");
            return Ok(None);
        };
        let mut state = slot.lock().await;
        // Ours, if called from the timer: drop it rather than cancel it.
        drop(state.bot_move.take());

        if !state.session.is_active() || state.session.current_turn != Participant::Bot {
            debug!(session_id = %id, "bot move no longer due, skipped");
            return Ok(None);
        }
        let opponent = state
            .session
            .opponent_of(Participant::Bot)
            .ok_or_else(|| SessionError::NotParticipant(Participant::Bot, id.clone()))?;
        let column = self.choose_bot_column(&state.session.board, opponent)?;
        self.play_locked(&mut state, column, Participant::Bot)
            .await
            .map(Some)
    }

    /// Ends session `id` with `outcome`.
    ///
    /// Idempotent: returns `false` if the session is unknown or already
    /// over. On the first call the result goes to the store, stats are
    /// bumped for each human (keyed by display name), both sides get a
    /// `gameOver`, and the session leaves the registry along with any
    /// pending disconnects and timers tied to it.
    pub async fn end_session(&self, id: &SessionId, outcome: Outcome) -> bool {
        let Some(slot) = self.slot(id).await else {
            return false;
        };
        let mut state = slot.lock().await;
        self.finish_locked(&mut state, outcome).await
    }

    // -----------------------------------------------------------------------
    // Disconnect / reconnect
    // -----------------------------------------------------------------------

    /// Starts the grace period for a participant whose connection dropped.
    ///
    /// Returns `false` if they were not in a live session. A second
    /// disconnect replaces the first and restarts the clock.
    pub async fn handle_disconnect(self: &Arc<Self>, human: HumanId) -> bool {
        let Some(session_id) = self.session_of(human).await else {
            return false;
        };
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let info = PendingDisconnect {
            participant: human,
            session_id: session_id.clone(),
            since: self.clock.now_millis(),
        };

        {
            let mut pending = self.pending.lock().await;
            // Armed under the lock, so the timer can't look before the
            // entry is in place.
            let timer = self.schedule_grace(human, generation);
            let previous = pending.insert(
                human,
                PendingEntry {
                    info,
                    generation,
                    grace_timer: Some(timer),
                },
            );
            if let Some(timer) = previous.and_then(|p| p.grace_timer) {
                timer.cancel();
            }
        }

        info!(
            %human,
            %session_id,
            grace_secs = self.config.reconnect_grace.as_secs(),
            "participant disconnected, grace period started"
        );
        true
    }

    /// Clears a pending disconnect and returns the session for a resync.
    ///
    /// `None` if `human` had no pending disconnect for `session_id`, or if
    /// the grace period already ran out.
    pub async fn handle_reconnect(
        &self,
        human: HumanId,
        session_id: &SessionId,
    ) -> Option<Session> {
        let entry = {
            let mut pending = self.pending.lock().await;
            match pending.get(&human) {
                Some(e) if e.info.session_id == *session_id => pending.remove(&human),
                _ => None,
            }
        };
        let Some(entry) = entry else {
            debug!(%human, %session_id, "reconnect without a pending disconnect");
            return None;
        };
        if let Some(timer) = entry.grace_timer {
            timer.cancel();
        }

        let slot = self.slot(session_id).await?;
        let state = slot.lock().await;
        if !state.session.is_active() {
            return None;
        }
        info!(%human, %session_id, "participant reconnected");
        Some(state.session.clone())
    }

    /// Grace period ran out: the other participant wins by forfeit.
    async fn expire_grace(&self, human: HumanId, generation: u64) -> Option<Outcome> {
        let entry = {
            let mut pending = self.pending.lock().await;
            match pending.get(&human) {
                Some(e) if e.generation == generation => pending.remove(&human),
                _ => None,
            }
        };
        let Some(entry) = entry else {
            debug!(%human, "grace timer superseded, skipped");
            return None;
        };
        // `entry.grace_timer` is the task running this; it is dropped here,
        // not cancelled.

        let session_id = entry.info.session_id;
        let slot = self.slot(&session_id).await?;
        let mut state = slot.lock().await;
        let loser = Participant::Human(human);
        let winner = state.session.opponent_of(loser)?;
        let outcome = Outcome::Forfeit {
            winner,
            forfeited_by: loser,
        };
        if self.finish_locked(&mut state, outcome).await {
            info!(%session_id, %human, %winner, "forfeit after grace period");
            Some(outcome)
        } else {
            None
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// A copy of the live session `id`.
    pub async fn snapshot(&self, id: &SessionId) -> Option<Session> {
        let slot = self.slot(id).await?;
        let state = slot.lock().await;
        Some(state.session.clone())
    }

    /// The live session `human` is playing in.
    pub async fn session_of(&self, human: HumanId) -> Option<SessionId> {
        self.live.lock().await.by_participant.get(&human).cloned()
    }

    pub async fn is_pending_forfeit(&self, human: HumanId) -> bool {
        self.pending.lock().await.contains_key(&human)
    }

    pub async fn pending_disconnect(&self, human: HumanId) -> Option<PendingDisconnect> {
        self.pending.lock().await.get(&human).map(|e| e.info.clone())
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.live.lock().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Cancels every grace and bot-move timer. Sessions stay where they
    /// are; nothing more will happen to them on its own.
    pub async fn shutdown(&self) {
        let pending: Vec<_> = self.pending.lock().await.drain().collect();
        for (_, entry) in pending {
            if let Some(timer) = entry.grace_timer {
                timer.cancel();
            }
        }

        let slots: Vec<Slot> = self.live.lock().await.sessions.values().cloned().collect();
        for slot in &slots {
            if let Some(timer) = slot.lock().await.bot_move.take() {
                timer.cancel();
            }
        }
        info!(sessions = slots.len(), "session registry shut down");
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn slot(&self, id: &SessionId) -> Option<Slot> {
        self.live.lock().await.sessions.get(id).cloned()
    }

    /// Applies a move with the slot already locked.
    async fn play_locked(
        self: &Arc<Self>,
        slot: &mut SessionSlot,
        column: usize,
        participant: Participant,
    ) -> Result<MoveReport, SessionError> {
        let now = self.clock.now_millis();
        let AppliedMove { placement, outcome } = slot
            .session
            .apply_move(column, participant, now)
            .inspect_err(|e| {
                debug!(
                    session_id = %slot.session.id,
                    %participant,
                    column,
                    error = %e,
                    "move rejected"
                );
            })?;
        let session_id = slot.session.id.clone();

        self.store.send(StoreCommand::AppendMove(MoveRecord {
            session_id: session_id.clone(),
            participant,
            column: placement.column,
            row: placement.row,
            played_at: now,
        }));

        let next_turn = outcome.is_none().then_some(slot.session.current_turn);
        self.outbox
            .broadcast(
                &slot.session.participants,
                &ServerEvent::MoveMade {
                    session_id: session_id.clone(),
                    column: placement.column,
                    row: placement.row,
                    participant,
                    next_turn,
                },
            )
            .await;

        match outcome {
            Some(outcome) => {
                self.finish_locked(slot, outcome).await;
            }
            None if next_turn == Some(Participant::Bot) => {
                let timer = self.schedule_bot_move(session_id.clone());
                if let Some(stale) = slot.bot_move.replace(timer) {
                    stale.cancel();
                }
            }
            None => {}
        }

        Ok(MoveReport {
            session_id,
            participant,
            placement,
            outcome,
            next_turn,
        })
    }

    /// Ends the session with the slot already locked. `false` if it had
    /// already ended.
    async fn finish_locked(&self, slot: &mut SessionSlot, outcome: Outcome) -> bool {
        let now = self.clock.now_millis();
        if !slot.session.finish(outcome, now) {
            return false;
        }
        if let Some(timer) = slot.bot_move.take() {
            timer.cancel();
        }

        let session = &slot.session;
        let id = session.id.clone();
        let winner = outcome.winner();
        let winner_display_name = winner
            .and_then(|w| session.display_name_of(w))
            .map(str::to_owned);

        self.store.send(StoreCommand::MarkTerminal {
            session_id: id.clone(),
            terminal: TerminalRecord {
                status: if outcome.is_forfeit() {
                    TerminalStatus::Forfeited
                } else {
                    TerminalStatus::Completed
                },
                winner,
                winner_display_name: winner_display_name.clone(),
                completed_at: now,
            },
        });
        for (participant, name) in session.participants.iter().zip(&session.display_names) {
            if participant.is_bot() {
                continue;
            }
            self.store.send(StoreCommand::IncrementStats {
                display_name: name.clone(),
                result: outcome.result_for(*participant),
            });
        }

        self.outbox
            .broadcast(
                &session.participants,
                &ServerEvent::GameOver {
                    session_id: id.clone(),
                    winner,
                    winner_display_name,
                    reason: outcome.reason(),
                },
            )
            .await;

        {
            let mut live = self.live.lock().await;
            live.sessions.remove(&id);
            for human in session.humans() {
                if live.by_participant.get(&human) == Some(&id) {
                    live.by_participant.remove(&human);
                }
            }
        }
        {
            let mut pending = self.pending.lock().await;
            pending.retain(|_, entry| {
                if entry.info.session_id != id {
                    return true;
                }
                if let Some(timer) = entry.grace_timer.take() {
                    timer.cancel();
                }
                false
            });
        }

        info!(
            session_id = %id,
            status = %session.status,
            reason = ?outcome.reason(),
            "session ended"
        );
        true
    }

    fn schedule_bot_move(self: &Arc<Self>, id: SessionId) -> TimerHandle {
        let registry = Arc::clone(self);
        self.scheduler
            .once("bot-move", self.config.bot_move_delay, async move {
                registry.run_bot_move(&id).await.map(|_| ())
            })
    }

    fn schedule_grace(self: &Arc<Self>, human: HumanId, generation: u64) -> TimerHandle {
        let registry = Arc::clone(self);
        self.scheduler
            .once("reconnect-grace", self.config.reconnect_grace, async move {
                registry.expire_grace(human, generation).await;
                Ok::<_, Infallible>(())
            })
    }

    /// Runs the heuristic. Kept synchronous: the thread-local RNG must not
    /// be held across an await.
    fn choose_bot_column(&self, board: &Board, opponent: Participant) -> Result<usize, BoardError> {
        let mut rng = rand::rng();
        self.heuristic
            .select_move(board, Participant::Bot, opponent, &mut rng)
    }
}

fn match_record(session: &Session) -> MatchRecord {
    let [first, second] = session.participants;
    let record = |participant: Participant, name: &String| ParticipantRecord {
        participant,
        display_name: name.clone(),
        is_bot: participant.is_bot(),
    };
    MatchRecord {
        session_id: session.id.clone(),
        participants: [
            record(first, &session.display_names[0]),
            record(second, &session.display_names[1]),
        ],
        created_at: session.created_at,
    }
}
