//! Match history and player stats, written on a side channel.
//!
//! The registry never awaits the store. It pushes [`StoreCommand`]s into an
//! unbounded channel and moves on; a single writer task drains the channel
//! in order and applies each command to a [`MatchStore`]. A failed write is
//! logged and dropped. Nothing is retried and nothing in memory is rolled
//! back.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use fourline_protocol::{GameResult, Participant, SessionId};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::StoreError;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRecord {
    pub participant: Participant,
    pub display_name: String,
    pub is_bot: bool,
}

/// Written once, when the session is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub session_id: SessionId,
    pub participants: [ParticipantRecord; 2],
    pub created_at: u64,
}

/// One accepted move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    pub session_id: SessionId,
    pub participant: Participant,
    pub column: usize,
    pub row: usize,
    pub played_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TerminalStatus {
    Completed,
    Forfeited,
}

/// How the match ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalRecord {
    pub status: TerminalStatus,
    /// `None` for a draw.
    pub winner: Option<Participant>,
    pub winner_display_name: Option<String>,
    pub completed_at: u64,
}

/// Aggregate results for one display name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub total_games: u32,
}

impl PlayerStats {
    fn record(&mut self, result: GameResult) {
        match result {
            GameResult::Win => self.wins += 1,
            GameResult::Loss => self.losses += 1,
            GameResult::Draw => self.draws += 1,
        }
        self.total_games += 1;
    }
}

// ---------------------------------------------------------------------------
// MatchStore
// ---------------------------------------------------------------------------

/// Durable storage for match history and stats.
///
/// Implementations may be slow or fail; callers only ever reach them
/// through the writer task.
pub trait MatchStore: Send + Sync + 'static {
    fn create_match_record(
        &self,
        record: MatchRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn append_move(
        &self,
        record: MoveRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn mark_terminal(
        &self,
        session_id: SessionId,
        terminal: TerminalRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn increment_stats(
        &self,
        display_name: String,
        result: GameResult,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// One write for the writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCommand {
    CreateMatch(MatchRecord),
    AppendMove(MoveRecord),
    MarkTerminal {
        session_id: SessionId,
        terminal: TerminalRecord,
    },
    IncrementStats {
        display_name: String,
        result: GameResult,
    },
}

impl StoreCommand {
    fn label(&self) -> &'static str {
        match self {
            Self::CreateMatch(_) => "create_match_record",
            Self::AppendMove(_) => "append_move",
            Self::MarkTerminal { .. } => "mark_terminal",
            Self::IncrementStats { .. } => "increment_stats",
        }
    }

    async fn apply<S: MatchStore>(self, store: &S) -> Result<(), StoreError> {
        match self {
            Self::CreateMatch(record) => store.create_match_record(record).await,
            Self::AppendMove(record) => store.append_move(record).await,
            Self::MarkTerminal {
                session_id,
                terminal,
            } => store.mark_terminal(session_id, terminal).await,
            Self::IncrementStats {
                display_name,
                result,
            } => store.increment_stats(display_name, result).await,
        }
    }
}

/// Fire-and-forget handle to the writer task.
#[derive(Debug, Clone)]
pub struct StoreSender {
    tx: mpsc::UnboundedSender<StoreCommand>,
}

impl StoreSender {
    /// Queues a write. Never blocks.
    pub fn send(&self, command: StoreCommand) {
        if let Err(e) = self.tx.send(command) {
            warn!(command = e.0.label(), "store writer stopped, write dropped");
        }
    }

    /// A sender backed by a raw channel, for callers that want to inspect
    /// the commands themselves.
    pub fn from_channel(tx: mpsc::UnboundedSender<StoreCommand>) -> Self {
        Self { tx }
    }
}

/// Spawns the writer task for `store`.
///
/// The task ends once every [`StoreSender`] clone has been dropped and the
/// queue is drained.
pub fn spawn_store_writer<S: MatchStore>(store: S) -> (StoreSender, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<StoreCommand>();
    let handle = tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            let label = command.label();
            match command.apply(&store).await {
                Ok(()) => debug!(command = label, "store write applied"),
                Err(e) => warn!(command = label, error = %e, "store write failed"),
            }
        }
        debug!("store writer stopped");
    });
    (StoreSender { tx }, handle)
}

// ---------------------------------------------------------------------------
// InMemoryStore
// ---------------------------------------------------------------------------

/// Everything stored about one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMatch {
    pub record: MatchRecord,
    pub moves: Vec<MoveRecord>,
    pub terminal: Option<TerminalRecord>,
}

#[derive(Debug, Default)]
struct StoreData {
    matches: HashMap<SessionId, StoredMatch>,
    stats: HashMap<String, PlayerStats>,
}

/// A [`MatchStore`] that keeps everything in process memory.
///
/// Cheap to clone; clones share the same data, so one clone can go to the
/// writer task while another answers queries.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    data: Arc<Mutex<StoreData>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored history for one match.
    pub async fn record(&self, session_id: &SessionId) -> Option<StoredMatch> {
        self.data.lock().await.matches.get(session_id).cloned()
    }

    /// Aggregate stats for a display name.
    pub async fn stats(&self, display_name: &str) -> Option<PlayerStats> {
        self.data.lock().await.stats.get(display_name).copied()
    }

    /// Number of matches recorded.
    pub async fn match_count(&self) -> usize {
        self.data.lock().await.matches.len()
    }
}

impl MatchStore for InMemoryStore {
    async fn create_match_record(&self, record: MatchRecord) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        data.matches
            .entry(record.session_id.clone())
            .or_insert_with(|| StoredMatch {
                record,
                moves: Vec::new(),
                terminal: None,
            });
        Ok(())
    }

    async fn append_move(&self, record: MoveRecord) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        let stored = data
            .matches
            .get_mut(&record.session_id)
            .ok_or_else(|| StoreError::UnknownMatch(record.session_id.clone()))?;
        stored.moves.push(record);
        Ok(())
    }

    async fn mark_terminal(
        &self,
        session_id: SessionId,
        terminal: TerminalRecord,
    ) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        let stored = data
            .matches
            .get_mut(&session_id)
            .ok_or(StoreError::UnknownMatch(session_id))?;
        stored.terminal = Some(terminal);
        Ok(())
    }

    async fn increment_stats(
        &self,
        display_name: String,
        result: GameResult,
    ) -> Result<(), StoreError> {
        self.data
            .lock()
            .await
            .stats
            .entry(display_name)
            .or_default()
            .record(result);
        Ok(())
    }
}
