// In-memory session registry for the HTTP surface.
// Each session owns its agent state behind an async mutex (one run at a time),
// plus a transcript mirror and run records that readers can query mid-run.

pub mod handlers;
pub mod runner;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::agent::conversation::ConversationTurn;
use crate::agent::AnalysisSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RunError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turns_used: Option<usize>,
    #[serde(skip)]
    pub cancel: CancellationToken,
}

impl RunRecord {
    pub fn new(file_name: Option<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            status: RunStatus::Running,
            file_name,
            created_at: Utc::now(),
            finished_at: None,
            answer: None,
            error: None,
            turns_used: None,
            cancel: CancellationToken::new(),
        }
    }
}

pub struct SessionEntry {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    state: Arc<Mutex<AnalysisSession>>,
    transcript: RwLock<Vec<ConversationTurn>>,
    runs: RwLock<Vec<RunRecord>>,
    last_active: std::sync::Mutex<Instant>,
}

impl SessionEntry {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            state: Arc::new(Mutex::new(AnalysisSession::default())),
            transcript: RwLock::new(Vec::new()),
            runs: RwLock::new(Vec::new()),
            last_active: std::sync::Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        if let Ok(mut at) = self.last_active.lock() {
            *at = Instant::now();
        }
    }

    fn idle_for(&self) -> Duration {
        self.last_active
            .lock()
            .map(|at| at.elapsed())
            .unwrap_or_default()
    }

    pub fn is_busy(&self) -> bool {
        self.state.try_lock().is_err()
    }

    /// Claims the agent state for a run, or `None` when a run is in progress.
    pub fn try_claim(&self) -> Option<OwnedMutexGuard<AnalysisSession>> {
        self.state.clone().try_lock_owned().ok()
    }

    pub async fn transcript(&self) -> Vec<ConversationTurn> {
        self.transcript.read().await.clone()
    }

    pub async fn push_turn(&self, turn: ConversationTurn) {
        self.touch();
        self.transcript.write().await.push(turn);
    }

    pub async fn runs(&self) -> Vec<RunRecord> {
        self.runs.read().await.clone()
    }

    pub async fn run(&self, run_id: Uuid) -> Option<RunRecord> {
        self.runs
            .read()
            .await
            .iter()
            .find(|r| r.run_id == run_id)
            .cloned()
    }

    pub async fn add_run(&self, record: RunRecord) {
        self.touch();
        self.runs.write().await.push(record);
    }

    /// Applies `f` to the run record and returns the updated copy.
    pub async fn update_run(
        &self,
        run_id: Uuid,
        f: impl FnOnce(&mut RunRecord),
    ) -> Option<RunRecord> {
        self.touch();
        let mut runs = self.runs.write().await;
        let record = runs.iter_mut().find(|r| r.run_id == run_id)?;
        f(record);
        Some(record.clone())
    }
}

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<SessionEntry>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> Arc<SessionEntry> {
        let entry = Arc::new(SessionEntry::new());
        self.sessions.write().await.insert(entry.id, entry.clone());
        entry
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<SessionEntry>> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: Uuid) -> Option<Arc<SessionEntry>> {
        self.sessions.write().await.remove(&id)
    }

    /// Drops sessions with no run in progress and no activity for `ttl`.
    /// Returns how many were dropped.
    pub async fn sweep_idle(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.is_busy() || entry.idle_for() < ttl);
        before - sessions.len()
    }

    /// Sweeps idle sessions in the background for the life of the process.
    pub fn spawn_sweeper(self: &Arc<Self>, ttl: Duration) {
        let store = Arc::clone(self);
        let period = ttl.clamp(Duration::from_secs(1), Duration::from_secs(60));
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(period);
            loop {
                tick.tick().await;
                let removed = store.sweep_idle(ttl).await;
                if removed > 0 {
                    info!(removed, "Expired idle sessions");
                }
            }
        });
    }
}
