//! Background execution of one run: deadline, transcript mirroring, and the
//! final status written back to the run record.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tempfile::NamedTempFile;
use tokio::sync::{mpsc, OwnedMutexGuard};
use tracing::{info, warn, Instrument};

use crate::agent::{Agent, AgentError, AnalysisSession, RunRequest};
use crate::sessions::{RunError, RunRecord, RunStatus, SessionEntry};

/// Registers a run on `entry` and executes it on a spawned task.
/// `guard` is the session claim; it is released when the run ends.
/// `upload` keeps an uploaded resume on disk for the duration of the run.
pub async fn spawn_run(
    agent: Arc<Agent>,
    entry: Arc<SessionEntry>,
    guard: OwnedMutexGuard<AnalysisSession>,
    request: RunRequest,
    upload: Option<NamedTempFile>,
    file_name: Option<String>,
    deadline: Duration,
) -> RunRecord {
    let record = RunRecord::new(file_name);
    let run_id = record.run_id;
    let user_cancel = record.cancel.clone();
    entry.add_run(record.clone()).await;

    let span = tracing::info_span!("run", session_id = %entry.id, run_id = %run_id);

    tokio::spawn(
        async move {
            let mut guard = guard;
            let token = user_cancel.child_token();

            let timer = {
                let token = token.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(deadline).await;
                    token.cancel();
                })
            };

            let (tx, mut rx) = mpsc::unbounded_channel();
            let mirror = {
                let entry = entry.clone();
                tokio::spawn(async move {
                    while let Some(turn) = rx.recv().await {
                        entry.push_turn(turn).await;
                    }
                })
            };

            let result = agent.run(&mut guard, request, token, Some(tx)).await;

            timer.abort();
            if let Err(e) = mirror.await {
                warn!("Transcript mirror stopped early: {e}");
            }
            drop(guard);
            drop(upload);

            let finished = entry
                .update_run(run_id, |r| {
                    r.finished_at = Some(Utc::now());
                    match result {
                        Ok(outcome) => {
                            r.status = RunStatus::Completed;
                            r.turns_used = Some(outcome.turns_used);
                            r.answer = Some(outcome.answer);
                        }
                        Err(failure) => {
                            let timed_out = matches!(failure.error, AgentError::Cancelled)
                                && !user_cancel.is_cancelled();
                            r.status = match failure.error {
                                AgentError::Cancelled => RunStatus::Cancelled,
                                _ => RunStatus::Failed,
                            };
                            r.error = Some(if timed_out {
                                RunError {
                                    code: "RUN_TIMEOUT".to_string(),
                                    message: format!(
                                        "run exceeded its {}s deadline",
                                        deadline.as_secs()
                                    ),
                                }
                            } else {
                                RunError {
                                    code: failure.error.code().to_string(),
                                    message: failure.error.to_string(),
                                }
                            });
                        }
                    }
                })
                .await;

            if let Some(r) = finished {
                info!(status = ?r.status, "Run finished");
            }
        }
        .instrument(span),
    );

    record
}
