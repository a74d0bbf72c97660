use std::io::Write;
use std::path::Path as FsPath;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::conversation::ConversationTurn;
use crate::agent::RunRequest;
use crate::document::{resolve_within, DocumentFormat, SUPPORTED_EXTENSIONS};
use crate::errors::AppError;
use crate::sessions::runner::spawn_run;
use crate::sessions::{RunRecord, SessionEntry};
use crate::state::AppState;

#[derive(Serialize)]
pub struct SessionCreated {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct SessionDetail {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub conversation: Vec<ConversationTurn>,
    pub runs: Vec<RunRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSubmission {
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub job_requirements: Option<String>,
    #[serde(default)]
    pub max_turns: Option<usize>,
}

impl RunSubmission {
    fn into_request(self) -> Result<RunRequest, AppError> {
        let instruction = non_empty(self.instruction).unwrap_or_default();
        let file_path = non_empty(self.file_path);
        if instruction.is_empty() && file_path.is_none() {
            return Err(AppError::Validation(
                "either instruction or file_path is required".to_string(),
            ));
        }
        if self.max_turns == Some(0) {
            return Err(AppError::Validation("max_turns must be at least 1".to_string()));
        }
        Ok(RunRequest {
            instruction,
            file_path,
            job_requirements: non_empty(self.job_requirements),
            max_turns: self.max_turns,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

async fn find_session(state: &AppState, id: Uuid) -> Result<std::sync::Arc<SessionEntry>, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}

/// Rejects a file path outside the resume directory before a run starts.
fn check_file_path(state: &AppState, request: &RunRequest) -> Result<(), AppError> {
    let (Some(root), Some(path)) = (
        state.agent.config().document_root.as_deref(),
        request.file_path.as_deref(),
    ) else {
        return Ok(());
    };
    resolve_within(root, FsPath::new(path))
        .map(|_| ())
        .map_err(|e| AppError::Validation(e.to_string()))
}

fn busy(id: Uuid) -> AppError {
    AppError::Conflict(format!("Session {id} already has a run in progress"))
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionCreated>) {
    let entry = state.sessions.create().await;
    tracing::info!(session_id = %entry.id, "Session created");
    (
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id: entry.id,
            created_at: entry.created_at,
        }),
    )
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionDetail>, AppError> {
    let entry = find_session(&state, id).await?;
    Ok(Json(SessionDetail {
        session_id: entry.id,
        created_at: entry.created_at,
        conversation: entry.transcript().await,
        runs: entry.runs().await,
    }))
}

/// POST /api/v1/sessions/:id/runs
pub async fn handle_create_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(submission): Json<RunSubmission>,
) -> Result<(StatusCode, Json<RunRecord>), AppError> {
    let entry = find_session(&state, id).await?;
    let request = submission.into_request()?;
    check_file_path(&state, &request)?;
    let guard = entry.try_claim().ok_or_else(|| busy(id))?;

    let record = spawn_run(
        state.agent.clone(),
        entry,
        guard,
        request,
        None,
        None,
        state.run_timeout,
    )
    .await;
    Ok((StatusCode::ACCEPTED, Json(record)))
}

/// POST /api/v1/sessions/:id/runs/upload
/// Multipart fields: `file` (required), `instruction`, `job_requirements`, `max_turns`.
pub async fn handle_upload_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<RunRecord>), AppError> {
    let entry = find_session(&state, id).await?;

    let mut submission = RunSubmission::default();
    let mut upload: Option<(String, tempfile::NamedTempFile)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::Validation("file field needs a filename".to_string()))?;
                let path = FsPath::new(&file_name);
                if DocumentFormat::from_path(path).is_err() {
                    return Err(AppError::UnsupportedMediaType(format!(
                        "'{file_name}' is not a supported resume format ({})",
                        SUPPORTED_EXTENSIONS.join(", ")
                    )));
                }
                let extension = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or_default()
                    .to_lowercase();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;
                let dir = state.agent.config().document_root.as_deref();
                let file = store_upload(&bytes, &extension, dir)?;
                upload = Some((file_name, file));
            }
            "instruction" => submission.instruction = Some(text_field(field).await?),
            "job_requirements" => submission.job_requirements = Some(text_field(field).await?),
            "max_turns" => {
                let raw = text_field(field).await?;
                let turns = raw
                    .trim()
                    .parse()
                    .map_err(|_| AppError::Validation(format!("max_turns must be a number, got '{raw}'")))?;
                submission.max_turns = Some(turns);
            }
            other => {
                return Err(AppError::Validation(format!("Unexpected field '{other}'")));
            }
        }
    }

    let (file_name, file) =
        upload.ok_or_else(|| AppError::Validation("file field is required".to_string()))?;
    submission.file_path = Some(file.path().to_string_lossy().into_owned());
    let request = submission.into_request()?;
    let guard = entry.try_claim().ok_or_else(|| busy(id))?;

    tracing::info!(session_id = %id, file = %file_name, "Resume uploaded");

    let record = spawn_run(
        state.agent.clone(),
        entry,
        guard,
        request,
        Some(file),
        Some(file_name),
        state.run_timeout,
    )
    .await;
    Ok((StatusCode::ACCEPTED, Json(record)))
}

async fn text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid text field: {e}")))
}

/// Writes an upload to a temporary file, inside `dir` when one is configured.
fn store_upload(
    bytes: &[u8],
    extension: &str,
    dir: Option<&FsPath>,
) -> Result<tempfile::NamedTempFile, AppError> {
    let suffix = format!(".{extension}");
    let mut builder = tempfile::Builder::new();
    builder.prefix("resume-").suffix(&suffix);
    let mut file = match dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(|e| AppError::Internal(e.into()))?;
    file.write_all(bytes)
        .and_then(|_| file.flush())
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(file)
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let entry = find_session(&state, id).await?;
    if entry.is_busy() {
        return Err(busy(id));
    }
    state.sessions.remove(id).await;
    tracing::info!(session_id = %id, "Session deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/sessions/:id/runs/:run_id
pub async fn handle_get_run(
    State(state): State<AppState>,
    Path((id, run_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<RunRecord>, AppError> {
    let entry = find_session(&state, id).await?;
    entry
        .run(run_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Run {run_id} not found")))
}

/// POST /api/v1/sessions/:id/runs/:run_id/cancel
pub async fn handle_cancel_run(
    State(state): State<AppState>,
    Path((id, run_id)): Path<(Uuid, Uuid)>,
) -> Result<(StatusCode, Json<RunRecord>), AppError> {
    let entry = find_session(&state, id).await?;
    let record = entry
        .run(run_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Run {run_id} not found")))?;

    if record.status.is_finished() {
        return Err(AppError::Conflict(format!(
            "Run {run_id} already finished with status {:?}",
            record.status
        )));
    }

    record.cancel.cancel();
    tracing::info!(session_id = %id, run_id = %run_id, "Run cancellation requested");
    Ok((StatusCode::ACCEPTED, Json(record)))
}
