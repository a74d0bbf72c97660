use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;
use crate::tools::catalog::catalog;

pub const ASSISTANT_ID: &str = "resume-analyst";

#[derive(Serialize)]
pub struct ToolSummary {
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Serialize)]
pub struct AssistantInfo {
    pub assistant_id: &'static str,
    pub name: &'static str,
    pub model: String,
    pub max_turns: usize,
    pub tools: Vec<ToolSummary>,
}

/// GET /api/v1/assistants
pub async fn list_assistants(State(state): State<AppState>) -> Json<Vec<AssistantInfo>> {
    let tools = catalog()
        .into_iter()
        .map(|spec| ToolSummary {
            name: spec.name,
            description: spec.description,
        })
        .collect();

    Json(vec![AssistantInfo {
        assistant_id: ASSISTANT_ID,
        name: "Resume Analyst",
        model: state.agent.model_name().to_string(),
        max_turns: state.agent.config().max_turns,
        tools,
    }])
}
