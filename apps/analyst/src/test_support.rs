//! Scripted collaborators shared by unit tests.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::agent::conversation::{ConversationTurn, ToolInvocation};
use crate::document::{DocumentError, DocumentReader};
use crate::llm_client::{LanguageModel, LlmError, ModelDecision};
use crate::tools::catalog::ToolSpec;

type ReaderFn = dyn Fn(&Path) -> Result<String, DocumentError> + Send + Sync;

pub struct StubReader {
    outcome: Box<ReaderFn>,
}

impl StubReader {
    pub fn with_text(text: &str) -> Self {
        let text = text.to_string();
        Self {
            outcome: Box::new(move |_| Ok(text.clone())),
        }
    }

    pub fn failing(f: impl Fn(&Path) -> DocumentError + Send + Sync + 'static) -> Self {
        Self {
            outcome: Box::new(move |p| Err(f(p))),
        }
    }
}

#[async_trait]
impl DocumentReader for StubReader {
    async fn extract_text(&self, path: &Path) -> Result<String, DocumentError> {
        (self.outcome)(path)
    }
}

/// What the model saw on one `complete` call.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub system: String,
    pub conversation: Vec<ConversationTurn>,
    pub tool_names: Vec<String>,
}

/// Replays a fixed list of decisions, then keeps returning `fallback` (or an
/// empty-content error when there is none). Records every request.
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<ModelDecision, LlmError>>>,
    fallback: Option<ModelDecision>,
    requests: Mutex<Vec<CapturedRequest>>,
    context_chars: usize,
}

impl ScriptedModel {
    pub fn new(script: Vec<Result<ModelDecision, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
            context_chars: 100_000,
        }
    }

    pub fn decisions(script: Vec<ModelDecision>) -> Self {
        Self::new(script.into_iter().map(Ok).collect())
    }

    pub fn repeating(decision: ModelDecision) -> Self {
        let mut model = Self::new(Vec::new());
        model.fallback = Some(decision);
        model
    }

    pub fn with_context_chars(mut self, chars: usize) -> Self {
        self.context_chars = chars;
        self
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(
        &self,
        system: &str,
        conversation: &[ConversationTurn],
        tools: &[ToolSpec],
    ) -> Result<ModelDecision, LlmError> {
        self.requests.lock().unwrap().push(CapturedRequest {
            system: system.to_string(),
            conversation: conversation.to_vec(),
            tool_names: tools.iter().map(|t| t.name.to_string()).collect(),
        });

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(outcome) => outcome,
            None => self.fallback.clone().ok_or(LlmError::EmptyContent),
        }
    }

    fn max_context_chars(&self) -> usize {
        self.context_chars
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

pub fn tool_call(id: &str, name: &str, arguments: Value) -> ModelDecision {
    ModelDecision::ToolCall {
        preamble: None,
        call: ToolInvocation {
            id: id.to_string(),
            name: name.to_string(),
            arguments,
        },
    }
}

pub fn final_text(text: &str) -> ModelDecision {
    ModelDecision::Final(text.to_string())
}

/// A well-formed extraction reply for the fixture resume.
pub fn profile_json() -> String {
    serde_json::json!({
        "name": "Ada Lovelace",
        "contact": { "email": "[REDACTED_EMAIL]", "phone": "+44 20 7946 0000" },
        "summary": "Backend engineer focused on data platforms.",
        "work": [
            { "title": "Engineer", "company": "Analytical Engines", "start": "2018-01", "end": "2020-01" },
            { "title": "Senior Engineer", "company": "Difference Labs", "start": "2020-01", "end": "present" }
        ],
        "skills": ["Python", "AWS", "Docker"],
        "education": [ { "institution": "University of London", "degree": "BSc", "field": "Mathematics" } ],
        "certifications": ["AWS Solutions Architect"],
        "languages": ["English"]
    })
    .to_string()
}

/// Never answers; used to exercise cancellation of an in-flight model call.
pub struct HangingModel;

#[async_trait]
impl LanguageModel for HangingModel {
    async fn complete(
        &self,
        _system: &str,
        _conversation: &[ConversationTurn],
        _tools: &[ToolSpec],
    ) -> Result<ModelDecision, LlmError> {
        std::future::pending().await
    }

    fn max_context_chars(&self) -> usize {
        10_000
    }

    fn model_name(&self) -> &str {
        "hanging"
    }
}
