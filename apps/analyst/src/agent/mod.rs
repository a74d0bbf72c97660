// Resume analysis agent.
// A bounded loop that alternates model decisions and tool executions over an
// append-only conversation. One loop runs at a time per session.

pub mod agent_loop;
pub mod conversation;
pub mod prompts;

use std::path::PathBuf;

use thiserror::Error;

use crate::llm_client::LlmError;
use crate::tools::{SessionMemory, ToolError};
use conversation::{Conversation, ConversationTurn};

pub use agent_loop::Agent;

pub const DEFAULT_MAX_TURNS: usize = 10;

/// Loop settings derived from `Config`.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub max_turns: usize,
    /// Redact PII in document text returned by read_resume.
    pub redact_documents: bool,
    /// When set, read_resume only opens files under this directory.
    pub document_root: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            redact_documents: true,
            document_root: None,
        }
    }
}

/// State carried across runs of one session.
#[derive(Debug, Clone, Default)]
pub struct AnalysisSession {
    pub conversation: Conversation,
    pub memory: SessionMemory,
}

#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// May be empty; a default instruction is built from the other fields.
    pub instruction: String,
    pub file_path: Option<String>,
    pub job_requirements: Option<String>,
    /// Overrides `AgentConfig::max_turns` for this run.
    pub max_turns: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub answer: String,
    pub turns_used: usize,
    /// Turns appended during this run.
    pub conversation: Vec<ConversationTurn>,
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("language model error: {0}")]
    Model(#[from] LlmError),

    #[error("turn limit of {max_turns} exceeded")]
    TurnLimitExceeded { max_turns: usize },

    #[error("run cancelled")]
    Cancelled,
}

impl AgentError {
    pub fn code(&self) -> &'static str {
        match self {
            AgentError::Tool(e) => e.code(),
            AgentError::Model(_) => "MODEL_ERROR",
            AgentError::TurnLimitExceeded { .. } => "TURN_LIMIT_EXCEEDED",
            AgentError::Cancelled => "CANCELLED",
        }
    }
}

/// A terminal error together with the turns recorded before it.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunFailure {
    pub error: AgentError,
    pub conversation: Vec<ConversationTurn>,
}
