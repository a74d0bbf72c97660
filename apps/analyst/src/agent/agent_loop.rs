//! Core agent loop.
//!
//! Each turn sends the windowed conversation and the tool catalog to the model,
//! then either records a final answer or executes exactly one tool call. A
//! failed call is reported back to the model once; a second consecutive failure
//! ends the run.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::document::DocumentReader;
use crate::llm_client::{LanguageModel, ModelDecision};
use crate::models::resume::JobRequirements;
use crate::pii::redact_pii;
use crate::tools::catalog::{catalog, ToolCall, ToolSpec};
use crate::tools::ToolExecutor;

use super::conversation::ConversationTurn;
use super::prompts::{default_instruction, SYSTEM_PROMPT};
use super::{AgentConfig, AgentError, AnalysisSession, RunFailure, RunOutcome, RunRequest};

/// Receives every turn as soon as it is appended.
pub type TurnSink = UnboundedSender<ConversationTurn>;

pub struct Agent {
    config: AgentConfig,
    llm: Arc<dyn LanguageModel>,
    tools: ToolExecutor,
    catalog: Vec<ToolSpec>,
}

impl Agent {
    pub fn new(
        config: AgentConfig,
        llm: Arc<dyn LanguageModel>,
        reader: Arc<dyn DocumentReader>,
    ) -> Self {
        let tools = ToolExecutor::new(llm.clone(), reader, config.redact_documents)
            .with_document_root(config.document_root.clone());
        Self {
            config,
            llm,
            tools,
            catalog: catalog(),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// Runs one analysis against `session`, appending to its conversation.
    ///
    /// On failure the session keeps every turn recorded so far and the returned
    /// `RunFailure` carries the turns of this run.
    pub async fn run(
        &self,
        session: &mut AnalysisSession,
        request: RunRequest,
        cancel: CancellationToken,
        events: Option<TurnSink>,
    ) -> Result<RunOutcome, RunFailure> {
        let start = session.conversation.len();
        let max_turns = request.max_turns.unwrap_or(self.config.max_turns);

        if let Some(raw) = request.job_requirements.as_deref() {
            session.memory.requirements = Some(JobRequirements::parse(&redact_pii(raw)));
        }

        let instruction = build_instruction(&request);
        emit(&events, session.conversation.push_user(&instruction));

        info!(max_turns, "Agent run started");

        let mut consecutive_failures = 0usize;

        for turn in 1..=max_turns {
            if cancel.is_cancelled() {
                return Err(self.fail(session, start, AgentError::Cancelled));
            }
            debug!("Agent turn {turn}/{max_turns}");

            let window = session.conversation.window(self.llm.max_context_chars());
            let decision = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                d = self.llm.complete(SYSTEM_PROMPT, &window, &self.catalog) => Some(d),
            };
            let decision = match decision {
                None => return Err(self.fail(session, start, AgentError::Cancelled)),
                Some(Err(e)) => return Err(self.fail(session, start, AgentError::Model(e))),
                Some(Ok(d)) => d,
            };

            let (preamble, call) = match decision {
                ModelDecision::Final(answer) => {
                    emit(&events, session.conversation.push_agent_text(answer.clone()));
                    info!(turns_used = turn, "Agent run finished");
                    return Ok(RunOutcome {
                        answer,
                        turns_used: turn,
                        conversation: session.conversation.since(start).to_vec(),
                    });
                }
                ModelDecision::ToolCall { preamble, call } => (preamble, call),
            };

            let outcome = match ToolCall::parse(&call.name, &call.arguments) {
                Ok(parsed) => {
                    let executed = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        r = self.tools.execute(parsed, &mut session.memory) => Some(r),
                    };
                    match executed {
                        Some(r) => r,
                        // Neither the call nor a result is recorded.
                        None => return Err(self.fail(session, start, AgentError::Cancelled)),
                    }
                }
                Err(e) => Err(e),
            };

            emit(&events, session.conversation.push_tool_call(preamble, call.clone()));

            match outcome {
                Ok(content) => {
                    consecutive_failures = 0;
                    emit(&events, session.conversation.push_tool_result(&call, content, false));
                }
                Err(e) => {
                    consecutive_failures += 1;
                    warn!(tool = %call.name, code = e.code(), "Tool call failed: {e}");
                    let message = format!("Error [{}]: {e}", e.code());
                    emit(&events, session.conversation.push_tool_result(&call, message, true));
                    if consecutive_failures > 1 {
                        return Err(self.fail(session, start, AgentError::Tool(e)));
                    }
                }
            }
        }

        Err(self.fail(session, start, AgentError::TurnLimitExceeded { max_turns }))
    }

    fn fail(&self, session: &AnalysisSession, start: usize, error: AgentError) -> RunFailure {
        warn!(code = error.code(), "Agent run ended: {error}");
        RunFailure {
            error,
            conversation: session.conversation.since(start).to_vec(),
        }
    }
}

fn build_instruction(request: &RunRequest) -> String {
    let file_path = request.file_path.as_deref();
    let reqs = request.job_requirements.as_deref();

    let instruction = request.instruction.trim();
    if instruction.is_empty() {
        return default_instruction(file_path, reqs);
    }

    let mut out = instruction.to_string();
    if let Some(path) = file_path {
        out.push_str(&format!("\n\nResume file: {path}"));
    }
    if let Some(reqs) = reqs {
        out.push_str(&format!("\n\nJob requirements: {reqs}"));
    }
    out
}

fn emit(events: &Option<TurnSink>, turn: &ConversationTurn) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is listening any more.
        let _ = tx.send(turn.clone());
    }
}
