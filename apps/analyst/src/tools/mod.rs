// Resume tool set.
// Each tool takes plain structured data and returns a text/JSON rendering that is
// fed back to the model. All LLM calls go through the LanguageModel trait.

pub mod catalog;
pub mod experience;
pub mod extract;
pub mod job_match;
pub mod prompts;
pub mod read_resume;
pub mod report;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::document::{resolve_within, DocumentError, DocumentReader};
use crate::llm_client::LanguageModel;
use crate::models::resume::{
    ExperienceSummary, JobRequirements, MatchResult, ResumeProfile, ResumeText,
};
use catalog::{MatchArgs, ProfileArgs, ToolCall};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("could not parse extracted resume: {0}")]
    ExtractionParse(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("invalid call to '{tool}': {reason}")]
    InvalidToolCall { tool: String, reason: String },
}

impl ToolError {
    /// Stable machine-readable code for logs and API responses.
    pub fn code(&self) -> &'static str {
        match self {
            ToolError::Document(DocumentError::FileNotFound(_)) => "FILE_NOT_FOUND",
            ToolError::Document(DocumentError::UnsupportedFormat { .. }) => "UNSUPPORTED_FORMAT",
            ToolError::Document(DocumentError::CorruptDocument { .. }) => "CORRUPT_DOCUMENT",
            ToolError::Document(DocumentError::OutsideRoot(_)) => "PATH_NOT_ALLOWED",
            ToolError::ExtractionParse(_) => "EXTRACTION_PARSE_ERROR",
            ToolError::Generation(_) => "GENERATION_ERROR",
            ToolError::InvalidToolCall { .. } => "INVALID_TOOL_CALL",
        }
    }
}

/// Working memory of one session: the latest artifact produced by each tool.
///
/// Tools read from it when the model omits an argument, so the model never has
/// to echo a whole resume back. Stored values are replaced, never edited.
#[derive(Debug, Clone, Default)]
pub struct SessionMemory {
    pub resume_text: Option<Arc<ResumeText>>,
    pub profile: Option<Arc<ResumeProfile>>,
    pub experience: Option<ExperienceSummary>,
    pub job_match: Option<MatchResult>,
    pub requirements: Option<JobRequirements>,
}

impl SessionMemory {
    fn profile_or(
        &self,
        explicit: Option<ResumeProfile>,
        tool: &str,
    ) -> Result<Arc<ResumeProfile>, ToolError> {
        if let Some(profile) = explicit {
            profile.validate().map_err(|reason| ToolError::InvalidToolCall {
                tool: tool.to_string(),
                reason,
            })?;
            return Ok(Arc::new(profile));
        }
        self.profile.clone().ok_or_else(|| ToolError::InvalidToolCall {
            tool: tool.to_string(),
            reason: "no resume profile available; call extract_information first".to_string(),
        })
    }
}

/// Runs validated tool calls against the session memory.
#[derive(Clone)]
pub struct ToolExecutor {
    llm: Arc<dyn LanguageModel>,
    reader: Arc<dyn DocumentReader>,
    redact_documents: bool,
    document_root: Option<PathBuf>,
}

impl ToolExecutor {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        reader: Arc<dyn DocumentReader>,
        redact_documents: bool,
    ) -> Self {
        Self {
            llm,
            reader,
            redact_documents,
            document_root: None,
        }
    }

    /// Confines read_resume to paths under `root`.
    pub fn with_document_root(mut self, root: Option<PathBuf>) -> Self {
        self.document_root = root;
        self
    }

    /// Executes `call` and returns the text handed back to the model.
    pub async fn execute(
        &self,
        call: ToolCall,
        memory: &mut SessionMemory,
    ) -> Result<String, ToolError> {
        let tool = call.name();
        info!(tool = %tool, "Executing tool");

        match call {
            ToolCall::ReadResume(args) => {
                let requested = Path::new(&args.file_path);
                let path = match &self.document_root {
                    Some(root) => resolve_within(root, requested)?,
                    None => requested.to_path_buf(),
                };
                let text =
                    read_resume::read_resume(self.reader.as_ref(), &path, self.redact_documents)
                        .await?;
                let rendered = text.text.clone();
                memory.resume_text = Some(Arc::new(text));
                Ok(rendered)
            }
            ToolCall::ExtractInformation(args) => {
                let text = match args.resume_text {
                    Some(raw) => Arc::new(ResumeText::new("<inline>", raw)),
                    None => memory.resume_text.clone().ok_or_else(|| {
                        ToolError::InvalidToolCall {
                            tool: tool.to_string(),
                            reason: "no resume text available; call read_resume first"
                                .to_string(),
                        }
                    })?,
                };
                let profile = extract::extract_information(self.llm.as_ref(), &text).await?;
                let rendered = render_json(&profile)?;
                memory.profile = Some(Arc::new(profile));
                Ok(rendered)
            }
            ToolCall::CalculateExperienceYears(ProfileArgs { profile }) => {
                let profile = memory.profile_or(profile, tool.as_str())?;
                let today = chrono::Utc::now().date_naive();
                let summary = experience::calculate_experience(&profile.work, today);
                let rendered = render_json(&summary)?;
                memory.experience = Some(summary);
                Ok(rendered)
            }
            ToolCall::MatchJobRequirements(MatchArgs {
                requirements,
                profile,
            }) => {
                let profile = memory.profile_or(profile, tool.as_str())?;
                let requirements = requirements
                    .map(JobRequirements::from)
                    .or_else(|| memory.requirements.clone())
                    .ok_or_else(|| ToolError::InvalidToolCall {
                        tool: tool.to_string(),
                        reason: "no job requirements were supplied".to_string(),
                    })?;

                let raw_text = memory.resume_text.as_ref().map(|t| t.text.as_str());
                let result = job_match::match_requirements(&profile, raw_text, &requirements);
                let rendered = render_json(&result)?;
                memory.job_match = Some(result);
                Ok(rendered)
            }
            ToolCall::GenerateSummary(ProfileArgs { profile }) => {
                let profile = memory.profile_or(profile, tool.as_str())?;
                report::generate_summary(
                    self.llm.as_ref(),
                    &profile,
                    memory.experience.as_ref(),
                    memory.job_match.as_ref(),
                )
                .await
            }
            ToolCall::SuggestImprovements(ProfileArgs { profile }) => {
                let profile = memory.profile_or(profile, tool.as_str())?;
                report::suggest_improvements(
                    self.llm.as_ref(),
                    &profile,
                    memory.job_match.as_ref(),
                )
                .await
            }
        }
    }
}

fn render_json<T: Serialize>(value: &T) -> Result<String, ToolError> {
    serde_json::to_string_pretty(value).map_err(|e| ToolError::Generation(e.to_string()))
}
