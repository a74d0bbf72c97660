//! Tool catalog — the closed set of tools the model may request, their
//! declared input schemas, and the typed calls parsed from model output.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::document::SUPPORTED_EXTENSIONS;
use crate::models::resume::{JobRequirements, ResumeProfile};
use crate::tools::ToolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    ReadResume,
    ExtractInformation,
    CalculateExperienceYears,
    MatchJobRequirements,
    GenerateSummary,
    SuggestImprovements,
}

impl ToolName {
    pub const ALL: [ToolName; 6] = [
        ToolName::ReadResume,
        ToolName::ExtractInformation,
        ToolName::CalculateExperienceYears,
        ToolName::MatchJobRequirements,
        ToolName::GenerateSummary,
        ToolName::SuggestImprovements,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::ReadResume => "read_resume",
            ToolName::ExtractInformation => "extract_information",
            ToolName::CalculateExperienceYears => "calculate_experience_years",
            ToolName::MatchJobRequirements => "match_job_requirements",
            ToolName::GenerateSummary => "generate_summary",
            ToolName::SuggestImprovements => "suggest_improvements",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            ToolName::ReadResume => {
                "Read a resume from the specified file path and return its plain text content."
            }
            ToolName::ExtractInformation => {
                "Extract name, contact details, work history, skills, education and \
                 certifications from resume text. Uses the most recently read resume when \
                 resume_text is omitted."
            }
            ToolName::CalculateExperienceYears => {
                "Calculate total years of work experience from the extracted profile, with a \
                 per-position breakdown. Positions with impossible dates are reported separately."
            }
            ToolName::MatchJobRequirements => {
                "Match the resume against job requirements and return the match percentage with \
                 matched and missing requirements. Uses the caller's job requirements when \
                 requirements is omitted."
            }
            ToolName::GenerateSummary => {
                "Generate a comprehensive summary report of the extracted resume, including \
                 experience and job-match results when they have been computed."
            }
            ToolName::SuggestImprovements => {
                "Provide actionable suggestions to improve the resume."
            }
        }
    }

    fn input_schema(&self) -> Value {
        match self {
            ToolName::ReadResume => json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": format!(
                            "Path to the resume file ({})",
                            SUPPORTED_EXTENSIONS.join(", ")
                        )
                    }
                },
                "required": ["file_path"],
                "additionalProperties": false
            }),
            ToolName::ExtractInformation => json!({
                "type": "object",
                "properties": {
                    "resume_text": {
                        "type": "string",
                        "description": "Resume text to extract from. Optional."
                    }
                },
                "additionalProperties": false
            }),
            ToolName::MatchJobRequirements => json!({
                "type": "object",
                "properties": {
                    "requirements": {
                        "description": "Requirement phrases, as a list or a comma separated string. Optional.",
                        "anyOf": [
                            { "type": "string" },
                            { "type": "array", "items": { "type": "string" } }
                        ]
                    },
                    "profile": profile_schema()
                },
                "additionalProperties": false
            }),
            ToolName::CalculateExperienceYears
            | ToolName::GenerateSummary
            | ToolName::SuggestImprovements => json!({
                "type": "object",
                "properties": { "profile": profile_schema() },
                "additionalProperties": false
            }),
        }
    }

    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.as_str(),
            description: self.description(),
            input_schema: self.input_schema(),
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ToolError::InvalidToolCall {
                tool: s.to_string(),
                reason: format!(
                    "unknown tool; available tools: {}",
                    ToolName::ALL.map(|t| t.as_str()).join(", ")
                ),
            })
    }
}

fn profile_schema() -> Value {
    json!({
        "type": "object",
        "description": "Structured resume profile. Optional; defaults to the last extracted profile.",
        "properties": {
            "name": { "type": "string" },
            "work": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "company": { "type": "string" },
                        "start": { "type": ["string", "null"], "description": "YYYY-MM" },
                        "end": { "type": ["string", "null"], "description": "YYYY-MM or present" }
                    },
                    "required": ["title", "company"]
                }
            },
            "skills": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["name", "work", "skills"]
    })
}

/// One entry of the catalog sent to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

pub fn catalog() -> Vec<ToolSpec> {
    ToolName::ALL.iter().map(ToolName::spec).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Typed calls
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadResumeArgs {
    pub file_path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractInformationArgs {
    #[serde(default)]
    pub resume_text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileArgs {
    #[serde(default)]
    pub profile: Option<ResumeProfile>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RequirementsArg {
    Text(String),
    List(Vec<String>),
}

impl From<RequirementsArg> for JobRequirements {
    fn from(value: RequirementsArg) -> Self {
        match value {
            RequirementsArg::Text(raw) => JobRequirements::parse(&raw),
            RequirementsArg::List(items) => JobRequirements::from_phrases(items),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchArgs {
    #[serde(default)]
    pub requirements: Option<RequirementsArg>,
    #[serde(default)]
    pub profile: Option<ResumeProfile>,
}

/// A validated tool request. Parsing is the schema check: anything that does
/// not deserialize into one of these variants is an invalid call.
#[derive(Debug, Clone)]
pub enum ToolCall {
    ReadResume(ReadResumeArgs),
    ExtractInformation(ExtractInformationArgs),
    CalculateExperienceYears(ProfileArgs),
    MatchJobRequirements(MatchArgs),
    GenerateSummary(ProfileArgs),
    SuggestImprovements(ProfileArgs),
}

impl ToolCall {
    pub fn parse(name: &str, arguments: &Value) -> Result<Self, ToolError> {
        let tool: ToolName = name.parse()?;
        let args = if arguments.is_null() {
            json!({})
        } else {
            arguments.clone()
        };
        let invalid = |e: serde_json::Error| ToolError::InvalidToolCall {
            tool: name.to_string(),
            reason: e.to_string(),
        };

        let call = match tool {
            ToolName::ReadResume => {
                let args: ReadResumeArgs = serde_json::from_value(args).map_err(invalid)?;
                if args.file_path.trim().is_empty() {
                    return Err(ToolError::InvalidToolCall {
                        tool: name.to_string(),
                        reason: "file_path must not be empty".to_string(),
                    });
                }
                ToolCall::ReadResume(args)
            }
            ToolName::ExtractInformation => {
                ToolCall::ExtractInformation(serde_json::from_value(args).map_err(invalid)?)
            }
            ToolName::CalculateExperienceYears => {
                ToolCall::CalculateExperienceYears(serde_json::from_value(args).map_err(invalid)?)
            }
            ToolName::MatchJobRequirements => {
                ToolCall::MatchJobRequirements(serde_json::from_value(args).map_err(invalid)?)
            }
            ToolName::GenerateSummary => {
                ToolCall::GenerateSummary(serde_json::from_value(args).map_err(invalid)?)
            }
            ToolName::SuggestImprovements => {
                ToolCall::SuggestImprovements(serde_json::from_value(args).map_err(invalid)?)
            }
        };

        Ok(call)
    }

    pub fn name(&self) -> ToolName {
        match self {
            ToolCall::ReadResume(_) => ToolName::ReadResume,
            ToolCall::ExtractInformation(_) => ToolName::ExtractInformation,
            ToolCall::CalculateExperienceYears(_) => ToolName::CalculateExperienceYears,
            ToolCall::MatchJobRequirements(_) => ToolName::MatchJobRequirements,
            ToolCall::GenerateSummary(_) => ToolName::GenerateSummary,
            ToolCall::SuggestImprovements(_) => ToolName::SuggestImprovements,
        }
    }
}
