//! extract_information — asks the model for a structured profile and validates it.
//!
//! A reply that does not parse (or misses required fields) earns exactly one
//! corrective retry; the second failure is surfaced as `ExtractionParse`.

use tracing::{info, warn};

use crate::llm_client::{complete_text, strip_json_fences, LanguageModel};
use crate::models::resume::{ResumeProfile, ResumeText};
use crate::tools::prompts::{EXTRACT_PROMPT_TEMPLATE, EXTRACT_RETRY_TEMPLATE, EXTRACT_SYSTEM};
use crate::tools::ToolError;

/// Previous replies are echoed back in the corrective prompt up to this many characters.
const MAX_ECHOED_REPLY_CHARS: usize = 4_000;

pub async fn extract_information(
    llm: &dyn LanguageModel,
    text: &ResumeText,
) -> Result<ResumeProfile, ToolError> {
    let prompt = EXTRACT_PROMPT_TEMPLATE.replace("{resume_text}", &text.text);
    let reply = ask(llm, &prompt).await?;

    let reason = match parse_profile(&reply) {
        Ok(profile) => return Ok(log_extracted(profile)),
        Err(reason) => reason,
    };

    warn!("Extraction reply rejected ({reason}), retrying with corrective prompt");

    let echoed: String = reply.chars().take(MAX_ECHOED_REPLY_CHARS).collect();
    let corrective = format!(
        "{prompt}\n\n{}",
        EXTRACT_RETRY_TEMPLATE
            .replace("{error}", &reason)
            .replace("{previous}", &echoed)
    );
    let reply = ask(llm, &corrective).await?;

    parse_profile(&reply)
        .map(log_extracted)
        .map_err(ToolError::ExtractionParse)
}

async fn ask(llm: &dyn LanguageModel, prompt: &str) -> Result<String, ToolError> {
    complete_text(llm, EXTRACT_SYSTEM, prompt)
        .await
        .map_err(|e| ToolError::Generation(format!("extraction call failed: {e}")))
}

fn parse_profile(reply: &str) -> Result<ResumeProfile, String> {
    let profile: ResumeProfile =
        serde_json::from_str(strip_json_fences(reply)).map_err(|e| e.to_string())?;
    profile.validate()?;
    Ok(profile)
}

fn log_extracted(profile: ResumeProfile) -> ResumeProfile {
    info!(
        "Extracted profile for '{}': {} positions, {} skills",
        profile.name,
        profile.work.len(),
        profile.skills.len()
    );
    profile
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use crate::test_support::{final_text, profile_json, ScriptedModel};

    fn resume() -> ResumeText {
        ResumeText::new("cv.txt", "Ada Lovelace\nEngineer at Analytical Engines 2018-2020")
    }

    #[tokio::test]
    async fn test_valid_reply_parses_first_time() {
        let llm = ScriptedModel::decisions(vec![final_text(&profile_json())]);
        let profile = extract_information(&llm, &resume()).await.unwrap();

        assert_eq!(profile.name, "Ada Lovelace");
        assert_eq!(profile.work.len(), 2);
        assert_eq!(llm.call_count(), 1);

        let request = &llm.requests()[0];
        assert!(request.tool_names.is_empty());
        assert!(request.conversation[0].content.contains("Analytical Engines"));
    }

    #[tokio::test]
    async fn test_fenced_reply_is_accepted() {
        let fenced = format!("```json\n{}\n```", profile_json());
        let llm = ScriptedModel::decisions(vec![final_text(&fenced)]);
        assert!(extract_information(&llm, &resume()).await.is_ok());
    }

    #[tokio::test]
    async fn test_undated_position_keeps_the_profile() {
        let reply = r#"{
            "name": "Ada Lovelace",
            "skills": ["Python"],
            "work": [
                {"title": "Engineer", "company": "Analytical Engines", "start": "2018-01", "end": "present"},
                {"title": "Research Assistant", "company": "Babbage Lab", "start": "Summer 2016", "end": null}
            ]
        }"#;
        let llm = ScriptedModel::decisions(vec![final_text(reply)]);
        let profile = extract_information(&llm, &resume()).await.unwrap();

        assert_eq!(llm.call_count(), 1);
        assert_eq!(profile.work.len(), 2);
        assert_eq!(profile.work[1].start, None);
    }

    #[tokio::test]
    async fn test_bad_reply_is_retried_once_with_correction() {
        let llm = ScriptedModel::decisions(vec![
            final_text(r#"{"name": "Ada Lovelace"}"#),
            final_text(&profile_json()),
        ]);
        let profile = extract_information(&llm, &resume()).await.unwrap();

        assert_eq!(profile.skills, vec!["Python", "AWS", "Docker"]);
        assert_eq!(llm.call_count(), 2);
        let retry = &llm.requests()[1].conversation[0].content;
        assert!(retry.contains("could not be used"));
        assert!(retry.contains("missing field"));
    }

    #[tokio::test]
    async fn test_second_bad_reply_is_extraction_parse_error() {
        let llm = ScriptedModel::decisions(vec![
            final_text("not json"),
            final_text(r#"{"name": "", "work": [], "skills": []}"#),
        ]);
        let err = extract_information(&llm, &resume()).await.unwrap_err();

        assert!(matches!(err, ToolError::ExtractionParse(ref m) if m.contains("name")));
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_api_failure_is_generation_error() {
        let llm = ScriptedModel::new(vec![Err(LlmError::Api {
            status: 401,
            message: "bad key".to_string(),
        })]);
        let err = extract_information(&llm, &resume()).await.unwrap_err();
        assert_eq!(err.code(), "GENERATION_ERROR");
    }
}
