//! generate_summary / suggest_improvements — template assembly plus one model call.
//! The model's text is returned verbatim; failures are not retried.

use tracing::info;

use crate::llm_client::prompts::{GROUNDING_INSTRUCTION, REDACTION_NOTE};
use crate::llm_client::{complete_text, LanguageModel};
use crate::models::resume::{ExperienceSummary, MatchResult, ResumeProfile};
use crate::tools::prompts::{
    IMPROVEMENTS_PROMPT_TEMPLATE, IMPROVEMENTS_SYSTEM, SUMMARY_PROMPT_TEMPLATE, SUMMARY_SYSTEM,
};
use crate::tools::ToolError;

/// Fewer skills than this are flagged as a gap.
const MIN_SKILLS: usize = 5;
/// Summaries shorter than this many characters are flagged as too brief.
const MIN_SUMMARY_CHARS: usize = 100;

pub async fn generate_summary(
    llm: &dyn LanguageModel,
    profile: &ResumeProfile,
    experience: Option<&ExperienceSummary>,
    job_match: Option<&MatchResult>,
) -> Result<String, ToolError> {
    let prompt = SUMMARY_PROMPT_TEMPLATE
        .replace("{grounding_instruction}", GROUNDING_INSTRUCTION)
        .replace("{redaction_note}", REDACTION_NOTE)
        .replace("{profile_json}", &profile_json(profile)?)
        .replace("{experience_section}", &experience_section(experience))
        .replace("{match_section}", &match_section(job_match));

    let text = complete_text(llm, SUMMARY_SYSTEM, &prompt)
        .await
        .map_err(|e| ToolError::Generation(e.to_string()))?;

    info!("Summary generated for '{}' ({} chars)", profile.name, text.len());
    Ok(text)
}

pub async fn suggest_improvements(
    llm: &dyn LanguageModel,
    profile: &ResumeProfile,
    job_match: Option<&MatchResult>,
) -> Result<String, ToolError> {
    let gaps = profile_gaps(profile);
    let gap_list = if gaps.is_empty() {
        "- none detected".to_string()
    } else {
        gaps.iter()
            .map(|g| format!("- {g}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let prompt = IMPROVEMENTS_PROMPT_TEMPLATE
        .replace("{grounding_instruction}", GROUNDING_INSTRUCTION)
        .replace("{redaction_note}", REDACTION_NOTE)
        .replace("{gaps}", &gap_list)
        .replace("{profile_json}", &profile_json(profile)?)
        .replace("{match_section}", &match_section(job_match));

    let text = complete_text(llm, IMPROVEMENTS_SYSTEM, &prompt)
        .await
        .map_err(|e| ToolError::Generation(e.to_string()))?;

    info!(
        "Improvements generated for '{}' ({} gaps flagged)",
        profile.name,
        gaps.len()
    );
    Ok(text)
}

/// Deterministic checklist of missing or thin resume sections.
pub fn profile_gaps(profile: &ResumeProfile) -> Vec<String> {
    let mut gaps = Vec::new();
    let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());

    if profile.name.trim().is_empty() {
        gaps.push("Name is missing or not clearly visible at the top.".to_string());
    }
    if blank(&profile.contact.email) {
        gaps.push("Email address is missing.".to_string());
    }
    if blank(&profile.contact.phone) {
        gaps.push("Phone number is missing.".to_string());
    }
    if blank(&profile.contact.linkedin) {
        gaps.push("LinkedIn profile URL is missing.".to_string());
    }
    match profile.summary.as_deref().map(str::trim) {
        None | Some("") => gaps.push("Professional summary is missing.".to_string()),
        Some(s) if s.chars().count() < MIN_SUMMARY_CHARS => {
            gaps.push("Professional summary is brief; expand it to 2-3 sentences.".to_string())
        }
        Some(_) => {}
    }
    match profile.work.len() {
        0 => gaps.push("Work experience section is missing or not detected.".to_string()),
        1 => gaps.push("Only one position listed; add more detail with achievements.".to_string()),
        _ => {}
    }
    let skills = profile.skills.iter().filter(|s| !s.trim().is_empty()).count();
    if skills == 0 {
        gaps.push("Skills section is missing.".to_string());
    } else if skills < MIN_SKILLS {
        gaps.push(format!(
            "Only {skills} skills listed; add more relevant skills for applicant tracking systems."
        ));
    }
    if profile.education.is_empty() {
        gaps.push("Education section is missing.".to_string());
    }
    if profile.certifications.is_empty() {
        gaps.push("No certifications listed.".to_string());
    }
    gaps
}

fn profile_json(profile: &ResumeProfile) -> Result<String, ToolError> {
    serde_json::to_string_pretty(profile).map_err(|e| ToolError::Generation(e.to_string()))
}

fn experience_section(experience: Option<&ExperienceSummary>) -> String {
    let Some(exp) = experience else {
        return String::new();
    };
    let mut out = format!("\nTOTAL EXPERIENCE: {} years\n", exp.total_years);
    for e in &exp.entries {
        out.push_str(&format!(
            "- {} at {} ({} to {}): {} years\n",
            e.title, e.company, e.start, e.end, e.years
        ));
    }
    if !exp.malformed.is_empty() {
        out.push_str("Excluded (missing or inconsistent dates):\n");
        for m in &exp.malformed {
            out.push_str(&format!("- {} at {}: {}\n", m.title, m.company, m.reason));
        }
    }
    out
}

fn match_section(job_match: Option<&MatchResult>) -> String {
    let Some(m) = job_match else {
        return String::new();
    };
    format!(
        "\nJOB MATCH: {}%\nMatched: {}\nMissing: {}\nRecommendation: {}\n",
        m.percentage,
        join_or_none(&m.matched),
        join_or_none(&m.unmatched),
        m.recommendation
    )
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
