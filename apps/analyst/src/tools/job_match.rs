//! match_job_requirements — deterministic keyword matching of requirement
//! phrases against the profile and the raw resume text.

use std::collections::HashSet;

use tracing::info;

use crate::models::resume::{JobRequirements, MatchResult, ResumeProfile};

/// Tokens shorter than this never count on their own.
const MIN_SIGNIFICANT_LEN: usize = 3;

/// Filler words that appear in requirement phrases but say nothing about the skill.
const STOP_WORDS: &[&str] = &[
    "and", "the", "for", "with", "from", "into", "over", "our", "you", "your", "are", "has",
    "have", "plus", "must", "should", "will", "least", "more", "than", "year", "years", "yrs",
    "experience", "experienced", "knowledge", "strong", "good", "solid", "proven", "excellent",
    "ability", "skills", "skill", "working", "understanding", "familiarity", "familiar",
    "proficiency", "proficient", "hands-on", "degree", "related", "preferred", "required",
];

pub const STRONG_MATCH: &str = "Strong match! Consider applying for this position.";
pub const GOOD_MATCH: &str = "Good match. Consider highlighting relevant experience.";
pub const WEAK_MATCH: &str =
    "Consider acquiring missing skills or emphasizing transferable skills.";

/// Lowercases and splits on anything that is not alphanumeric or one of
/// `+ # . / -`. Those keep `c++`, `c#`, `node.js` and `ci/cd` whole but are
/// trimmed from the token ends so sentence punctuation does not stick.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || matches!(c, '+' | '#' | '.' | '/' | '-')))
        .map(|t| t.trim_matches(|c| matches!(c, '.' | '/' | '-')))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn padded(tokens: &[String]) -> String {
    format!(" {} ", tokens.join(" "))
}

fn is_significant(token: &str) -> bool {
    token.chars().count() >= MIN_SIGNIFICANT_LEN && !STOP_WORDS.contains(&token)
}

pub fn recommendation(percentage: f64) -> &'static str {
    if percentage >= 70.0 {
        STRONG_MATCH
    } else if percentage >= 50.0 {
        GOOD_MATCH
    } else {
        WEAK_MATCH
    }
}

/// The tokenised resume side of a match.
struct Haystack {
    skills: Vec<String>,
    text: String,
    tokens: HashSet<String>,
}

impl Haystack {
    fn new(profile: &ResumeProfile, raw_text: Option<&str>) -> Self {
        let mut all = tokenize(&profile.searchable_text());
        if let Some(raw) = raw_text {
            all.extend(tokenize(raw));
        }
        Self {
            skills: profile.skills.iter().map(|s| padded(&tokenize(s))).collect(),
            text: padded(&all),
            tokens: all.into_iter().collect(),
        }
    }

    fn matches(&self, requirement: &str) -> bool {
        let tokens = tokenize(requirement);
        if tokens.is_empty() {
            return false;
        }
        let phrase = padded(&tokens);
        if self.skills.iter().any(|s| s.contains(&phrase)) || self.text.contains(&phrase) {
            return true;
        }
        tokens
            .iter()
            .any(|t| is_significant(t) && self.tokens.contains(t))
    }
}

/// Scores `requirements` against the profile (plus the raw resume text when
/// available). An empty requirement set scores 100.0.
pub fn match_requirements(
    profile: &ResumeProfile,
    raw_text: Option<&str>,
    requirements: &JobRequirements,
) -> MatchResult {
    let haystack = Haystack::new(profile, raw_text);

    let (matched, unmatched): (Vec<&str>, Vec<&str>) =
        requirements.iter().partition(|r| haystack.matches(r));

    let percentage = if requirements.is_empty() {
        100.0
    } else {
        let raw = matched.len() as f64 / requirements.len() as f64 * 100.0;
        (raw * 10.0).round() / 10.0
    };

    info!(
        "Job match for '{}': {percentage}% ({} of {} requirements)",
        profile.name,
        matched.len(),
        requirements.len()
    );

    MatchResult {
        percentage,
        matched: matched.into_iter().map(str::to_string).collect(),
        unmatched: unmatched.into_iter().map(str::to_string).collect(),
        recommendation: recommendation(percentage).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::profile_json;

    fn profile() -> ResumeProfile {
        serde_json::from_str(&profile_json()).unwrap()
    }

    fn skills_only(skills: &[&str]) -> ResumeProfile {
        serde_json::from_value(serde_json::json!({
            "name": "Sam",
            "work": [],
            "skills": skills,
        }))
        .unwrap()
    }

    #[test]
    fn test_half_of_requirements_matched() {
        let reqs = JobRequirements::from_phrases(["Python", "Kubernetes"]);
        let result = match_requirements(&skills_only(&["Python", "AWS", "Docker"]), None, &reqs);

        assert_eq!(result.percentage, 50.0);
        assert_eq!(result.matched, vec!["Python"]);
        assert_eq!(result.unmatched, vec!["Kubernetes"]);
        assert_eq!(result.recommendation, GOOD_MATCH);
    }

    #[test]
    fn test_matching_is_case_and_whitespace_insensitive() {
        let reqs = JobRequirements::from_phrases(["  machine   LEARNING ", "ci/cd"]);
        let result = match_requirements(
            &skills_only(&["Machine Learning", "CI/CD pipelines"]),
            None,
            &reqs,
        );
        assert_eq!(result.percentage, 100.0);
        assert_eq!(result.recommendation, STRONG_MATCH);
    }

    #[test]
    fn test_significant_token_fallback() {
        let reqs = JobRequirements::from_phrases(["5+ years experience with Python"]);
        let result = match_requirements(&skills_only(&["Python"]), None, &reqs);
        assert_eq!(result.matched.len(), 1);
    }

    #[test]
    fn test_stop_words_and_short_tokens_do_not_match() {
        let reqs = JobRequirements::from_phrases(["Strong experience in Go"]);
        let profile = skills_only(&["Python"]);
        let result =
            match_requirements(&profile, Some("Strong experience in teamwork"), &reqs);
        assert_eq!(result.percentage, 0.0);
        assert_eq!(result.recommendation, WEAK_MATCH);
    }

    #[test]
    fn test_raw_text_is_searched() {
        let reqs = JobRequirements::from_phrases(["Terraform"]);
        let result =
            match_requirements(&profile(), Some("Built infrastructure with Terraform."), &reqs);
        assert_eq!(result.matched, vec!["Terraform"]);

        let result = match_requirements(&profile(), None, &reqs);
        assert!(result.matched.is_empty());
    }

    #[test]
    fn test_substring_inside_a_word_does_not_match() {
        let reqs = JobRequirements::from_phrases(["Java"]);
        let result = match_requirements(&skills_only(&["JavaScript"]), None, &reqs);
        assert_eq!(result.percentage, 0.0);
    }

    #[test]
    fn test_empty_requirements_score_full() {
        let result = match_requirements(&profile(), None, &JobRequirements::default());
        assert_eq!(result.percentage, 100.0);
        assert!(result.matched.is_empty());
        assert!(result.unmatched.is_empty());
    }

    #[test]
    fn test_percentage_rounds_to_one_decimal_and_stays_in_bounds() {
        let reqs = JobRequirements::from_phrases(["Python", "Rust", "Haskell"]);
        let result = match_requirements(&skills_only(&["Python"]), None, &reqs);
        assert_eq!(result.percentage, 33.3);
        assert!((0.0..=100.0).contains(&result.percentage));
        assert_eq!(result.matched.len() + result.unmatched.len(), reqs.len());
    }

    #[test]
    fn test_tokenize_keeps_symbols_inside_tokens() {
        assert_eq!(
            tokenize("C++, C#, Node.js and CI/CD."),
            vec!["c++", "c#", "node.js", "and", "ci/cd"]
        );
    }
}
