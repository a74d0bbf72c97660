use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Plain text pulled out of a resume document. Never edited after extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeText {
    pub source_path: PathBuf,
    pub text: String,
    pub extracted_at: DateTime<Utc>,
}

impl ResumeText {
    pub fn new(source_path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            text: text.into(),
            extracted_at: Utc::now(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Dates
// ────────────────────────────────────────────────────────────────────────────

/// A calendar date as written on a resume: `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
/// Missing month or day resolve to the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResumeDate(pub NaiveDate);

impl ResumeDate {
    pub fn ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d"))
            .or_else(|_| NaiveDate::parse_from_str(&format!("{s}-01-01"), "%Y-%m-%d"))
            .ok()
            .map(Self)
    }
}

impl TryFrom<String> for ResumeDate {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| {
            format!("invalid date '{value}', expected YYYY, YYYY-MM or YYYY-MM-DD")
        })
    }
}

impl From<ResumeDate> for String {
    fn from(value: ResumeDate) -> Self {
        value.0.format("%Y-%m-%d").to_string()
    }
}

impl fmt::Display for ResumeDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}

/// End of a work entry. `present` marks an open-ended position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WorkEnd {
    Present,
    Date(ResumeDate),
}

impl WorkEnd {
    /// Resolves `present` against the supplied current date.
    pub fn resolve(&self, today: NaiveDate) -> NaiveDate {
        match self {
            WorkEnd::Present => today,
            WorkEnd::Date(d) => d.0,
        }
    }
}

impl TryFrom<String> for WorkEnd {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "present" | "current" | "now" | "" => Ok(WorkEnd::Present),
            _ => ResumeDate::try_from(value).map(WorkEnd::Date),
        }
    }
}

impl From<WorkEnd> for String {
    fn from(value: WorkEnd) -> Self {
        match value {
            WorkEnd::Present => "present".to_string(),
            WorkEnd::Date(d) => d.into(),
        }
    }
}

impl fmt::Display for WorkEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkEnd::Present => write!(f, "Present"),
            WorkEnd::Date(d) => write!(f, "{d}"),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Structured profile
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// One position. A date the model left out or wrote in a form we cannot read
/// is `None`; the entry is then reported instead of failing the profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkEntry {
    pub title: String,
    pub company: String,
    #[serde(default, deserialize_with = "lenient_date")]
    pub start: Option<ResumeDate>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub end: Option<WorkEnd>,
}

fn lenient_date<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<String>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(s)) => T::try_from(s).ok(),
        Some(Value::Number(n)) => T::try_from(n.to_string()).ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    pub institution: String,
    pub degree: String,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub start: Option<ResumeDate>,
    #[serde(default)]
    pub end: Option<ResumeDate>,
}

/// Structured view of a resume produced by `extract_information`.
///
/// `name`, `work` and `skills` are required in the wire format; a model reply
/// missing any of them fails to deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeProfile {
    pub name: String,
    #[serde(default)]
    pub contact: Contact,
    #[serde(default)]
    pub summary: Option<String>,
    pub work: Vec<WorkEntry>,
    pub skills: Vec<String>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
}

impl ResumeProfile {
    /// Checks the semantic requirements serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("field 'name' must not be empty".to_string());
        }
        if let Some(index) = self
            .work
            .iter()
            .position(|w| w.title.trim().is_empty() && w.company.trim().is_empty())
        {
            return Err(format!(
                "work entry #{} has neither title nor company",
                index + 1
            ));
        }
        Ok(())
    }

    /// Flattens every textual field into one blob for keyword matching.
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<&str> = vec![self.name.as_str()];
        if let Some(summary) = &self.summary {
            parts.push(summary);
        }
        for w in &self.work {
            parts.push(&w.title);
            parts.push(&w.company);
        }
        parts.extend(self.skills.iter().map(String::as_str));
        for e in &self.education {
            parts.push(&e.institution);
            parts.push(&e.degree);
            if let Some(field) = &e.field {
                parts.push(field);
            }
        }
        parts.extend(self.certifications.iter().map(String::as_str));
        parts.extend(self.languages.iter().map(String::as_str));
        parts.join("\n")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Job requirements and derived results
// ────────────────────────────────────────────────────────────────────────────

/// Requirement phrases supplied by the caller, de-duplicated case-insensitively
/// in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobRequirements(Vec<String>);

impl JobRequirements {
    pub fn from_phrases<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for phrase in phrases {
            let phrase = phrase
                .as_ref()
                .trim()
                .trim_start_matches(['-', '*'])
                .trim();
            if phrase.is_empty() {
                continue;
            }
            if out.iter().any(|p| p.eq_ignore_ascii_case(phrase)) {
                continue;
            }
            out.push(phrase.to_string());
        }
        Self(out)
    }

    /// Splits free text on commas, semicolons, newlines and bullet characters.
    pub fn parse(raw: &str) -> Self {
        Self::from_phrases(raw.split([',', ';', '\n', '•', '|']))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// 0.0 – 100.0, one decimal
    pub percentage: f64,
    pub matched: Vec<String>,
    pub unmatched: Vec<String>,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDuration {
    pub title: String,
    pub company: String,
    pub start: ResumeDate,
    pub end: WorkEnd,
    pub years: f64,
}

/// A work entry left out of the total because its dates do not form a range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MalformedEntry {
    pub title: String,
    pub company: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceSummary {
    pub total_years: f64,
    pub entries: Vec<EntryDuration>,
    pub malformed: Vec<MalformedEntry>,
}
