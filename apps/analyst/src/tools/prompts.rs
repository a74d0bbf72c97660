// All LLM prompt constants for the tool set.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for structured extraction — enforces JSON-only output.
pub const EXTRACT_SYSTEM: &str = "You are a precise resume data extractor. \
    Parse resume text into structured JSON. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT invent information that is not in the text.";

/// Extraction prompt template. Replace `{resume_text}` before sending.
pub const EXTRACT_PROMPT_TEMPLATE: &str = r#"Extract the following resume into a JSON object.

OUTPUT SCHEMA (return exactly this structure):
{
  "name": "string (required, the candidate's full name)",
  "contact": {
    "email": "string" | null,
    "phone": "string" | null,
    "linkedin": "string" | null,
    "location": "string" | null
  },
  "summary": "string" | null,
  "work": [
    {"title": "string", "company": "string", "start": "YYYY-MM" | null, "end": "YYYY-MM" | "present" | null}
  ],
  "skills": ["string"],
  "education": [
    {"institution": "string", "degree": "string", "field": "string" | null, "start": "YYYY-MM" | null, "end": "YYYY-MM" | null}
  ],
  "certifications": ["string"],
  "languages": ["string"]
}

RULES:
1. "name", "work" and "skills" are required. Use [] when a list section is absent.
2. Work entries are ordered as they appear in the resume.
3. Dates must be "YYYY-MM". Use "YYYY-01" if only the year is known. Use null
   when a date is missing or cannot be placed on the calendar ("Summer 2019");
   never invent one.
4. Use "present" for current positions ("Present", "Now", "Current", "to date").
5. List each skill as a short phrase ("Python", "AWS", "Project management").
6. Keep placeholder tokens such as [REDACTED_EMAIL] exactly as written.
7. Return ONLY the JSON object — nothing else, no code fences.

RESUME TEXT:
{resume_text}"#;

/// Corrective prompt used once after an unparseable extraction.
/// Replace `{error}` and `{previous}`.
pub const EXTRACT_RETRY_TEMPLATE: &str = r#"Your previous reply could not be used.

PROBLEM:
{error}

PREVIOUS REPLY:
{previous}

Return the corrected JSON object only, following the schema and rules from the original request.
Remember: "name" must be a non-empty string, "work" and "skills" must be arrays, and dates must be "YYYY-MM" or "present"."#;

/// System prompt for the summary report.
pub const SUMMARY_SYSTEM: &str = "You are a professional resume analyst. \
    Write clear, well-structured Markdown reports for job seekers. \
    Be specific and supportive.";

/// Summary prompt template.
/// Replace: {grounding_instruction}, {redaction_note}, {profile_json},
///          {experience_section}, {match_section}
pub const SUMMARY_PROMPT_TEMPLATE: &str = r#"{grounding_instruction}

{redaction_note}

Write a comprehensive resume analysis summary in Markdown with these sections:
1. Personal Information
2. Professional Summary
3. Work Experience
4. Skills (at most 20, most relevant first)
5. Education and Certifications
6. Key Insights (counts of positions, skills, qualifications; notable strengths)

RESUME PROFILE:
{profile_json}
{experience_section}{match_section}"#;

/// System prompt for improvement suggestions.
pub const IMPROVEMENTS_SYSTEM: &str = "You are a professional resume coach. \
    Give actionable, constructive feedback that helps candidates improve their resumes. \
    Respond in Markdown.";

/// Improvement prompt template.
/// Replace: {grounding_instruction}, {redaction_note}, {profile_json},
///          {gaps}, {match_section}
pub const IMPROVEMENTS_PROMPT_TEMPLATE: &str = r#"{grounding_instruction}

{redaction_note}

Suggest concrete improvements for the resume below.

DETECTED GAPS (address each one):
{gaps}

Then add general best practices that apply to THIS resume, for example:
- action verbs (Led, Developed, Implemented, Achieved)
- quantifiable achievements ("Increased revenue by 30%")
- consistent formatting, concise length (1-2 pages)
- keywords from job descriptions to pass applicant tracking systems

RESUME PROFILE:
{profile_json}
{match_section}"#;
