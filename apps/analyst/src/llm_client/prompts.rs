// Cross-cutting prompt fragments shared by every generation prompt.
// Each module that needs LLM calls defines its own prompts.rs alongside it.

/// Common instruction appended to every free-text generation prompt.
pub const GROUNDING_INSTRUCTION: &str = "\
    CRITICAL: Base every statement on the resume data provided below. \
    Do NOT invent employers, dates, skills, degrees, or metrics. \
    If the data does not support a claim, leave it out.";

/// Placeholder tokens never carry meaning; tell the model not to comment on them.
pub const REDACTION_NOTE: &str = "\
    Values such as [REDACTED_EMAIL], [REDACTED_URL] or [REDACTED_CREDIT_CARD] are \
    privacy placeholders. Treat them as present but never repeat or guess the original.";
