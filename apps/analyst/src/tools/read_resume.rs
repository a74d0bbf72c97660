use std::path::Path;

use tracing::info;

use crate::document::DocumentReader;
use crate::models::resume::ResumeText;
use crate::pii::redact_pii;
use crate::tools::ToolError;

/// Reads the resume at `path` through the document reader.
/// With `redact` set, emails, card numbers and URLs are scrubbed before the
/// text can reach the model.
pub async fn read_resume(
    reader: &dyn DocumentReader,
    path: &Path,
    redact: bool,
) -> Result<ResumeText, ToolError> {
    let raw = reader.extract_text(path).await?;
    let text = if redact { redact_pii(&raw) } else { raw };

    info!(
        "Resume read from {} ({} characters, redacted={})",
        path.display(),
        text.chars().count(),
        redact
    );
    Ok(ResumeText::new(path, text))
}
