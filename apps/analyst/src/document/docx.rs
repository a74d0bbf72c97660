use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern"));

/// Pulls the body text out of a DOCX package, one paragraph per line.
pub fn extract_text(path: &Path) -> Result<String> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut archive = zip::ZipArchive::new(file).context("not a zip package")?;
    let mut entry = archive
        .by_name("word/document.xml")
        .context("missing word/document.xml")?;

    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .context("word/document.xml is not valid UTF-8")?;

    Ok(xml_to_text(&xml))
}

fn xml_to_text(xml: &str) -> String {
    let xml = xml
        .replace("</w:p>", "\n")
        .replace("<w:tab/>", "\t")
        .replace("<w:br/>", "\n");
    let stripped = TAG_RE.replace_all(&xml, "");

    let text = stripped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&");

    text.lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const BODY: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document><w:body>
<w:p><w:r><w:t>Ada Lovelace</w:t></w:r></w:p>
<w:p><w:r><w:t>Skills:</w:t><w:tab/><w:t>Rust &amp; Python</w:t></w:r></w:p>
<w:p></w:p>
</w:body></w:document>"#;

    #[test]
    fn test_xml_to_text_keeps_paragraphs_and_entities() {
        let text = xml_to_text(BODY);
        assert_eq!(text, "Ada Lovelace\nSkills:\tRust & Python");
    }

    #[test]
    fn test_extract_text_from_package() {
        let file = tempfile::Builder::new().suffix(".docx").tempfile().unwrap();
        {
            let mut writer = zip::ZipWriter::new(file.reopen().unwrap());
            writer
                .start_file("word/document.xml", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(BODY.as_bytes()).unwrap();
            writer.finish().unwrap();
        }

        let text = extract_text(file.path()).unwrap();
        assert!(text.starts_with("Ada Lovelace"));
    }

    #[test]
    fn test_package_without_body_fails() {
        let file = tempfile::Builder::new().suffix(".docx").tempfile().unwrap();
        {
            let mut writer = zip::ZipWriter::new(file.reopen().unwrap());
            writer
                .start_file("docProps/core.xml", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"<x/>").unwrap();
            writer.finish().unwrap();
        }

        let err = extract_text(file.path()).unwrap_err();
        assert!(err.to_string().contains("word/document.xml"));
    }
}
