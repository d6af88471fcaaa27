//! Word (.docx) text extraction
//!
//! A .docx file is a zip archive; the body lives in `word/document.xml`.
//! Paragraph and line-break elements become newlines, all other markup is
//! stripped.

use crate::error::{Error, Result};
use regex::{Captures, Regex};
use std::io::Read;
use std::path::Path;

const DOCUMENT_PART: &str = "word/document.xml";

pub fn extract_text(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::Parse(format!("{} is not a valid .docx: {}", path.display(), e)))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| Error::Parse(format!("{} has no {}: {}", path.display(), DOCUMENT_PART, e)))?
        .read_to_string(&mut xml)?;

    xml_to_text(&xml)
}

fn xml_to_text(xml: &str) -> Result<String> {
    let regex = |pattern: &str| Regex::new(pattern).map_err(|e| Error::Parse(e.to_string()));
    let breaks = regex(r"</w:p>|<w:br\s*/>|<w:cr\s*/>")?;
    let tabs = regex(r"<w:tab\s*/>")?;
    let tags = regex(r"<[^>]+>")?;
    let entities = regex(r"&(lt|gt|quot|apos|amp|#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6});")?;

    let text = breaks.replace_all(xml, "\n");
    let text = tabs.replace_all(&text, "\t");
    let text = tags.replace_all(&text, "");

    Ok(unescape_xml(&entities, &text)
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string())
}

/// Single pass, so `&amp;lt;` stays `&lt;`
fn unescape_xml(entities: &Regex, text: &str) -> String {
    entities
        .replace_all(text, |caps: &Captures| match decode_entity(&caps[1]) {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "amp" => Some('&'),
        _ => {
            let code = match name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => name.strip_prefix('#')?.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const BODY: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        "<w:document><w:body>",
        "<w:p><w:r><w:t>Feeding &amp; care</w:t></w:r></w:p>",
        "<w:p><w:r><w:t>Offer iron-rich foods</w:t><w:br/><w:t>daily.</w:t></w:r></w:p>",
        "</w:body></w:document>"
    );

    #[test]
    fn test_xml_to_text() {
        let text = xml_to_text(BODY).unwrap();
        assert_eq!(text, "Feeding & care\nOffer iron-rich foods\ndaily.");
    }

    #[test]
    fn test_numeric_character_references() {
        let xml = "<w:p><w:t>Mother&#8217;s milk&#160;&amp; water &#x2014; &amp;lt;6m&#xD800;</w:t></w:p>";
        let text = xml_to_text(xml).unwrap();
        assert_eq!(text, "Mother\u{2019}s milk\u{a0}& water \u{2014} &lt;6m&#xD800;");
    }

    #[test]
    fn test_extract_from_archive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("guide.docx");

        let file = std::fs::File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file(DOCUMENT_PART, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(BODY.as_bytes()).unwrap();
        writer.finish().unwrap();

        let text = extract_text(&path).unwrap();
        assert!(text.starts_with("Feeding & care"));
    }

    #[test]
    fn test_rejects_non_zip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fake.docx");
        std::fs::write(&path, "plain text").unwrap();
        assert!(matches!(extract_text(&path), Err(Error::Parse(_))));
    }
}
