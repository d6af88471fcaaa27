//! Markdown to plain text

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

/// Reduce Markdown to readable plain text.
///
/// Headings become their own paragraph, list items are prefixed with `- `,
/// and link targets are dropped in favour of the link text.
pub fn markdown_to_text(content: &str) -> String {
    let parser = Parser::new(content);
    let mut out = String::with_capacity(content.len());
    let mut list_depth: usize = 0;

    for event in parser {
        match event {
            Event::Start(Tag::Heading { .. }) => {
                push_paragraph_break(&mut out);
            }
            Event::End(TagEnd::Heading(_)) => {
                out.push_str("\n\n");
            }
            Event::Start(Tag::Item) => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&"  ".repeat(list_depth.saturating_sub(1)));
                out.push_str("- ");
            }
            Event::End(TagEnd::Item) => {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Event::Start(Tag::List(_)) => {
                list_depth += 1;
            }
            Event::End(TagEnd::List(_)) => {
                list_depth = list_depth.saturating_sub(1);
                if list_depth == 0 {
                    out.push('\n');
                }
            }
            Event::End(TagEnd::Paragraph) => {
                if list_depth == 0 {
                    out.push_str("\n\n");
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                out.push_str("\n\n");
            }
            Event::Text(text) | Event::Code(text) => {
                out.push_str(&text);
            }
            Event::SoftBreak | Event::HardBreak => {
                out.push('\n');
            }
            Event::End(TagEnd::TableCell) => {
                out.push_str(" | ");
            }
            Event::End(TagEnd::TableRow) | Event::End(TagEnd::TableHead) => {
                out.push('\n');
            }
            _ => {}
        }
    }

    out.trim().to_string()
}

fn push_paragraph_break(out: &mut String) {
    if out.is_empty() || out.ends_with("\n\n") {
        return;
    }
    if out.ends_with('\n') {
        out.push('\n');
    } else {
        out.push_str("\n\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_to_text_basic() {
        let markdown = r#"
# Complementary feeding

Start at **6 months** while continuing to breastfeed.

## Texture

- Mashed foods
- Finger foods from [9 months](https://example.org/who)
"#;

        let text = markdown_to_text(markdown);

        assert!(text.starts_with("Complementary feeding\n\n"));
        assert!(text.contains("Start at 6 months while continuing to breastfeed."));
        assert!(text.contains("- Mashed foods\n- Finger foods from 9 months"));
        assert!(!text.contains("https://"));
        assert!(!text.contains("**"));
    }

    #[test]
    fn test_headings_are_separated() {
        let text = markdown_to_text("# H1\n## H2\nbody");
        assert_eq!(text, "H1\n\nH2\n\nbody");
    }

    #[test]
    fn test_code_is_kept_as_text() {
        let text = markdown_to_text("Use `ORS` for diarrhoea.\n\n```\n1 litre water\n```");
        assert!(text.contains("Use ORS for diarrhoea."));
        assert!(text.contains("1 litre water"));
    }
}
