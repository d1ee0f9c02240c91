//! Paragraph-based description extraction.
//!
//! The description is stitched together from the first few `<p>` blocks that
//! hold plain ASCII text. Paragraphs with nested markup (links, emphasis) or
//! non-ASCII characters are skipped entirely.

use once_cell::sync::Lazy;
use regex::Regex;

/// A `<p>` block whose body is 7-bit ASCII without `<` or `>`.
static PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<p>[\x00-\x3B=\x3F-\x7F]*</p>").unwrap());

/// Stop after this many non-empty paragraphs.
pub const MAX_PARAGRAPHS: usize = 5;

/// Stop once the description is at least this many characters long.
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

/// Build a short description from the leading plain-text paragraphs of `html`.
///
/// Paragraphs are joined with a single space. Only an empty `<p></p>` is
/// skipped; whitespace inside the tags is kept as-is and a whitespace-only
/// paragraph counts against [`MAX_PARAGRAPHS`]. Scanning resumes right after
/// each consumed match, so no paragraph is read twice. The result is empty
/// when nothing qualifies.
pub fn extract_description(html: &str) -> String {
    let mut description = String::new();
    let mut remaining = MAX_PARAGRAPHS;
    let mut rest = html;

    while remaining > 0 && description.len() < MAX_DESCRIPTION_CHARS {
        let Some(m) = PARAGRAPH.find(rest) else {
            break;
        };
        let text = strip_paragraph_tags(m.as_str());
        if !text.is_empty() {
            if !description.is_empty() {
                description.push(' ');
            }
            description.push_str(text);
            remaining -= 1;
        }
        rest = &rest[m.end()..];
    }

    description
}

fn strip_paragraph_tags(block: &str) -> &str {
    let block = block.trim();
    block
        .strip_prefix("<p>")
        .and_then(|b| b.strip_suffix("</p>"))
        .unwrap_or(block)
}
