//! Validation and normalization of user-supplied titles and descriptions.
//!
//! Titles double as artifact file names, so unknown characters are rejected
//! rather than mapped. Descriptions are only ever rendered, so markup is
//! stripped and the rest kept.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

pub const DEFAULT_MAX_TITLE_LENGTH: usize = 30;
pub const DEFAULT_MAX_DESCRIPTION_LENGTH: usize = 150;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SanitizeError {
    #[error(
        "title contains invalid characters ({0}); use only letters, digits, spaces, hyphens, underscores and periods"
    )]
    InvalidCharacters(String),
    #[error("text is {len} characters long, the maximum is {max}")]
    TooLong { len: usize, max: usize },
}

/// Elements whose content is dropped together with the tags.
const NON_TEXT_ELEMENTS: [&str; 5] = ["script", "style", "textarea", "noscript", "option"];

/// Attribute text inside a tag. A `>` within a quoted value does not end the
/// tag; an unterminated quote runs to the end of the input.
const ATTRIBUTES: &str = r#"(?:[^>"']|"[^"]*(?:"|\z)|'[^']*(?:'|\z))*"#;

// Opening tag up to `>`, then the element content and its closing tag. An
// unterminated element swallows the rest of the input.
fn non_text_blocks() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        NON_TEXT_ELEMENTS
            .iter()
            .flat_map(|tag| {
                [
                    format!(r"(?is)<{tag}\b{ATTRIBUTES}>.*?</{tag}\s*>"),
                    format!(r"(?is)<{tag}\b{ATTRIBUTES}(?:>.*)?\z"),
                ]
            })
            .map(|pattern| Regex::new(&pattern).expect("valid non-text element pattern"))
            .collect()
    })
}

fn comment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?(-->|\z)").expect("valid comment pattern"))
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?s)</?[A-Za-z]{ATTRIBUTES}(>|\z)|<![^>]*(>|\z)|<\?[^>]*(>|\z)"
        ))
        .expect("valid tag pattern")
    })
}

fn is_title_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || c.is_whitespace()
        || matches!(c, '-' | '_' | '.' | 'å' | 'ä' | 'ö' | 'Å' | 'Ä' | 'Ö')
}

/// Validate and normalize a title.
///
/// Any character outside the whitelist fails the whole title. Whitespace runs
/// collapse to a single space, the result is trimmed and cut to `max_len`
/// characters.
pub fn sanitize_title(raw: &str, max_len: usize) -> Result<String, SanitizeError> {
    let mut invalid: Vec<char> = raw.chars().filter(|c| !is_title_char(*c)).collect();
    if !invalid.is_empty() {
        invalid.dedup();
        return Err(SanitizeError::InvalidCharacters(invalid.into_iter().collect()));
    }

    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    Ok(truncate_chars(&collapsed, max_len).trim_end().to_string())
}

/// Strip all markup from a description and enforce the length cap.
pub fn sanitize_description(raw: &str, max_len: usize) -> Result<String, SanitizeError> {
    let text = strip_markup(raw);
    let text = text.trim();
    let len = text.chars().count();
    if len > max_len {
        return Err(SanitizeError::TooLong { len, max: max_len });
    }
    Ok(text.to_string())
}

/// Reduce HTML to plain text with no tags or attributes left.
pub fn strip_markup(raw: &str) -> String {
    let mut text = raw.to_string();
    for block in non_text_blocks() {
        text = block.replace_all(&text, "").into_owned();
    }
    let text = comment_regex().replace_all(&text, "");
    let text = tag_regex().replace_all(&text, "");
    escape_text(&text)
}

/// Escape the characters that would let stored text turn back into markup.
/// Well-formed entities already present are kept as they are.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '&' if !starts_with_entity(&text[i + 1..]) => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
    out
}

fn starts_with_entity(rest: &str) -> bool {
    let Some(end) = rest.find(';') else {
        return false;
    };
    let name = &rest[..end];
    if let Some(num) = name.strip_prefix('#') {
        if let Some(hex) = num.strip_prefix(['x', 'X']) {
            return !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
        }
        return !num.is_empty() && num.chars().all(|c| c.is_ascii_digit());
    }
    !name.is_empty() && name.len() <= 32 && name.chars().all(|c| c.is_ascii_alphanumeric())
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
