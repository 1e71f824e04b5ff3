//! Utility functions for markdown parsing.
//!
//! Shared helper functions used across the parser and slug modules.

use regex::Regex;
use std::sync::OnceLock;

/// Strip inline markdown formatting from heading text.
///
/// Rendered headings expose only their visible text to the anchor generator, so
/// link and image syntax collapse to their label, HTML tags disappear, and
/// emphasis, strikethrough and code markers are dropped.
///
/// Handles: `[text](url)`, `![alt](src)`, `<tag>`, `**bold**`, `__bold__`,
/// `*italic*`, `_italic_` (with snake_case protection), `` `code` `` and
/// `~~strikethrough~~`.
///
/// # Examples
///
/// ```
/// # use mdlinkcheck::parser::utils::strip_markdown_inline;
/// assert_eq!(strip_markdown_inline("**bold** text"), "bold text");
/// assert_eq!(strip_markdown_inline("`code` here"), "code here");
/// assert_eq!(strip_markdown_inline("see [docs](a.md)"), "see docs");
/// assert_eq!(strip_markdown_inline("snake_case_var"), "snake_case_var");
/// ```
pub fn strip_markdown_inline(text: &str) -> String {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        vec![
            (Regex::new(r"!?\[([^\]]*)\]\([^)]*\)").unwrap(), "$1"),
            (Regex::new(r"!?\[([^\]]*)\]\[[^\]]*\]").unwrap(), "$1"),
            (Regex::new(r"</?[A-Za-z][^>]*>").unwrap(), ""),
            (Regex::new(r"~~(.+?)~~").unwrap(), "$1"),
            (Regex::new(r"\*\*(.+?)\*\*").unwrap(), "$1"),
            (Regex::new(r"__(.+?)__").unwrap(), "$1"),
            (Regex::new(r"`([^`]+)`").unwrap(), "$1"),
            (Regex::new(r"\*(.+?)\*").unwrap(), "$1"),
            (
                Regex::new(r"(^|[^a-zA-Z0-9])_([^_]+)_([^a-zA-Z0-9]|$)").unwrap(),
                "$1$2$3",
            ),
        ]
    });

    let mut result = text.to_string();
    for (pattern, replacement) in patterns {
        result = pattern.replace_all(&result, *replacement).to_string();
    }
    result
}

/// Extract the heading level from a line of markdown text.
///
/// Returns `Some(level)` if the line is an ATX heading (1-6 #'s followed by
/// whitespace or end of line, indented by at most three spaces), or `None`
/// otherwise.
///
/// # Examples
///
/// ```
/// # use mdlinkcheck::parser::utils::get_heading_level;
/// assert_eq!(get_heading_level("# Title"), Some(1));
/// assert_eq!(get_heading_level("## Section"), Some(2));
/// assert_eq!(get_heading_level("not a heading"), None);
/// assert_eq!(get_heading_level("#NoSpace"), None);
/// ```
pub fn get_heading_level(line: &str) -> Option<usize> {
    let trimmed = strip_indent(line)?;
    let mut level = 0;

    for ch in trimmed.chars() {
        if ch == '#' {
            level += 1;
        } else if ch.is_whitespace() {
            break;
        } else {
            return None;
        }
    }

    (1..=6).contains(&level).then_some(level)
}

/// Parse an ATX heading line into its level and text.
///
/// The optional closing sequence of `#` characters is removed, as is
/// surrounding whitespace.
pub fn parse_heading(line: &str) -> Option<(usize, String)> {
    let level = get_heading_level(line)?;
    let rest = strip_indent(line)?[level..].trim();

    // A closing sequence only counts when separated from the text by a space.
    let without_closing = rest.trim_end_matches('#');
    let text = if without_closing.is_empty() {
        ""
    } else if without_closing.ends_with(char::is_whitespace) {
        without_closing.trim_end()
    } else {
        rest
    };

    Some((level, text.to_string()))
}

/// Remove up to three leading spaces; four or more make an indented code line.
fn strip_indent(line: &str) -> Option<&str> {
    let spaces = line.len() - line.trim_start_matches(' ').len();
    if spaces > 3 {
        return None;
    }
    Some(&line[spaces..])
}

/// Decode `%XX` escapes in a link target.
///
/// Invalid escapes are kept literally, and byte sequences that are not valid
/// UTF-8 after decoding fall back to the original text.
pub fn percent_decode(text: &str) -> String {
    if !text.contains('%') {
        return text.to_string();
    }

    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8(out).unwrap_or_else(|_| text.to_string())
}

fn hex_value(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|d| d as u8)
}

/// Normalize a reference label for matching: case-insensitive, with runs of
/// whitespace collapsed to a single space.
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
