//! Line-oriented code awareness.
//!
//! Tracks whether each line sits inside a fenced code block, and masks inline
//! code spans and backslash escapes within a line so the link scanner never
//! mistakes example syntax for a real link.

/// A single source line with its fence state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedLine<'a> {
    /// 1-based line number
    pub number: usize,
    /// Line text without the trailing newline
    pub text: &'a str,
    /// Whether the line is part of a fenced code block (fence lines included)
    pub in_code: bool,
}

#[derive(Debug, Clone, Copy)]
struct Fence {
    marker: u8,
    len: usize,
    max_indent: usize,
}

/// Split content into lines and classify each one.
///
/// Fences open with at least three backticks or tildes indented by at most
/// three spaces past the current list item's content column (or the margin
/// outside lists), and close with a run of the same character that is at
/// least as long and followed only by whitespace. An unclosed fence runs to
/// the end of the document.
pub fn scan_lines(content: &str) -> Vec<ScannedLine<'_>> {
    let mut lines = Vec::new();
    let mut open: Option<Fence> = None;
    // Content column of the list item the following lines belong to.
    let mut list: Option<usize> = None;

    for (idx, raw) in content.lines().enumerate() {
        let text = raw.strip_suffix('\r').unwrap_or(raw);
        let number = idx + 1;

        match open {
            Some(fence) => {
                if closes_fence(text, fence) {
                    open = None;
                }
                lines.push(ScannedLine {
                    number,
                    text,
                    in_code: true,
                });
            }
            None => {
                if let Some(content) = list_item_content(text) {
                    list = Some(content);
                } else if !text.trim().is_empty() && list.is_some_and(|c| indent(text) < c) {
                    list = None;
                }
                open = opening_fence(text, list.unwrap_or(0) + 3);
                lines.push(ScannedLine {
                    number,
                    text,
                    in_code: open.is_some(),
                });
            }
        }
    }

    lines
}

fn indent(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Column where a list item's content starts, if `line` opens one.
fn list_item_content(line: &str) -> Option<usize> {
    let indent = indent(line);
    let rest = &line[indent..];
    let marker = if rest.starts_with(['-', '*', '+']) {
        1
    } else {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if !(1..=9).contains(&digits) || !matches!(rest.as_bytes().get(digits), Some(b'.' | b')')) {
            return None;
        }
        digits + 1
    };
    let after = &rest[marker..];
    let gap = indent_of_content(after)?;
    Some(indent + marker + gap)
}

/// Spaces between a list marker and its content; `None` when the marker is
/// glued to the text (`-foo`, `---`).
fn indent_of_content(after: &str) -> Option<usize> {
    if after.trim().is_empty() {
        return Some(1);
    }
    match indent(after) {
        0 => None,
        // Five or more spaces start indented code one column past the marker.
        spaces @ 1..=4 => Some(spaces),
        _ => Some(1),
    }
}

fn fence_run(line: &str, max_indent: usize) -> Option<(u8, usize, &str)> {
    let indent = indent(line);
    if indent > max_indent {
        return None;
    }
    let rest = &line[indent..];
    let marker = *rest.as_bytes().first()?;
    if marker != b'`' && marker != b'~' {
        return None;
    }
    let len = rest.bytes().take_while(|&b| b == marker).count();
    (len >= 3).then(|| (marker, len, &rest[len..]))
}

fn opening_fence(line: &str, max_indent: usize) -> Option<Fence> {
    let (marker, len, info) = fence_run(line, max_indent)?;
    // Backtick fences cannot carry backticks in their info string.
    if marker == b'`' && info.contains('`') {
        return None;
    }
    Some(Fence {
        marker,
        len,
        max_indent,
    })
}

fn closes_fence(line: &str, fence: Fence) -> bool {
    match fence_run(line, fence.max_indent) {
        Some((marker, len, rest)) => {
            marker == fence.marker && len >= fence.len && rest.trim().is_empty()
        }
        None => false,
    }
}

/// Byte used to blank out masked regions.
pub const MASK: u8 = 0x1A;

/// Return a copy of the line's bytes with code spans and escaped characters
/// replaced by [`MASK`].
///
/// Every byte of a masked region is replaced, so any unmasked ASCII position
/// in the result is also a character boundary in the original line.
pub fn mask_inline(line: &str) -> Vec<u8> {
    let bytes = line.as_bytes();
    let mut masked = bytes.to_vec();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() && bytes[i + 1].is_ascii_punctuation() => {
                masked[i] = MASK;
                masked[i + 1] = MASK;
                i += 2;
            }
            b'`' => {
                let run = bytes[i..].iter().take_while(|&&b| b == b'`').count();
                match find_closing_run(bytes, i + run, run) {
                    Some(end) => {
                        for b in &mut masked[i..end + run] {
                            *b = MASK;
                        }
                        i = end + run;
                    }
                    // An unmatched run is literal text.
                    None => i += run,
                }
            }
            _ => i += 1,
        }
    }

    masked
}

/// Find the start of the next backtick run of exactly `len` at or after `from`.
fn find_closing_run(bytes: &[u8], from: usize, len: usize) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'`' {
            let run = bytes[i..].iter().take_while(|&&b| b == b'`').count();
            if run == len {
                return Some(i);
            }
            i += run;
        } else {
            i += 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_flags(content: &str) -> Vec<bool> {
        scan_lines(content).iter().map(|l| l.in_code).collect()
    }

    #[test]
    fn test_backtick_fence() {
        let md = "before\n```rust\nlet x = 1;\n```\nafter";
        assert_eq!(code_flags(md), vec![false, true, true, true, false]);
    }

    #[test]
    fn test_tilde_fence_ignores_backticks() {
        let md = "~~~\n```\nstill code\n~~~\ntext";
        assert_eq!(code_flags(md), vec![true, true, true, true, false]);
    }

    #[test]
    fn test_longer_fence_needs_longer_close() {
        let md = "````\n```\n````\ntext";
        assert_eq!(code_flags(md), vec![true, true, true, false]);
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        let md = "```\ncode\nmore";
        assert_eq!(code_flags(md), vec![true, true, true]);
    }

    #[test]
    fn test_indented_fence_marker() {
        let md = "   ```\ncode\n   ```\ntext\n    ```\nnot a fence";
        assert_eq!(
            code_flags(md),
            vec![true, true, true, false, false, false]
        );
    }

    #[test]
    fn test_fence_nested_in_list_item() {
        let md = "- step\n\n    ```md\n    [x](missing.md)\n    ```\n\ntext";
        assert_eq!(
            code_flags(md),
            vec![false, false, true, true, true, false, false]
        );
    }

    #[test]
    fn test_list_context_ends_at_outdented_text() {
        let md = "1. step\n\ntext\n    ```\nnot a fence";
        assert_eq!(code_flags(md), vec![false, false, false, false, false]);
    }

    #[test]
    fn test_list_item_content_column() {
        assert_eq!(list_item_content("- a"), Some(2));
        assert_eq!(list_item_content("  10. a"), Some(6));
        assert_eq!(list_item_content("*"), Some(2));
        assert_eq!(list_item_content("---"), None);
        assert_eq!(list_item_content("2024. a"), Some(6));
        assert_eq!(list_item_content("text"), None);
    }

    #[test]
    fn test_line_numbers_and_crlf() {
        let lines = scan_lines("one\r\ntwo\r\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].number, 2);
        assert_eq!(lines[1].text, "two");
    }

    #[test]
    fn test_mask_code_span() {
        let masked = mask_inline("a `[x](y)` b");
        assert_eq!(masked[0], b'a');
        assert!(masked[2..10].iter().all(|&b| b == MASK));
        assert_eq!(masked[11], b'b');
    }

    #[test]
    fn test_mask_double_backtick_span() {
        let masked = mask_inline("``a ` b`` [c](d)");
        assert!(masked[..9].iter().all(|&b| b == MASK));
        assert_eq!(masked[10], b'[');
    }

    #[test]
    fn test_unmatched_backtick_is_literal() {
        let masked = mask_inline("a ` [c](d)");
        assert_eq!(masked[4], b'[');
    }

    #[test]
    fn test_mask_escapes() {
        let masked = mask_inline(r"\[not a link\]");
        assert_eq!(masked[0], MASK);
        assert_eq!(masked[1], MASK);
    }
}
