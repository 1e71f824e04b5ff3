//! Markdown parsing and document structure extraction.
//!
//! This module turns a markdown file into a [`Document`]: its headings with
//! their anchor slugs, its links, its declared table of contents and any link
//! syntax it could not parse. Everything is line-oriented and aware of fenced
//! code blocks and inline code spans.

mod document;
pub mod links;
pub mod scanner;
pub mod toc;
pub mod utils;

pub use document::{Document, Heading, Toc, TocEntry};
pub use links::{Link, LinkForm, LinkScan, LinkTarget, MalformedLink, extract_links};

use crate::slug::{SlugCounter, slugify};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Knobs that change how a document is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Heading texts that introduce a table of contents (case-insensitive)
    pub toc_headings: Vec<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            toc_headings: vec!["Contents".to_string(), "Table of Contents".to_string()],
        }
    }
}

/// Parse a markdown file and extract its structure.
///
/// Invalid UTF-8 is replaced rather than rejected so one stray byte does not
/// hide a whole document's links.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn parse_file(path: &Path, options: &ParseOptions) -> std::io::Result<Document> {
    let bytes = std::fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes).into_owned();
    Ok(parse_markdown_with(&content, options).with_path(path))
}

/// Parse markdown content with the default options.
pub fn parse_markdown(content: &str) -> Document {
    parse_markdown_with(content, &ParseOptions::default())
}

/// Parse markdown content and extract headings, anchors, links and the table
/// of contents.
pub fn parse_markdown_with(content: &str, options: &ParseOptions) -> Document {
    let lines = scanner::scan_lines(content);

    let mut counter = SlugCounter::new();
    let mut headings = Vec::new();
    let mut explicit_anchors = Vec::new();
    for line in lines.iter().filter(|l| !l.in_code) {
        if let Some((level, text)) = utils::parse_heading(line.text) {
            let slug = counter.assign(&slugify(&text));
            headings.push(Heading {
                level,
                text,
                line: line.number,
                slug,
            });
        }
        explicit_anchors.extend(html_anchors(line.text));
    }

    let LinkScan { links, malformed } = links::extract_from_lines(&lines);
    let toc = toc::extract_toc(&headings, &links, &options.toc_headings);

    Document::new(
        content.to_string(),
        headings,
        explicit_anchors,
        links,
        toc,
        malformed,
    )
}

/// Anchors declared with HTML, e.g. `<a name="legacy"></a>` or
/// `<span id="faq">`.
fn html_anchors(line: &str) -> Vec<String> {
    static ANCHOR: OnceLock<Regex> = OnceLock::new();
    let re = ANCHOR.get_or_init(|| {
        Regex::new(r#"<[A-Za-z][A-Za-z0-9]*\s[^>]*?\b(?:name|id)\s*=\s*["']([^"']+)["']"#)
            .unwrap()
    });
    if !line.contains('<') {
        return Vec::new();
    }
    let masked = scanner::mask_inline(line);
    re.captures_iter(line)
        .filter(|caps| caps.get(0).is_some_and(|m| masked[m.start()] == b'<'))
        .map(|caps| caps[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_headings() {
        let md = r#"# Title
Some content

## Section 1
More content

### Subsection
Details

## Section 2
End"#;

        let doc = parse_markdown(md);
        assert_eq!(doc.headings.len(), 4);
        assert_eq!(doc.headings[0].level, 1);
        assert_eq!(doc.headings[0].text, "Title");
        assert_eq!(doc.headings[1].level, 2);
        assert_eq!(doc.headings[1].text, "Section 1");
        assert_eq!(doc.headings[1].line, 4);
        assert_eq!(doc.headings[1].slug, "section-1");
    }

    #[test]
    fn test_duplicate_headings_get_suffixes() {
        let md = "# Guide\n## Overview\ntext\n## Overview\n### Overview\n";
        let doc = parse_markdown(md);
        let slugs: Vec<_> = doc.headings.iter().map(|h| h.slug.as_str()).collect();
        assert_eq!(slugs, vec!["guide", "overview", "overview-1", "overview-2"]);
        assert!(doc.has_anchor("overview-1"));
    }

    #[test]
    fn test_headings_in_code_blocks_are_ignored() {
        let md = "# Real\n```sh\n# not a heading\n```\n## Also Real";
        let doc = parse_markdown(md);
        let texts: Vec<_> = doc.headings.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["Real", "Also Real"]);
    }

    #[test]
    fn test_setext_headings_are_not_recognized() {
        let doc = parse_markdown("Title\n=====\n\nSub\n---\n");
        assert!(doc.headings.is_empty());
    }

    #[test]
    fn test_html_anchors() {
        let md = "# Doc\n<a name=\"legacy-api\"></a>\n<span id='faq'>FAQ</span>\n`<a id=\"code\">`";
        let doc = parse_markdown(md);
        assert!(doc.has_anchor("legacy-api"));
        assert!(doc.has_anchor("faq"));
        assert!(!doc.has_anchor("code"));
        assert_eq!(doc.anchors(), &["doc", "legacy-api", "faq"]);
    }

    #[test]
    fn test_toc_detected() {
        let md = "# Guide\n\n## Contents\n\n- [Install](#install)\n\n## Install\n";
        let doc = parse_markdown(md);
        assert_eq!(doc.toc_heading().map(|h| h.text.as_str()), Some("Contents"));
        assert_eq!(doc.toc.as_ref().unwrap().entries.len(), 1);
    }

    #[test]
    fn test_custom_toc_marker() {
        let options = ParseOptions {
            toc_headings: vec!["On this page".to_string()],
        };
        let md = "# Guide\n## On this page\n- [A](#a)\n## A\n";
        let doc = parse_markdown_with(md, &options);
        assert!(doc.toc.is_some());
        assert!(parse_markdown(md).toc.is_none());
    }

    #[test]
    fn test_parse_file_sets_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "# Hello\n[x](other.md)\n").unwrap();

        let doc = parse_file(&path, &ParseOptions::default()).unwrap();
        assert_eq!(doc.path, path);
        assert_eq!(doc.links.len(), 1);
        assert!(doc.find_heading_by_slug("hello").is_some());
    }
}
