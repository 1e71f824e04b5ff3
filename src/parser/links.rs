//! Link detection and parsing from markdown content.
//!
//! Recognizes inline links and images (`[text](target)`, `![alt](src)`),
//! reference links in full, collapsed and shortcut form (`[text][ref]`,
//! `[text][]`, `[ref]`) together with their `[ref]: target` definitions.
//! Fenced code blocks and inline code spans are skipped, and malformed syntax
//! is reported instead of aborting the scan.

use super::scanner::{ScannedLine, mask_inline, scan_lines};
use super::utils::{normalize_label, percent_decode};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

/// Represents a link found in markdown content.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// 1-based line of the link (of the definition for unused definitions)
    pub line: usize,
    /// Display text of the link
    pub text: String,
    /// Target exactly as written in the source
    pub raw: String,
    /// The classified target
    pub target: LinkTarget,
    /// Syntax the link was written in
    pub form: LinkForm,
}

/// How a link was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkForm {
    /// `[text](target)`
    Inline,
    /// `![alt](src)`
    Image,
    /// `[text][label]`, `[text][]` or `[label]`, resolved through a definition
    Reference { label: String },
    /// A `[label]: target` definition nothing refers to
    Definition { label: String },
}

/// The different types of link targets supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// URL with a scheme (e.g., `https://example.com`, `mailto:a@b.c`)
    External(String),

    /// Anchor in the current document (e.g., `#installation`), percent-decoded
    Anchor(String),

    /// Path to another file, optionally with a fragment
    /// (e.g., `../docs/api.md#usage`). The path is percent-decoded and has any
    /// query string removed.
    Path {
        path: String,
        fragment: Option<String>,
    },
}

impl LinkTarget {
    /// Classify a raw link target.
    ///
    /// # Examples
    ///
    /// ```
    /// use mdlinkcheck::parser::LinkTarget;
    ///
    /// assert!(matches!(LinkTarget::parse("https://a.io"), LinkTarget::External(_)));
    /// assert_eq!(LinkTarget::parse("#usage"), LinkTarget::Anchor("usage".into()));
    /// assert_eq!(
    ///     LinkTarget::parse("../api.md#setup"),
    ///     LinkTarget::Path { path: "../api.md".into(), fragment: Some("setup".into()) }
    /// );
    /// ```
    pub fn parse(raw: &str) -> Self {
        static SCHEME: OnceLock<Regex> = OnceLock::new();
        let scheme = SCHEME.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]+:").unwrap());

        let raw = raw.trim();
        if scheme.is_match(raw) || raw.starts_with("//") {
            return LinkTarget::External(raw.to_string());
        }

        if let Some(fragment) = raw.strip_prefix('#') {
            return LinkTarget::Anchor(percent_decode(fragment));
        }

        let (before_fragment, fragment) = match raw.split_once('#') {
            Some((path, fragment)) => (path, Some(percent_decode(fragment))),
            None => (raw, None),
        };
        let path = before_fragment
            .split_once('?')
            .map_or(before_fragment, |(path, _)| path);

        LinkTarget::Path {
            path: percent_decode(path),
            fragment,
        }
    }

    /// Get a string representation of the link target for display
    pub fn as_str(&self) -> String {
        match self {
            LinkTarget::External(url) => url.clone(),
            LinkTarget::Anchor(a) => format!("#{}", a),
            LinkTarget::Path { path, fragment } => match fragment {
                Some(f) => format!("{}#{}", path, f),
                None => path.clone(),
            },
        }
    }
}

/// Link syntax that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedLink {
    pub line: usize,
    pub reason: String,
}

/// A `[label]: target` definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub label: String,
    pub target: String,
    pub line: usize,
}

/// Everything the link scanner found in one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkScan {
    pub links: Vec<Link>,
    pub malformed: Vec<MalformedLink>,
}

/// Extract all links from markdown content.
///
/// Links inside fenced code blocks or inline code are excluded.
pub fn extract_links(content: &str) -> LinkScan {
    extract_from_lines(&scan_lines(content))
}

/// Extract links from already scanned lines.
pub fn extract_from_lines(lines: &[ScannedLine<'_>]) -> LinkScan {
    let definitions = collect_definitions(lines);
    let mut scanner = LinkScanner {
        definitions: &definitions,
        used: HashSet::new(),
        scan: LinkScan::default(),
    };

    for line in lines.iter().filter(|l| !l.in_code) {
        if definition_line(line.text).is_some() {
            continue;
        }
        let masked = mask_inline(line.text);
        scanner.scan_range(line, &masked, 0, masked.len());
    }

    // Definitions never referred to still point somewhere and get checked
    // where they are written.
    let mut unused: Vec<&Definition> = definitions
        .values()
        .filter(|d| !scanner.used.contains(&d.label))
        .collect();
    unused.sort_by_key(|d| d.line);
    for def in unused {
        scanner.scan.links.push(Link {
            line: def.line,
            text: def.label.clone(),
            raw: def.target.clone(),
            target: LinkTarget::parse(&def.target),
            form: LinkForm::Definition {
                label: def.label.clone(),
            },
        });
    }

    let mut scan = scanner.scan;
    scan.links.sort_by_key(|l| l.line);
    scan
}

/// Collect `[label]: target` definitions outside code blocks. The first
/// definition of a label wins.
pub fn collect_definitions(lines: &[ScannedLine<'_>]) -> BTreeMap<String, Definition> {
    let mut definitions = BTreeMap::new();
    for line in lines.iter().filter(|l| !l.in_code) {
        if let Some((label, target)) = definition_line(line.text) {
            let label = normalize_label(&label);
            definitions.entry(label.clone()).or_insert(Definition {
                label,
                target,
                line: line.number,
            });
        }
    }
    definitions
}

fn definition_line(text: &str) -> Option<(String, String)> {
    static DEFINITION: OnceLock<Regex> = OnceLock::new();
    let re = DEFINITION.get_or_init(|| {
        Regex::new(r#"^ {0,3}\[([^\]^][^\]]*)\]:\s*(<[^>]*>|\S+)(?:\s+(?:"[^"]*"|'[^']*'|\([^)]*\)))?\s*$"#)
            .unwrap()
    });
    let caps = re.captures(text)?;
    let target = caps[2].trim_start_matches('<').trim_end_matches('>');
    Some((caps[1].to_string(), target.to_string()))
}

struct LinkScanner<'d> {
    definitions: &'d BTreeMap<String, Definition>,
    used: HashSet<String>,
    scan: LinkScan,
}

impl LinkScanner<'_> {
    /// Scan masked bytes in `start..end` of one line.
    fn scan_range(&mut self, line: &ScannedLine<'_>, masked: &[u8], start: usize, end: usize) {
        let text = line.text;
        let mut i = start;

        while i < end {
            if masked[i] != b'[' {
                i += 1;
                continue;
            }

            let is_image = i > start && masked[i - 1] == b'!';
            let Some(close) = find_closing_bracket(masked, i, end) else {
                if contains(&masked[i..end], b"](") {
                    self.malformed(line.number, "unbalanced brackets: `[` is never closed");
                }
                i += 1;
                continue;
            };

            let label = &text[i + 1..close];
            if label.starts_with('^') {
                // Footnote reference
                i = close + 1;
                continue;
            }

            match masked.get(close + 1).copied().filter(|_| close + 1 < end) {
                Some(b'(') => match find_closing_paren(masked, close + 1, end) {
                    Some(paren) => {
                        let destination = parse_destination(&text[close + 2..paren]);
                        let form = if is_image {
                            LinkForm::Image
                        } else {
                            LinkForm::Inline
                        };
                        if destination.is_empty() {
                            self.malformed(
                                line.number,
                                format!("empty link target in `[{}]()`", label),
                            );
                        } else {
                            self.push(line.number, label, destination, form);
                        }
                        // Labels may hold nested links such as badge images.
                        self.scan_range(line, masked, i + 1, close);
                        i = paren + 1;
                    }
                    None => {
                        self.malformed(
                            line.number,
                            format!("missing closing parenthesis in link `[{}](`", label),
                        );
                        i = close + 1;
                    }
                },
                Some(b'[') => match find_closing_bracket(masked, close + 1, end) {
                    Some(ref_close) => {
                        let reference = &text[close + 2..ref_close];
                        let label_key = if reference.trim().is_empty() {
                            normalize_label(label)
                        } else {
                            normalize_label(reference)
                        };
                        if self.reference(line.number, label, label_key) {
                            i = ref_close + 1;
                        } else if self.reference(line.number, label, normalize_label(label)) {
                            // `[text][nope]` falls back to `[text]` alone.
                            i = close + 1;
                        } else {
                            // Plain text such as `matrix[i][j]`.
                            i += 1;
                        }
                    }
                    None => i = close + 1,
                },
                _ => {
                    if self.reference(line.number, label, normalize_label(label)) {
                        i = close + 1;
                    } else {
                        // Plain bracketed text, e.g. a task list box.
                        i += 1;
                    }
                }
            }
        }
    }

    /// Record a reference link if `label_key` is defined.
    fn reference(&mut self, line: usize, text: &str, label_key: String) -> bool {
        let Some(def) = self.definitions.get(&label_key) else {
            return false;
        };
        let target = def.target.clone();
        self.used.insert(label_key.clone());
        self.push(line, text, target, LinkForm::Reference { label: label_key });
        true
    }

    fn push(&mut self, line: usize, text: &str, raw: String, form: LinkForm) {
        self.scan.links.push(Link {
            line,
            text: text.to_string(),
            target: LinkTarget::parse(&raw),
            raw,
            form,
        });
    }

    fn malformed(&mut self, line: usize, reason: impl Into<String>) {
        self.scan.malformed.push(MalformedLink {
            line,
            reason: reason.into(),
        });
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Find the `]` matching the `[` at `open`, honoring nesting.
fn find_closing_bracket(masked: &[u8], open: usize, end: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, &b) in masked[open..end].iter().enumerate() {
        match b {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Find the `)` closing the destination that starts at `open`.
///
/// Parentheses inside the destination must balance; a destination wrapped in
/// `<...>` may contain anything but `>`.
fn find_closing_paren(masked: &[u8], open: usize, end: usize) -> Option<usize> {
    let mut i = open + 1;
    while i < end && masked[i] == b' ' {
        i += 1;
    }
    if i < end && masked[i] == b'<' {
        i += masked[i..end].iter().position(|&b| b == b'>')? + 1;
    }

    let mut depth = 1usize;
    let mut quote: Option<u8> = None;
    while i < end {
        let b = masked[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' if masked[i - 1] == b' ' => quote = Some(b'"'),
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// Split a raw destination into its target, dropping angle brackets and any
/// link title.
///
/// Unquoted spaces stay part of the target, so `[x](my file.md)` points at
/// `my file.md`.
fn parse_destination(inner: &str) -> String {
    let inner = inner.trim();
    if let Some(rest) = inner.strip_prefix('<') {
        return rest
            .split_once('>')
            .map_or(rest, |(target, _)| target)
            .trim()
            .to_string();
    }
    strip_title(inner).to_string()
}

/// Drop a trailing `"title"`, `'title'` or `(title)` separated by whitespace.
fn strip_title(inner: &str) -> &str {
    let open = match inner.chars().last() {
        Some('"') => '"',
        Some('\'') => '\'',
        Some(')') => '(',
        _ => return inner,
    };
    let body = &inner[..inner.len() - 1];
    match body.rfind(open) {
        Some(pos) if body[..pos].ends_with(char::is_whitespace) => body[..pos].trim_end(),
        _ => inner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(scan: &LinkScan) -> Vec<&str> {
        scan.links.iter().map(|l| l.raw.as_str()).collect()
    }

    #[test]
    fn test_extract_anchor_link() {
        let scan = extract_links("See [Installation](#installation) for details.");

        assert_eq!(scan.links.len(), 1);
        assert_eq!(scan.links[0].text, "Installation");
        assert_eq!(scan.links[0].line, 1);
        assert_eq!(
            scan.links[0].target,
            LinkTarget::Anchor("installation".to_string())
        );
    }

    #[test]
    fn test_extract_relative_file_link_with_anchor() {
        let scan = extract_links("intro\n\nSee [usage guide](../guide.md#usage) here.");

        assert_eq!(scan.links.len(), 1);
        assert_eq!(scan.links[0].line, 3);
        assert_eq!(
            scan.links[0].target,
            LinkTarget::Path {
                path: "../guide.md".to_string(),
                fragment: Some("usage".to_string()),
            }
        );
    }

    #[test]
    fn test_link_types_correctly_classified() {
        let md = r#"
[anchor](#section)
[external](https://example.com)
[mail](mailto:team@example.com)
[file](./docs/api.md)
[query](./docs/api.md?plain=1#L4)
![diagram](img/flow%20chart.png)
"#;
        let scan = extract_links(md);
        assert_eq!(scan.links.len(), 6);

        assert!(matches!(&scan.links[0].target, LinkTarget::Anchor(a) if a == "section"));
        assert!(matches!(&scan.links[1].target, LinkTarget::External(_)));
        assert!(matches!(&scan.links[2].target, LinkTarget::External(_)));
        assert!(matches!(
            &scan.links[3].target,
            LinkTarget::Path { path, fragment: None } if path == "./docs/api.md"
        ));
        assert!(matches!(
            &scan.links[4].target,
            LinkTarget::Path { path, fragment: Some(f) } if path == "./docs/api.md" && f == "L4"
        ));
        assert!(matches!(
            &scan.links[5].target,
            LinkTarget::Path { path, .. } if path == "img/flow chart.png"
        ));
        assert_eq!(scan.links[5].form, LinkForm::Image);
    }

    #[test]
    fn test_links_excluded_from_code_blocks() {
        let md = r#"
[Valid](https://example.com) outside.

```markdown
[Fake](https://fake.com) inside code
```

[Also Valid](./file.md) after.
"#;
        let scan = extract_links(md);
        assert_eq!(targets(&scan), vec!["https://example.com", "./file.md"]);
    }

    #[test]
    fn test_links_excluded_from_inline_code() {
        let scan = extract_links("This is `[not](a.md)` but [this](b.md) is.");
        assert_eq!(targets(&scan), vec!["b.md"]);
    }

    #[test]
    fn test_escaped_brackets_are_not_links() {
        let scan = extract_links(r"\[not](a.md) text");
        assert!(scan.links.is_empty());
        assert!(scan.malformed.is_empty());
    }

    #[test]
    fn test_destination_with_title_and_angles() {
        let scan = extract_links(r#"[a](b.md "Title") and [c](<my file.md>)"#);
        assert_eq!(targets(&scan), vec!["b.md", "my file.md"]);
    }

    #[test]
    fn test_unquoted_spaces_stay_in_destination() {
        let scan = extract_links(
            "[x](my file.md) [y](my file.md 'Notes') [z](a.md (paren title)) [w](b.md \"T\")",
        );
        assert_eq!(
            targets(&scan),
            vec!["my file.md", "my file.md", "a.md", "b.md"]
        );
    }

    #[test]
    fn test_balanced_parens_in_destination() {
        let scan = extract_links("[wiki](https://en.wikipedia.org/wiki/Rust_(language)) done");
        assert_eq!(
            targets(&scan),
            vec!["https://en.wikipedia.org/wiki/Rust_(language)"]
        );
    }

    #[test]
    fn test_nested_badge_links() {
        let scan = extract_links("[![ci](badge.svg)](ci.md)");
        assert_eq!(scan.links.len(), 2);
        let raws: HashSet<&str> = targets(&scan).into_iter().collect();
        assert!(raws.contains("badge.svg"));
        assert!(raws.contains("ci.md"));
    }

    #[test]
    fn test_reference_links() {
        let md = r#"
Read the [guide][g], the [Setup][] notes and [faq].

[g]: ./guide.md
[setup]: ./setup.md#install "Install"
[FAQ]: <./faq.md>
"#;
        let scan = extract_links(md);
        assert!(scan.malformed.is_empty());
        assert_eq!(targets(&scan), vec!["./guide.md", "./setup.md#install", "./faq.md"]);
        assert!(scan.links.iter().all(|l| l.line == 2));
        assert_eq!(
            scan.links[0].form,
            LinkForm::Reference {
                label: "g".to_string()
            }
        );
    }

    #[test]
    fn test_unused_definition_is_checked_at_its_line() {
        let md = "# Title\n\n[orphan]: ./gone.md\n";
        let scan = extract_links(md);
        assert_eq!(scan.links.len(), 1);
        assert_eq!(scan.links[0].line, 3);
        assert!(matches!(scan.links[0].form, LinkForm::Definition { .. }));
    }

    #[test]
    fn test_undefined_full_reference_is_plain_text() {
        let scan = extract_links("See [docs][missing] and matrix[i][j] here.");
        assert!(scan.links.is_empty());
        assert!(scan.malformed.is_empty());
    }

    #[test]
    fn test_undefined_full_reference_falls_back_to_shortcut() {
        let scan = extract_links("See [guide][nope].\n\n[guide]: ./guide.md\n");
        assert_eq!(targets(&scan), vec!["./guide.md"]);
        assert_eq!(scan.links[0].line, 1);
    }

    #[test]
    fn test_task_boxes_and_footnotes_are_not_links() {
        let scan = extract_links("- [ ] todo\n- [x] done\nClaim[^1].\n\n[^1]: note");
        assert!(scan.links.is_empty());
        assert!(scan.malformed.is_empty());
    }

    #[test]
    fn test_missing_closing_paren_is_malformed() {
        let md = "Broken [link](./a.md\nNext [ok](./b.md)";
        let scan = extract_links(md);
        assert_eq!(scan.malformed.len(), 1);
        assert_eq!(scan.malformed[0].line, 1);
        assert!(scan.malformed[0].reason.contains("closing parenthesis"));
        assert_eq!(targets(&scan), vec!["./b.md"]);
    }

    #[test]
    fn test_unbalanced_bracket_is_malformed() {
        let scan = extract_links("Oops [unclosed [inner](./a.md) tail");
        assert_eq!(scan.malformed.len(), 1);
        assert_eq!(scan.malformed[0].line, 1);
        assert_eq!(targets(&scan), vec!["./a.md"]);
    }

    #[test]
    fn test_empty_target_is_malformed() {
        let scan = extract_links("[nothing]()");
        assert!(scan.links.is_empty());
        assert_eq!(scan.malformed.len(), 1);
    }

    #[test]
    fn test_empty_content() {
        let scan = extract_links("");
        assert!(scan.links.is_empty());
        assert!(scan.malformed.is_empty());
    }

    #[test]
    fn test_target_as_str() {
        let target = LinkTarget::parse("a.md#b");
        assert_eq!(target.as_str(), "a.md#b");
        assert_eq!(LinkTarget::parse("#x").as_str(), "#x");
    }
}
