use super::links::{Link, MalformedLink};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;

/// A heading with its derived, document-unique anchor slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    /// Heading level (1-6)
    pub level: usize,
    /// Heading text as written, without the `#` markers
    pub text: String,
    /// 1-based line number
    pub line: usize,
    /// Anchor slug; empty when the text has no sluggable characters
    pub slug: String,
}

/// One link listed in a document's table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub text: String,
    pub fragment: String,
    pub line: usize,
}

/// A document's declared table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toc {
    /// Index into [`Document::headings`] of the "Contents" heading
    pub heading: usize,
    pub entries: Vec<TocEntry>,
}

/// A parsed markdown document.
///
/// Built once during the parse phase and never modified afterwards.
#[derive(Debug, Clone)]
pub struct Document {
    /// Normalized absolute path (empty for documents parsed from a string)
    pub path: PathBuf,
    /// Raw file content
    pub content: String,
    /// Headings in document order
    pub headings: Vec<Heading>,
    /// Links in line order
    pub links: Vec<Link>,
    /// Table of contents, when the document declares one
    pub toc: Option<Toc>,
    /// Link syntax the parser could not make sense of
    pub malformed: Vec<MalformedLink>,
    anchors: Vec<String>,
    anchor_set: HashSet<String>,
}

impl Document {
    pub(crate) fn new(
        content: String,
        headings: Vec<Heading>,
        explicit_anchors: Vec<String>,
        links: Vec<Link>,
        toc: Option<Toc>,
        malformed: Vec<MalformedLink>,
    ) -> Self {
        let mut anchors = Vec::new();
        let mut anchor_set = HashSet::new();
        let heading_slugs = headings.iter().map(|h| h.slug.clone());
        for anchor in heading_slugs.chain(explicit_anchors) {
            if !anchor.is_empty() && anchor_set.insert(anchor.clone()) {
                anchors.push(anchor);
            }
        }

        Self {
            path: PathBuf::new(),
            content,
            headings,
            links,
            toc,
            malformed,
            anchors,
            anchor_set,
        }
    }

    /// Attach the document's identity.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Whether `fragment` names an anchor in this document.
    pub fn has_anchor(&self, fragment: &str) -> bool {
        self.anchor_set.contains(fragment)
    }

    /// All anchors in document order: heading slugs first, then explicit
    /// HTML anchors.
    pub fn anchors(&self) -> &[String] {
        &self.anchors
    }

    /// Find the heading that owns `slug`.
    pub fn find_heading_by_slug(&self, slug: &str) -> Option<&Heading> {
        self.headings.iter().find(|h| h.slug == slug)
    }

    /// The "Contents" heading, if the document declares a table of contents.
    pub fn toc_heading(&self) -> Option<&Heading> {
        self.toc.as_ref().and_then(|toc| self.headings.get(toc.heading))
    }
}
