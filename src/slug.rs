//! Heading anchor slug generation.
//!
//! Reproduces the anchors the documentation is viewed with: the heading's
//! visible text is lowercased, punctuation is removed, whitespace runs become
//! single hyphens, and repeated headings are numbered in order of appearance.

use crate::parser::utils::strip_markdown_inline;
use std::collections::{HashMap, HashSet};

/// Generate the base anchor slug for a heading.
///
/// Characters other than letters, digits, underscores, whitespace and hyphens
/// are dropped before whitespace is collapsed, so `"API Design & REST"` becomes
/// `api-design-rest` rather than `api-design--rest`.
///
/// # Examples
///
/// ```
/// use mdlinkcheck::slug::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("API Design & REST"), "api-design-rest");
/// assert_eq!(slugify("**Step 1:** Install"), "step-1-install");
/// ```
pub fn slugify(text: &str) -> String {
    let visible = strip_markdown_inline(text.trim());

    let mut slug = String::with_capacity(visible.len());
    let mut pending_gap = false;
    for c in visible.to_lowercase().chars() {
        if c.is_whitespace() {
            pending_gap = true;
        } else if c.is_alphanumeric() || c == '_' || c == '-' {
            if pending_gap && !slug.is_empty() {
                slug.push('-');
            }
            pending_gap = false;
            slug.push(c);
        }
    }

    slug.trim_matches('-').to_string()
}

/// Assigns document-unique slugs in order of appearance.
///
/// The first heading with a given base slug keeps it unchanged; later ones get
/// `-1`, `-2`, and so on. A suffixed candidate that is already taken (for
/// example by a heading literally named "Overview 1") keeps counting upward.
#[derive(Debug, Default)]
pub struct SlugCounter {
    occurrences: HashMap<String, usize>,
    taken: HashSet<String>,
}

impl SlugCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the unique slug for the next heading with `base`.
    ///
    /// Empty base slugs are returned unchanged and never reserved; a heading
    /// made only of punctuation has no anchor.
    pub fn assign(&mut self, base: &str) -> String {
        if base.is_empty() {
            return String::new();
        }

        let count = self.occurrences.entry(base.to_string()).or_insert(0);
        let mut candidate = if *count == 0 {
            base.to_string()
        } else {
            format!("{}-{}", base, count)
        };
        while self.taken.contains(&candidate) {
            *count += 1;
            candidate = format!("{}-{}", base, count);
        }
        *count += 1;

        self.taken.insert(candidate.clone());
        candidate
    }
}
