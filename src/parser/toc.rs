//! Table of contents extraction.
//!
//! A document declares a table of contents by placing anchor links under a
//! heading named "Contents" (or another configured marker). Every same-file
//! anchor link between that heading and the next one is an entry.

use super::document::{Heading, Toc, TocEntry};
use super::links::{Link, LinkForm, LinkTarget};
use super::utils::strip_markdown_inline;

/// Locate the table of contents among `headings` and collect its entries.
///
/// Marker matching ignores case and inline formatting. Only the first
/// matching heading counts.
pub fn extract_toc(headings: &[Heading], links: &[Link], markers: &[String]) -> Option<Toc> {
    let index = headings.iter().position(|h| is_marker(&h.text, markers))?;
    let start = headings[index].line;
    let end = headings
        .get(index + 1)
        .map_or(usize::MAX, |next| next.line);

    let entries = links
        .iter()
        .filter(|l| l.line > start && l.line < end)
        .filter(|l| matches!(l.form, LinkForm::Inline | LinkForm::Reference { .. }))
        .filter_map(|l| match &l.target {
            LinkTarget::Anchor(fragment) => Some(TocEntry {
                text: l.text.clone(),
                fragment: fragment.clone(),
                line: l.line,
            }),
            _ => None,
        })
        .collect();

    Some(Toc {
        heading: index,
        entries,
    })
}

fn is_marker(text: &str, markers: &[String]) -> bool {
    let visible = strip_markdown_inline(text);
    let visible = visible.trim();
    markers.iter().any(|m| m.eq_ignore_ascii_case(visible))
}
