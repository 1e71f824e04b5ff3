//! Link, fragment and table of contents validation.
//!
//! Runs after the corpus index is complete. Each document is checked
//! independently, so the work spreads over the worker pool with the index
//! shared by reference.

pub mod fragment;
pub mod toc;

use crate::corpus::CorpusIndex;
use crate::parser::{Document, LinkTarget};
use crate::pool::map_ordered;
use crate::report::{IssueKind, ValidationIssue};
use crate::resolve::{Resolution, resolve};
use std::collections::HashSet;
use tracing::debug;

pub use fragment::{check_fragment, closest_anchor, levenshtein_distance};
pub use toc::check_toc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Check tables of contents against headings
    pub toc: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self { toc: true }
    }
}

/// Validate every document in the index on `workers` threads.
pub fn validate_corpus(
    index: &CorpusIndex,
    options: ValidateOptions,
    workers: usize,
) -> Vec<ValidationIssue> {
    let documents: Vec<&Document> = index.documents().collect();
    let issues: Vec<ValidationIssue> = map_ordered(&documents, workers, |doc| {
        validate_document(index, doc, options)
    })
    .into_iter()
    .flatten()
    .collect();
    debug!(documents = documents.len(), issues = issues.len(), "validation finished");
    issues
}

/// All internal issues of one document.
pub fn validate_document(
    index: &CorpusIndex,
    doc: &Document,
    options: ValidateOptions,
) -> Vec<ValidationIssue> {
    let mut issues: Vec<ValidationIssue> = doc
        .malformed
        .iter()
        .map(|m| ValidationIssue::new(IssueKind::MalformedLink, &doc.path, m.line, &m.reason))
        .collect();

    // Entries the drift check already covers.
    let toc_entries: HashSet<(usize, &str)> = match (&doc.toc, options.toc) {
        (Some(toc), true) => toc
            .entries
            .iter()
            .map(|e| (e.line, e.fragment.as_str()))
            .collect(),
        _ => HashSet::new(),
    };

    for link in &doc.links {
        match &link.target {
            LinkTarget::External(_) => {}
            LinkTarget::Anchor(fragment) => {
                if toc_entries.contains(&(link.line, fragment.as_str())) {
                    continue;
                }
                if let Some(problem) = check_fragment(doc, fragment, "this document") {
                    issues.push(
                        ValidationIssue::new(
                            IssueKind::MissingAnchor,
                            &doc.path,
                            link.line,
                            format!("link to `{}`: {}", link.raw, problem),
                        )
                        .with_target(&doc.path),
                    );
                }
            }
            LinkTarget::Path { path, fragment } => match resolve(index, &doc.path, path) {
                Resolution::Document(target) => {
                    let Some(fragment) = fragment else { continue };
                    let place = if target.path == doc.path {
                        "this document".to_string()
                    } else {
                        format!("`{}`", index.relative(&target.path))
                    };
                    if let Some(problem) = check_fragment(target, fragment, &place) {
                        issues.push(
                            ValidationIssue::new(
                                IssueKind::MissingAnchor,
                                &doc.path,
                                link.line,
                                format!("link to `{}`: {}", link.raw, problem),
                            )
                            .with_target(&target.path),
                        );
                    }
                }
                Resolution::File(_) => {}
                Resolution::Missing { path, reason } => {
                    let issue = ValidationIssue::new(
                        IssueKind::MissingFile,
                        &doc.path,
                        link.line,
                        format!("link to `{}`: {}", link.raw, reason.describe(index)),
                    );
                    issues.push(match path {
                        Some(path) => issue.with_target(path),
                        None => issue,
                    });
                }
            },
        }
    }

    if options.toc {
        issues.extend(check_toc(doc));
    }
    issues
}
