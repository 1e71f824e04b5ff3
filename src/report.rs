//! Issue collection and rendering.
//!
//! A [`Report`] owns every issue of a run in a fixed order: by root-relative
//! file path, then line, kind and detail. Rendering produces the complete
//! output as one string so the caller can emit it with a single write.

use crate::discovery::relative_display;
use crate::error::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use strum::{AsRefStr, Display, EnumIter, IntoEnumIterator};

/// Output format of the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// `<file>:<line>: [<kind>] <detail>` lines and a summary
    #[default]
    Text,
    /// A JSON array of issue objects
    Json,
}

/// Every kind of problem the checker reports.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Display,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum IssueKind {
    MissingFile,
    MissingAnchor,
    MalformedLink,
    TocDriftMissing,
    TocDriftExtra,
    BrokenExternal,
    ExternalUnreachable,
}

/// One problem found in one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    /// Absolute path of the document containing the problem
    pub file: PathBuf,
    /// 1-based line
    pub line: usize,
    pub detail: String,
    /// Resolved absolute target path, for internal links that got that far
    pub target: Option<PathBuf>,
}

impl ValidationIssue {
    pub fn new(kind: IssueKind, file: &Path, line: usize, detail: impl Into<String>) -> Self {
        Self {
            kind,
            file: file.to_path_buf(),
            line,
            detail: detail.into(),
            target: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<PathBuf>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// Corpus totals shown in the summary line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub files: usize,
    pub links: usize,
    /// Paths left out because they could not be read
    pub skipped: usize,
}

/// The sorted issues of one run.
#[derive(Debug, Clone)]
pub struct Report {
    root: PathBuf,
    issues: Vec<(String, ValidationIssue)>,
    stats: RunStats,
}

#[derive(Serialize)]
struct JsonIssue<'a> {
    file: &'a str,
    line: usize,
    kind: IssueKind,
    detail: &'a str,
    path: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<&'a Path>,
}

impl Report {
    pub fn new(root: &Path, issues: Vec<ValidationIssue>, stats: RunStats) -> Self {
        let mut issues: Vec<(String, ValidationIssue)> = issues
            .into_iter()
            .map(|issue| (relative_display(root, &issue.file), issue))
            .collect();
        issues.sort_by(|(a_file, a), (b_file, b)| {
            a_file
                .cmp(b_file)
                .then(a.line.cmp(&b.line))
                .then(a.kind.cmp(&b.kind))
                .then_with(|| a.detail.cmp(&b.detail))
        });
        Self {
            root: root.to_path_buf(),
            issues,
            stats,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().map(|(_, issue)| issue)
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Per-kind counts in kind order, kinds with no issues omitted.
    pub fn summary(&self) -> IndexMap<IssueKind, usize> {
        IssueKind::iter()
            .map(|kind| (kind, self.issues().filter(|i| i.kind == kind).count()))
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    /// Process exit code: 0 when clean, 1 when anything was found.
    pub fn exit_code(&self) -> i32 {
        if self.is_empty() { 0 } else { 1 }
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(self.render_text()),
            ReportFormat::Json => self.render_json(),
        }
    }

    fn render_text(&self) -> String {
        let mut out = String::new();
        let mut current: Option<&str> = None;
        for (file, issue) in &self.issues {
            if current.is_some_and(|c| c != file) {
                out.push('\n');
            }
            current = Some(file);
            let _ = writeln!(out, "{}:{}: [{}] {}", file, issue.line, issue.kind, issue.detail);
        }
        if !self.issues.is_empty() {
            out.push('\n');
        }

        let files = plural(self.stats.files, "file", "files");
        let mut links = plural(self.stats.links, "link", "links");
        if self.stats.skipped > 0 {
            let skipped = plural(self.stats.skipped, "unreadable path", "unreadable paths");
            let _ = write!(links, " ({skipped} skipped)");
        }
        if self.issues.is_empty() {
            let _ = writeln!(out, "Checked {files}, {links}: no issues");
        } else {
            let counts = self
                .summary()
                .iter()
                .map(|(kind, count)| format!("{kind}: {count}"))
                .collect::<Vec<_>>()
                .join(", ");
            let issues = plural(self.issues.len(), "issue", "issues");
            let _ = writeln!(out, "Checked {files}, {links}: {issues} ({counts})");
        }
        out
    }

    fn render_json(&self) -> Result<String> {
        let rows: Vec<JsonIssue<'_>> = self
            .issues
            .iter()
            .map(|(file, issue)| JsonIssue {
                file,
                line: issue.line,
                kind: issue.kind,
                detail: &issue.detail,
                path: &issue.file,
                target: issue.target.as_deref(),
            })
            .collect();
        let mut out = serde_json::to_string_pretty(&rows)?;
        out.push('\n');
        Ok(out)
    }
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{count} {one}")
    } else {
        format!("{count} {many}")
    }
}
