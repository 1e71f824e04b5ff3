//! Table of contents drift detection.
//!
//! Compared headings are every heading except level 1 and the Contents
//! heading itself, at any depth.

use super::fragment::closest;
use crate::parser::{Document, Heading};
use crate::report::{IssueKind, ValidationIssue};
use std::collections::HashSet;

pub fn check_toc(doc: &Document) -> Vec<ValidationIssue> {
    let Some(toc) = &doc.toc else {
        return Vec::new();
    };

    let listed: HashSet<&str> = toc.entries.iter().map(|e| e.fragment.as_str()).collect();
    let compared: Vec<&Heading> = doc
        .headings
        .iter()
        .enumerate()
        .filter(|(i, h)| *i != toc.heading && h.level > 1 && !h.slug.is_empty())
        .map(|(_, h)| h)
        .collect();

    let mut issues = Vec::new();
    for heading in &compared {
        if !listed.contains(heading.slug.as_str()) {
            issues.push(ValidationIssue::new(
                IssueKind::TocDriftMissing,
                &doc.path,
                heading.line,
                format!(
                    "heading `{}` (`#{}`) is not listed in the table of contents",
                    heading.text, heading.slug
                ),
            ));
        }
    }

    for entry in &toc.entries {
        if doc.find_heading_by_slug(&entry.fragment).is_some() {
            continue;
        }
        let hint = closest(compared.iter().map(|h| h.slug.as_str()), &entry.fragment)
            .map(|slug| format!(" (closest: `#{slug}`)"))
            .unwrap_or_default();
        issues.push(ValidationIssue::new(
            IssueKind::TocDriftExtra,
            &doc.path,
            entry.line,
            format!(
                "table of contents entry `{}` (`#{}`) matches no heading{}",
                entry.text, entry.fragment, hint
            ),
        ));
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_markdown;

    fn kinds_and_lines(issues: &[ValidationIssue]) -> Vec<(IssueKind, usize)> {
        issues.iter().map(|i| (i.kind, i.line)).collect()
    }

    #[test]
    fn test_in_sync() {
        let md = "# Guide\n## Contents\n- [Install](#install)\n- [Usage](#usage)\n## Install\n## Usage\n";
        assert!(check_toc(&parse_markdown(md)).is_empty());
    }

    #[test]
    fn test_missing_and_extra() {
        let md = "\
# Guide
## Contents
- [Install](#install)
- [Removed](#removed)
## Install
## Deploy
";
        let issues = check_toc(&parse_markdown(md));
        assert_eq!(
            kinds_and_lines(&issues),
            vec![(IssueKind::TocDriftMissing, 6), (IssueKind::TocDriftExtra, 4)]
        );
        assert!(issues[0].detail.contains("`Deploy`"));
        assert!(issues[1].detail.contains("`#removed`"));
    }

    #[test]
    fn test_unlisted_subheading_is_missing() {
        let shallow = "# G\n## Contents\n- [A](#a)\n## A\n### Unlisted\n";
        let issues = check_toc(&parse_markdown(shallow));
        assert_eq!(kinds_and_lines(&issues), vec![(IssueKind::TocDriftMissing, 5)]);
        assert!(issues[0].detail.contains("`Unlisted`"));

        let deep = "# G\n## Contents\n- [A](#a)\n  - [Detail](#detail)\n## A\n### Detail\n### Other\n";
        let issues = check_toc(&parse_markdown(deep));
        assert_eq!(kinds_and_lines(&issues), vec![(IssueKind::TocDriftMissing, 7)]);
    }

    #[test]
    fn test_no_toc_no_issues() {
        assert!(check_toc(&parse_markdown("# A\n## B\n")).is_empty());
    }

    #[test]
    fn test_entry_for_level_one_heading_is_not_extra() {
        let md = "# Guide\n## Contents\n- [Guide](#guide)\n- [A](#a)\n## A\n";
        assert!(check_toc(&parse_markdown(md)).is_empty());
    }
}
