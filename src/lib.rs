//! # mdlinkcheck
//!
//! Link and anchor integrity checking for interlinked markdown corpora.
//!
//! The checker walks a directory tree, parses every markdown file into its
//! headings, anchors and links, and reports every link that does not resolve
//! to an existing file or heading anchor. Documents that declare a table of
//! contents are also checked for drift against their actual headings.
//!
//! ## Features
//!
//! - Heading slugs with appearance-order duplicate suffixes
//! - Relative, root-absolute and directory links, images and reference links
//! - "Did you mean" hints for missing anchors
//! - Table of contents drift detection
//! - Optional reachability checks for http(s) links
//! - Deterministic text or JSON reports
//!
//! ## Example
//!
//! ```rust
//! use mdlinkcheck::parse_markdown;
//!
//! let doc = parse_markdown("# Guide\n## Overview\n## Overview\n[up](#guide)\n");
//! let slugs: Vec<_> = doc.headings.iter().map(|h| h.slug.as_str()).collect();
//! assert_eq!(slugs, ["guide", "overview", "overview-1"]);
//! assert!(doc.has_anchor("guide"));
//! ```

/// Configuration file loading and command-line overrides.
pub mod config;

/// Indexed view of every parsed document, shared during validation.
pub mod corpus;

/// Corpus file discovery.
pub mod discovery;

/// Fatal errors and pipeline stages.
pub mod error;

/// Optional http(s) reachability checks.
pub mod external;

/// Parser module for markdown documents.
///
/// Provides functions to parse markdown files and content into structured documents.
pub mod parser;

/// Stage-by-stage orchestration of a run.
pub mod pipeline;

mod pool;

/// Issue kinds, ordering and rendering.
pub mod report;

/// Link target resolution.
pub mod resolve;

/// Heading slugs.
pub mod slug;

/// Link, anchor and table of contents validation.
pub mod validate;

// Re-export commonly used types for convenience
pub use config::Config;
pub use error::{CheckError, Stage, StageError};
pub use parser::{Document, Heading, parse_file, parse_markdown};
pub use pipeline::{Outcome, RunOptions, run};
pub use report::{IssueKind, Report, ReportFormat, ValidationIssue};
pub use slug::slugify;
