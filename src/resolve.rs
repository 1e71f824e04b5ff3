//! Link target resolution against the corpus index.
//!
//! Paths are normalized lexically and looked up in the discovered tree; the
//! host filesystem is never consulted, so the outcome is the same on
//! case-insensitive filesystems and for paths that were ignored.

use crate::corpus::CorpusIndex;
use crate::parser::Document;
use std::path::{Path, PathBuf};

/// Where an internal link ends up.
#[derive(Debug, Clone)]
pub enum Resolution<'a> {
    /// A parsed markdown document whose anchors can be checked
    Document(&'a Document),
    /// An existing file that is not a parsed document
    File(PathBuf),
    /// Nothing usable at the target
    Missing {
        /// The normalized target, when it stays inside the root
        path: Option<PathBuf>,
        reason: MissingReason,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingReason {
    NotFound,
    EscapesRoot,
    NoIndexFile,
}

impl MissingReason {
    pub fn describe(&self, index: &CorpusIndex) -> String {
        match self {
            MissingReason::NotFound => "file not found".to_string(),
            MissingReason::EscapesRoot => "path escapes the corpus root".to_string(),
            MissingReason::NoIndexFile => format!(
                "directory has no index file ({})",
                index.index_files().join(", ")
            ),
        }
    }
}

/// Lexically resolve `target` relative to `source`'s directory.
///
/// A leading `/` anchors the path at the corpus root. Returns `None` when
/// `..` climbs above the root.
pub fn normalize(root: &Path, source: &Path, target: &str) -> Option<PathBuf> {
    let mut parts: Vec<&str> = Vec::new();
    if !target.starts_with('/') {
        let source_dir = source
            .parent()
            .and_then(|dir| dir.strip_prefix(root).ok())
            .unwrap_or(Path::new(""));
        for component in source_dir.components() {
            parts.push(component.as_os_str().to_str()?);
        }
    }

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            name => parts.push(name),
        }
    }

    let mut path = root.to_path_buf();
    path.extend(parts);
    Some(path)
}

/// Resolve the path part of a link written in `source`.
///
/// An empty path (`?x#frag`) refers to `source` itself.
pub fn resolve<'a>(index: &'a CorpusIndex, source: &Path, target: &str) -> Resolution<'a> {
    if target.is_empty() {
        return match index.document(source) {
            Some(doc) => Resolution::Document(doc),
            None => Resolution::File(source.to_path_buf()),
        };
    }

    let Some(path) = normalize(index.root(), source, target) else {
        return Resolution::Missing {
            path: None,
            reason: MissingReason::EscapesRoot,
        };
    };

    if let Some(doc) = index.document(&path) {
        return Resolution::Document(doc);
    }
    if index.is_file(&path) {
        return Resolution::File(path);
    }
    if index.is_dir(&path) {
        for name in index.index_files() {
            let candidate = path.join(name);
            if let Some(doc) = index.document(&candidate) {
                return Resolution::Document(doc);
            }
            if index.is_file(&candidate) {
                return Resolution::File(candidate);
            }
        }
        return Resolution::Missing {
            path: Some(path),
            reason: MissingReason::NoIndexFile,
        };
    }

    Resolution::Missing {
        path: Some(path),
        reason: MissingReason::NotFound,
    }
}
