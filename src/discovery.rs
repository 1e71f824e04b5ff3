//! Corpus file discovery.
//!
//! Walks the root with `walkdir` in file-name order. Directory symlinks are
//! followed at most once: every traversed directory's real path is recorded,
//! and a directory whose real path was already visited (an alias, or a cycle
//! back to an ancestor) is pruned. Symlinked directories are walked only after
//! the regular tree, so real locations win over aliases.

use crate::config::Config;
use crate::error::{CheckError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::{BTreeSet, HashSet};
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Directory names never descended into.
const ALWAYS_SKIPPED: &[&str] = &[".git"];

/// A path that could not be read; the walk carried on without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryWarning {
    pub path: PathBuf,
    pub message: String,
}

/// Everything found under the root.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Canonical corpus root
    pub root: PathBuf,
    /// Markdown files, sorted and deduplicated
    pub markdown: Vec<PathBuf>,
    /// Every non-ignored file, markdown or not
    pub files: BTreeSet<PathBuf>,
    /// Every traversed directory, the root included
    pub dirs: BTreeSet<PathBuf>,
    pub warnings: Vec<DiscoveryWarning>,
}

/// Compiled ignore patterns, matched against root-relative `/`-separated paths.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    set: GlobSet,
}

impl IgnoreRules {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|source| CheckError::InvalidGlob {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|source| CheckError::InvalidGlob {
            pattern: patterns.join(", "),
            source,
        })?;
        Ok(Self { set })
    }

    pub fn is_ignored(&self, relative: &str) -> bool {
        self.set.is_match(relative)
    }
}

/// Resolve and check the corpus root.
pub fn resolve_root(root: &Path) -> Result<PathBuf> {
    let canonical = fs::canonicalize(root).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => CheckError::RootNotFound(root.to_path_buf()),
        _ => CheckError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        },
    })?;
    if !canonical.is_dir() {
        return Err(CheckError::RootNotDirectory(root.to_path_buf()));
    }
    Ok(canonical)
}

/// Walk `root` and collect the corpus.
///
/// # Errors
///
/// Fails only when the root is missing, not a directory, or an ignore pattern
/// does not compile. Unreadable subpaths become warnings.
pub fn discover(root: &Path, config: &Config) -> Result<Discovery> {
    let root = resolve_root(root)?;
    let ignore = IgnoreRules::new(&config.ignore)?;

    let mut discovery = Discovery {
        root: root.clone(),
        ..Default::default()
    };
    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut symlinked: Vec<PathBuf> = Vec::new();

    let walker = WalkDir::new(&root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| keep_entry(entry, &root, &ignore, &mut visited));
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                discovery.warn_walk(&root, &err);
                continue;
            }
        };
        if !entry.path_is_symlink() {
            discovery.add(entry, config);
            continue;
        }
        match fs::metadata(entry.path()) {
            Ok(meta) if meta.is_dir() => symlinked.push(entry.into_path()),
            Ok(meta) if meta.is_file() => discovery.add_file(entry.into_path(), config),
            Ok(_) => {}
            Err(err) => discovery.warn(entry.path(), &err),
        }
    }

    for link in symlinked {
        let walker = WalkDir::new(&link)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| keep_entry(entry, &root, &ignore, &mut visited));
        for entry in walker {
            match entry {
                Ok(entry) => discovery.add(entry, config),
                Err(err) => discovery.warn_walk(&link, &err),
            }
        }
    }

    discovery.markdown.sort();
    discovery.markdown.dedup();
    debug!(
        markdown = discovery.markdown.len(),
        files = discovery.files.len(),
        warnings = discovery.warnings.len(),
        "discovery finished"
    );
    Ok(discovery)
}

/// Prune `.git`, ignored paths and directories whose real path was already
/// walked.
fn keep_entry(
    entry: &DirEntry,
    root: &Path,
    ignore: &IgnoreRules,
    visited: &mut HashSet<PathBuf>,
) -> bool {
    if entry.depth() > 0 {
        if ALWAYS_SKIPPED.iter().any(|skip| entry.file_name() == *skip) {
            return false;
        }
        let relative = relative_display(root, entry.path());
        if ignore.is_ignored(&relative) {
            debug!(path = %relative, "ignored");
            return false;
        }
    }
    if !entry.file_type().is_dir() {
        return true;
    }
    match fs::canonicalize(entry.path()) {
        Ok(real) => {
            let first = visited.insert(real);
            if !first {
                debug!(path = %entry.path().display(), "directory already visited, skipping");
            }
            first
        }
        // Let the walk itself report the unreadable directory.
        Err(_) => true,
    }
}

impl Discovery {
    fn add(&mut self, entry: DirEntry, config: &Config) {
        let file_type = entry.file_type();
        if file_type.is_dir() {
            self.dirs.insert(entry.into_path());
        } else if file_type.is_file() {
            self.add_file(entry.into_path(), config);
        }
    }

    fn add_file(&mut self, path: PathBuf, config: &Config) {
        if config.is_markdown(&path) {
            self.markdown.push(path.clone());
        }
        self.files.insert(path);
    }

    fn warn_walk(&mut self, fallback: &Path, err: &walkdir::Error) {
        self.warn(err.path().unwrap_or(fallback), err);
    }

    fn warn(&mut self, path: &Path, err: &impl Display) {
        warn!(path = %path.display(), error = %err, "skipping unreadable path");
        self.warnings.push(DiscoveryWarning {
            path: path.to_path_buf(),
            message: err.to_string(),
        });
    }

    /// Root-relative, `/`-separated form of `path` for display.
    pub fn relative(&self, path: &Path) -> String {
        relative_display(&self.root, path)
    }
}

/// Root-relative, `/`-separated form of `path`; falls back to the full path
/// when it lies outside `root`.
pub fn relative_display(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.display().to_string(),
    }
}
