//! The cross-reference index over every parsed document.
//!
//! Built once after all files are parsed and shared read-only by every
//! validation worker.

use crate::discovery::{Discovery, DiscoveryWarning};
use crate::parser::{Document, ParseOptions, parse_file};
use crate::pool::map_ordered;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Parse every discovered markdown file on `workers` threads.
///
/// Files that cannot be read are left out and returned as warnings.
pub fn parse_all(
    discovery: &Discovery,
    options: &ParseOptions,
    workers: usize,
) -> (Vec<Document>, Vec<DiscoveryWarning>) {
    let parsed = map_ordered(&discovery.markdown, workers, |path| {
        parse_file(path, options).map_err(|err| DiscoveryWarning {
            path: path.clone(),
            message: err.to_string(),
        })
    });

    let mut documents = Vec::with_capacity(parsed.len());
    let mut warnings = Vec::new();
    for result in parsed {
        match result {
            Ok(doc) => documents.push(doc),
            Err(warning) => {
                warn!(path = %warning.path.display(), error = %warning.message, "skipping unreadable file");
                warnings.push(warning);
            }
        }
    }
    (documents, warnings)
}

#[derive(Debug, Clone)]
pub struct CorpusIndex {
    root: PathBuf,
    documents: BTreeMap<PathBuf, Document>,
    files: BTreeSet<PathBuf>,
    dirs: BTreeSet<PathBuf>,
    index_files: Vec<String>,
}

impl CorpusIndex {
    /// Assemble the index from the discovered tree and the parsed documents.
    pub fn new(discovery: Discovery, documents: Vec<Document>, index_files: &[String]) -> Self {
        let documents: BTreeMap<PathBuf, Document> = documents
            .into_iter()
            .map(|doc| (doc.path.clone(), doc))
            .collect();
        debug!(
            documents = documents.len(),
            files = discovery.files.len(),
            dirs = discovery.dirs.len(),
            "corpus indexed"
        );
        Self {
            root: discovery.root,
            documents,
            files: discovery.files,
            dirs: discovery.dirs,
            index_files: index_files.to_vec(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn document(&self, path: &Path) -> Option<&Document> {
        self.documents.get(path)
    }

    /// Documents in path order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn is_file(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    pub fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }

    /// File names a directory link falls back to, in order of preference.
    pub fn index_files(&self) -> &[String] {
        &self.index_files
    }

    /// Root-relative display form of `path`.
    pub fn relative(&self, path: &Path) -> String {
        crate::discovery::relative_display(&self.root, path)
    }

    /// Build an index from in-memory documents, keyed by root-relative path.
    /// Extra non-markdown files may be listed too.
    #[cfg(test)]
    pub(crate) fn from_sources(root: &Path, sources: &[(&str, &str)], other_files: &[&str]) -> Self {
        let mut discovery = Discovery {
            root: root.to_path_buf(),
            ..Default::default()
        };
        discovery.dirs.insert(root.to_path_buf());

        let mut documents = Vec::new();
        for (rel, content) in sources {
            let path = root.join(rel);
            documents.push(crate::parser::parse_markdown(content).with_path(&path));
            discovery.markdown.push(path);
        }
        for path in discovery.markdown.clone().into_iter().chain(other_files.iter().map(|rel| root.join(rel))) {
            for ancestor in path.ancestors().skip(1) {
                if !ancestor.starts_with(root) {
                    break;
                }
                discovery.dirs.insert(ancestor.to_path_buf());
            }
            discovery.files.insert(path);
        }
        Self::new(
            discovery,
            documents,
            &["README.md".to_string(), "index.md".to_string()],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::discovery::discover;
    use std::fs;

    #[test]
    fn test_parse_all_and_index() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("README.md"), "# Readme\n[docs](docs/guide.md)\n").unwrap();
        fs::write(dir.path().join("docs/guide.md"), "# Guide\n## Setup\n").unwrap();
        fs::write(dir.path().join("docs/diagram.png"), [0u8, 1, 2]).unwrap();

        let config = Config::default();
        let discovery = discover(dir.path(), &config).unwrap();
        let (documents, warnings) = parse_all(&discovery, &config.parse_options(), 4);
        assert!(warnings.is_empty());
        assert_eq!(documents.len(), 2);

        let index = CorpusIndex::new(discovery, documents, &config.index_files);
        let root = index.root().to_path_buf();
        let guide = index.document(&root.join("docs/guide.md")).unwrap();
        assert!(guide.has_anchor("setup"));
        assert!(index.is_file(&root.join("docs/diagram.png")));
        assert!(index.document(&root.join("docs/diagram.png")).is_none());
        assert!(index.is_dir(&root.join("docs")));

        let order: Vec<_> = index.documents().map(|d| index.relative(&d.path)).collect();
        assert_eq!(order, vec!["README.md", "docs/guide.md"]);
    }

    #[test]
    fn test_from_sources_registers_parent_dirs() {
        let root = Path::new("/corpus");
        let index = CorpusIndex::from_sources(root, &[("a/b/c.md", "# C")], &["img/x.png"]);
        assert!(index.is_dir(Path::new("/corpus")));
        assert!(index.is_dir(Path::new("/corpus/a/b")));
        assert!(index.is_dir(Path::new("/corpus/img")));
        assert!(!index.is_dir(Path::new("/")));
        assert!(index.is_file(Path::new("/corpus/img/x.png")));
        assert_eq!(index.len(), 1);
    }
}
