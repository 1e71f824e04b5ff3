use crate::error::{CheckError, Result};
use crate::parser::ParseOptions;
use crate::report::ReportFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the per-corpus config file looked up in the root directory.
pub const ROOT_CONFIG_FILE: &str = ".mdlinkcheck.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Glob patterns (relative to the root) excluded from discovery
    #[serde(default)]
    pub ignore: Vec<String>,

    /// File extensions treated as markdown
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Files a directory link resolves to, in order of preference
    #[serde(default = "default_index_files")]
    pub index_files: Vec<String>,

    /// Worker threads for parsing and validation (default: available cores)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,

    #[serde(default)]
    pub toc: TocConfig,

    #[serde(default)]
    pub external: ExternalConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Table of contents drift detection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TocConfig {
    #[serde(default = "default_toc_enabled")]
    pub enabled: bool,

    /// Heading texts that introduce a table of contents (case-insensitive)
    #[serde(default = "default_toc_headings")]
    pub headings: Vec<String>,
}

impl Default for TocConfig {
    fn default() -> Self {
        Self {
            enabled: default_toc_enabled(),
            headings: default_toc_headings(),
        }
    }
}

/// Best-effort reachability checks for http(s) links
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of requests in flight
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: ReportFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ignore: Vec::new(),
            extensions: default_extensions(),
            index_files: default_index_files(),
            jobs: None,
            toc: TocConfig::default(),
            external: ExternalConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["md".to_string(), "markdown".to_string()]
}

fn default_index_files() -> Vec<String> {
    vec!["README.md".to_string(), "index.md".to_string()]
}

fn default_toc_enabled() -> bool {
    true
}

fn default_toc_headings() -> Vec<String> {
    vec!["Contents".to_string(), "Table of Contents".to_string()]
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_concurrency() -> usize {
    8
}

/// Command-line settings layered over whatever config file was loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    /// Added to the configured ignore patterns
    pub ignore: Vec<String>,
    pub format: Option<ReportFormat>,
    /// Turns external checks on; never turns them off
    pub check_external: bool,
    pub toc_check: Option<bool>,
    pub jobs: Option<usize>,
}

impl Config {
    /// Get the platform-specific user config file path
    /// - macOS: ~/Library/Application Support/mdlinkcheck/config.toml
    /// - Linux: ~/.config/mdlinkcheck/config.toml
    /// - Windows: %APPDATA%/mdlinkcheck/config.toml
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("mdlinkcheck").join("config.toml"))
    }

    /// Load the configuration for a run over `root`.
    ///
    /// Lookup order: the explicit path, `<root>/.mdlinkcheck.toml`, the user
    /// config file, then built-in defaults. The first file found is used as a
    /// whole; files are not merged.
    pub fn load(explicit: Option<&Path>, root: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let root_config = root.join(ROOT_CONFIG_FILE);
        if root_config.is_file() {
            return Self::from_file(&root_config);
        }

        match Self::config_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Read and validate one config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| CheckError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&contents).map_err(|source| CheckError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides and re-check the result.
    pub fn apply(&mut self, overrides: &Overrides) -> Result<()> {
        self.ignore.extend(overrides.ignore.iter().cloned());
        if let Some(format) = overrides.format {
            self.output.format = format;
        }
        if overrides.check_external {
            self.external.enabled = true;
        }
        if let Some(enabled) = overrides.toc_check {
            self.toc.enabled = enabled;
        }
        if overrides.jobs.is_some() {
            self.jobs = overrides.jobs;
        }
        self.validate()
    }

    /// Reject settings no run could work with.
    pub fn validate(&self) -> Result<()> {
        if self.extensions.is_empty() {
            return Err(CheckError::InvalidConfig(
                "at least one markdown extension is required".to_string(),
            ));
        }
        if self.external.concurrency == 0 {
            return Err(CheckError::InvalidConfig(
                "external.concurrency must be at least 1".to_string(),
            ));
        }
        if self.external.timeout_secs == 0 {
            return Err(CheckError::InvalidConfig(
                "external.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.jobs == Some(0) {
            return Err(CheckError::InvalidConfig("jobs must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Worker count for the parse and validate phases.
    pub fn worker_count(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Options handed to the document parser.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            toc_headings: self.toc.headings.clone(),
        }
    }

    /// Whether `path` has one of the configured markdown extensions.
    pub fn is_markdown(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}
