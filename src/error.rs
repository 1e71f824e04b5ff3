//! Fatal errors.
//!
//! Only configuration problems abort a run. Everything found while scanning
//! the corpus is an issue in the report instead.

use std::path::PathBuf;
use strum::Display;
use thiserror::Error;

/// Pipeline stages, in the only order they can be entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    Idle,
    Discovering,
    Parsing,
    Indexing,
    Validating,
    Reporting,
    Done,
}

/// A configuration or environment problem that stops the run.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("root path does not exist: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("root path is not a directory: {}", .0.display())]
    RootNotDirectory(PathBuf),

    #[error("cannot resolve root path {}: {source}", .path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid ignore pattern {pattern:?}: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("failed to read config file {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to render report: {0}")]
    Render(#[from] serde_json::Error),

    #[error("failed to write report: {0}")]
    Output(#[from] std::io::Error),
}

/// A [`CheckError`] tagged with the stage that was running when it occurred.
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: CheckError,
}

impl StageError {
    pub fn new(stage: Stage, source: CheckError) -> Self {
        Self { stage, source }
    }
}

pub type Result<T, E = CheckError> = std::result::Result<T, E>;
