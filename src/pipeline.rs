//! The run state machine.
//!
//! `Idle -> Discovering -> Parsing -> Indexing -> Validating -> Reporting ->
//! Done`. Stages only move forward. A fatal error ends the run at `Done` and
//! carries the stage it happened in.

use crate::config::{Config, Overrides};
use crate::corpus::{CorpusIndex, parse_all};
use crate::discovery::discover;
use crate::error::{CheckError, Stage, StageError};
use crate::external::check_external;
use crate::report::{Report, RunStats};
use crate::validate::{ValidateOptions, validate_corpus};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

/// What to check and how.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub root: PathBuf,
    /// Explicit config file; otherwise the usual lookup applies
    pub config_path: Option<PathBuf>,
    pub overrides: Overrides,
}

impl RunOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config_path: None,
            overrides: Overrides::default(),
        }
    }
}

/// A finished run.
#[derive(Debug)]
pub struct Outcome {
    pub report: Report,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        self.report.exit_code()
    }
}

#[derive(Debug)]
pub struct Pipeline {
    options: RunOptions,
    stage: Stage,
}

impl Pipeline {
    pub fn new(options: RunOptions) -> Self {
        Self {
            options,
            stage: Stage::Idle,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn enter(&mut self, next: Stage) {
        debug_assert!(next > self.stage, "stage {} cannot follow {}", next, self.stage);
        debug!(from = %self.stage, to = %next, "stage transition");
        self.stage = next;
    }

    fn fail(&mut self, source: CheckError) -> StageError {
        let err = StageError::new(self.stage, source);
        self.stage = Stage::Done;
        err
    }

    /// Run every stage and write the rendered report to `out` in one write.
    ///
    /// # Errors
    ///
    /// Configuration problems and a failed write are fatal; everything found
    /// in the corpus ends up in the report instead.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<Outcome, StageError> {
        self.enter(Stage::Discovering);
        let mut config = Config::load(self.options.config_path.as_deref(), &self.options.root)
            .map_err(|e| self.fail(e))?;
        config
            .apply(&self.options.overrides)
            .map_err(|e| self.fail(e))?;
        let discovery = discover(&self.options.root, &config).map_err(|e| self.fail(e))?;
        let mut skipped = discovery.warnings.len();
        let workers = config.worker_count();

        self.enter(Stage::Parsing);
        let (documents, parse_warnings) = parse_all(&discovery, &config.parse_options(), workers);
        skipped += parse_warnings.len();

        self.enter(Stage::Indexing);
        let index = CorpusIndex::new(discovery, documents, &config.index_files);

        self.enter(Stage::Validating);
        let mut issues = validate_corpus(
            &index,
            ValidateOptions {
                toc: config.toc.enabled,
            },
            workers,
        );
        if config.external.enabled {
            issues.extend(check_external(&index, &config.external));
        }
        let stats = RunStats {
            files: index.len(),
            links: index.documents().map(|d| d.links.len()).sum(),
            skipped,
        };

        self.enter(Stage::Reporting);
        let report = Report::new(index.root(), issues, stats);
        let rendered = report
            .render(config.output.format)
            .map_err(|e| self.fail(e))?;
        out.write_all(rendered.as_bytes())
            .and_then(|()| out.flush())
            .map_err(|e| self.fail(CheckError::Output(e)))?;
        info!(
            files = stats.files,
            links = stats.links,
            issues = report.len(),
            skipped,
            "check finished"
        );

        self.enter(Stage::Done);
        Ok(Outcome { report })
    }
}

/// Check the corpus described by `options`, writing the report to `out`.
pub fn run<W: Write>(options: RunOptions, out: &mut W) -> Result<Outcome, StageError> {
    Pipeline::new(options).run(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{IssueKind, ReportFormat};
    use std::fs;
    use std::path::Path;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn options(root: &Path) -> RunOptions {
        let mut options = RunOptions::new(root);
        // Keep a stray user config file out of the picture.
        options.config_path = Some(root.join(crate::config::ROOT_CONFIG_FILE));
        options
    }

    fn corpus() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), crate::config::ROOT_CONFIG_FILE, "");
        write(
            dir.path(),
            "experiences/foo/architecture.md",
            "# Architecture\n\n## Contents\n\n- [Design](#design)\n\n## Design\n\nSee [options](../../facets/testing/options.md#contents).\n",
        );
        write(dir.path(), "facets/testing/options.md", "# Options\n\n## Flags\n");
        dir
    }

    #[test]
    fn test_full_run() {
        let dir = corpus();
        let mut pipeline = Pipeline::new(options(dir.path()));
        let mut out = Vec::new();
        let outcome = pipeline.run(&mut out).unwrap();

        assert_eq!(pipeline.stage(), Stage::Done);
        assert_eq!(outcome.exit_code(), 1);
        let issues: Vec<_> = outcome.report.issues().collect();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::MissingAnchor);
        assert_eq!(issues[0].line, 9);

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("experiences/foo/architecture.md:9: [missing-anchor] "));
        assert!(text.ends_with("Checked 2 files, 2 links: 1 issue (missing-anchor: 1)\n"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_counted_in_summary() {
        use std::os::unix::fs::PermissionsExt;

        let dir = corpus();
        let locked = dir.path().join("locked.md");
        write(dir.path(), "locked.md", "# Locked\n");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        let denied = fs::read(&locked).is_err();

        let mut out = Vec::new();
        let outcome = run(options(dir.path()), &mut out).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

        let text = String::from_utf8(out).unwrap();
        if denied {
            assert_eq!(outcome.report.stats().skipped, 1);
            assert!(text.ends_with("(1 unreadable path skipped): 1 issue (missing-anchor: 1)\n"));
        } else {
            assert_eq!(outcome.report.stats().skipped, 0);
        }
    }

    #[test]
    fn test_runs_are_byte_identical() {
        let dir = corpus();
        let render = || {
            let mut out = Vec::new();
            run(options(dir.path()), &mut out).unwrap();
            out
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn test_json_override() {
        let dir = corpus();
        let mut options = options(dir.path());
        options.overrides.format = Some(ReportFormat::Json);
        let mut out = Vec::new();
        run(options, &mut out).unwrap();
        let rows: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(rows[0]["kind"], "missing-anchor");
        assert_eq!(rows[0]["file"], "experiences/foo/architecture.md");
    }

    #[test]
    fn test_missing_root_fails_in_discovery() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = RunOptions::new(dir.path().join("nope"));
        options.config_path = None;
        let mut pipeline = Pipeline::new(options);
        let err = pipeline.run(&mut Vec::new()).unwrap_err();
        assert_eq!(err.stage, Stage::Discovering);
        assert!(matches!(err.source, CheckError::RootNotFound(_)));
        assert_eq!(pipeline.stage(), Stage::Done);
    }

    #[test]
    fn test_bad_glob_is_fatal() {
        let dir = corpus();
        let mut options = options(dir.path());
        options.overrides.ignore = vec!["[".to_string()];
        let err = run(options, &mut Vec::new()).unwrap_err();
        assert!(err.to_string().starts_with("discovering failed: invalid ignore pattern"));
    }
}
