use clap::{ArgAction, Parser, ValueEnum};
use mdlinkcheck::config::Overrides;
use mdlinkcheck::pipeline::RunOptions;
use mdlinkcheck::report::ReportFormat;
use std::path::PathBuf;

#[cfg(feature = "unstable-dynamic")]
use clap_complete::engine::{ArgValueCompleter, CompletionCandidate, ValueCompleter};

#[derive(Parser, Debug)]
#[command(name = "mdlinkcheck")]
#[command(version)]
#[command(about = "Check links and anchors across a markdown corpus")]
#[command(
    long_about = "mdlinkcheck - Link and anchor integrity checker for interlinked markdown.\n\n\
    Scans every markdown file under the root, resolves each relative link and #fragment\n\
    against the files and headings actually present, and reports what does not resolve.\n\
    Tables of contents are compared against the headings they list.\n\n\
    Exit status: 0 when clean, 1 when issues were found, 2 on configuration errors.\n\n\
    Examples:\n  \
    mdlinkcheck                              # Check the current directory\n  \
    mdlinkcheck --root docs --format json    # JSON report for docs/\n  \
    mdlinkcheck --ignore 'node_modules/**'   # Skip vendored files\n  \
    mdlinkcheck --check-external             # Also request http(s) links"
)]
pub struct Cli {
    /// Corpus root directory
    ///
    /// Every markdown file below it is checked; links resolve against its tree
    /// and a leading '/' in a link means this directory.
    #[arg(long, value_name = "PATH", default_value = ".", add = root_dir_completer())]
    pub root: PathBuf,

    /// Glob of root-relative paths to skip (repeatable)
    ///
    /// Ignored files are neither checked nor valid link targets.
    ///
    /// Example: --ignore 'node_modules/**' --ignore 'drafts/*.md'
    #[arg(long, value_name = "GLOB")]
    pub ignore: Vec<String>,

    /// Report format [default: text]
    ///
    ///   text - `<file>:<line>: [<kind>] <detail>` lines and a summary
    ///   json - An array of issue objects
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Request every http(s) link and report failures
    #[arg(long = "check-external")]
    pub check_external: bool,

    /// Check tables of contents against headings [default: true]
    #[arg(
        long = "toc-check",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    pub toc_check: Option<bool>,

    /// Skip table of contents checks
    #[arg(long = "no-toc-check", conflicts_with = "toc_check")]
    pub no_toc_check: bool,

    /// Config file to use instead of the usual lookup
    ///
    /// Without it, <root>/.mdlinkcheck.toml is used if present, then the
    /// user config file, then built-in defaults.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Worker threads for parsing and validation [default: available cores]
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    Text,
    /// JSON output
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => ReportFormat::Text,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

impl Cli {
    /// Log filter directive for the requested verbosity, or `None` to defer
    /// to `RUST_LOG`.
    pub fn log_level(&self) -> Option<&'static str> {
        match (self.quiet, self.verbose) {
            (true, _) => Some("error"),
            (false, 0) => None,
            (false, 1) => Some("info"),
            (false, 2) => Some("debug"),
            (false, _) => Some("trace"),
        }
    }

    pub fn run_options(&self) -> RunOptions {
        let toc_check = if self.no_toc_check {
            Some(false)
        } else {
            self.toc_check
        };
        RunOptions {
            root: self.root.clone(),
            config_path: self.config.clone(),
            overrides: Overrides {
                ignore: self.ignore.clone(),
                format: self.format.map(ReportFormat::from),
                check_external: self.check_external,
                toc_check,
                jobs: self.jobs,
            },
        }
    }
}

#[cfg(feature = "unstable-dynamic")]
fn root_dir_completer() -> ArgValueCompleter {
    use std::ffi::OsStr;
    use std::path::Path;

    struct DirCompleter;

    impl ValueCompleter for DirCompleter {
        fn complete(&self, current: &OsStr) -> Vec<CompletionCandidate> {
            // e.g. "../docs/gu" -> search "../docs" for entries starting with "gu"
            let input_str = current.to_string_lossy();
            let input_path = Path::new(input_str.as_ref());

            let (search_dir, prefix) = if input_str.is_empty() {
                (Path::new("."), String::new())
            } else if input_str.ends_with('/') || input_str.ends_with('\\') {
                (input_path, String::new())
            } else {
                // parent() is Some("") for bare names
                let parent = input_path.parent().unwrap_or(Path::new("."));
                let parent = if parent.as_os_str().is_empty() {
                    Path::new(".")
                } else {
                    parent
                };
                let prefix = input_path
                    .file_name()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                (parent, prefix)
            };

            let Ok(entries) = std::fs::read_dir(search_dir) else {
                return vec![];
            };

            let mut candidates: Vec<_> = entries
                .filter_map(Result::ok)
                .filter(|entry| entry.path().is_dir())
                .filter_map(|entry| {
                    let name = entry.file_name().to_string_lossy().to_string();
                    if !name.to_lowercase().starts_with(&prefix.to_lowercase()) {
                        return None;
                    }
                    let mut value = if search_dir == Path::new(".") {
                        name
                    } else {
                        search_dir.join(&name).to_string_lossy().to_string()
                    };
                    value.push('/');
                    Some(value)
                })
                .collect();
            candidates.sort();
            candidates
                .into_iter()
                .map(|value| CompletionCandidate::new(value).help(Some("directory".into())))
                .collect()
        }
    }

    ArgValueCompleter::new(DirCompleter)
}

#[cfg(not(feature = "unstable-dynamic"))]
fn root_dir_completer() -> clap::builder::ValueHint {
    clap::ValueHint::DirPath
}
