//! # mdlinkcheck
//!
//! Link and anchor integrity checker for interlinked markdown corpora.
//!
//! ## Usage
//!
//! Check the current directory:
//! ```sh
//! mdlinkcheck
//! ```
//!
//! JSON report for a docs tree, skipping vendored files:
//! ```sh
//! mdlinkcheck --root docs --ignore 'node_modules/**' --format json
//! ```

mod cli;

use clap::Parser as ClapParser;
use cli::Cli;
use color_eyre::Result;
use std::io::Write;
use std::process;
use tracing_subscriber::EnvFilter;

/// Configuration and other fatal errors.
const EXIT_FATAL: i32 = 2;

fn main() -> Result<()> {
    color_eyre::install()?;

    // Handle dynamic shell completions
    #[cfg(feature = "unstable-dynamic")]
    clap_complete::CompleteEnv::with_factory(|| {
        use clap::CommandFactory;
        Cli::command()
    })
    .complete();

    let args = Cli::parse();
    init_logging(&args);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match mdlinkcheck::run(args.run_options(), &mut out) {
        Ok(outcome) => {
            drop(out);
            process::exit(outcome.exit_code());
        }
        Err(err) => {
            let _ = out.flush();
            drop(out);
            eprintln!("mdlinkcheck: {err}");
            process::exit(EXIT_FATAL);
        }
    }
}

/// Logs go to stderr so stdout carries only the report.
fn init_logging(args: &Cli) {
    let filter = match args.log_level() {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
