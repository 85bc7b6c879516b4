//! CLI entrypoint for the sanitizer.
//!
//! The upload server shells out to this binary and relays stdout/stderr and
//! the exit code back to the caller, so exit codes are part of the contract:
//!
//! - `0`: success, every row matched the header
//! - `1`: source not found, or a filesystem failure
//! - `2`: header detection failed across all parse strategies
//! - `3`: completed, but malformed rows remained after recovery

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};

use report_sanitizer::recovery::observability::{
    CompositeObserver, FileObserver, SanitizeObserver, StdErrObserver,
};
use report_sanitizer::report::{run_report, ReportJob};
use report_sanitizer::types::ReportKind;
use report_sanitizer::SanitizeError;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReportArg {
    Payments,
    Registrations,
    Media,
}

impl ReportArg {
    fn kind(self) -> ReportKind {
        match self {
            Self::Payments => ReportKind::Payments,
            Self::Registrations => ReportKind::Registrations,
            Self::Media => ReportKind::Media,
        }
    }

    fn default_source(self) -> &'static str {
        match self {
            Self::Payments => "tmp_paste.csv",
            Self::Registrations => "tmp_registrations.csv",
            Self::Media => "tmp_media.csv",
        }
    }
}

#[derive(Parser)]
#[command(name = "sanitize-report")]
#[command(about = "Recover and normalize a raw CSV report export")]
#[command(version)]
struct Cli {
    /// Report variant to sanitize
    #[arg(value_enum)]
    report: ReportArg,

    /// Path of the raw CSV export (defaults to the variant's tmp file)
    source: Option<PathBuf>,

    /// Directory holding the canonical cleaned outputs
    #[arg(long, default_value = "public")]
    data_dir: PathBuf,

    /// Directory for raw backups and duplicates files [default: <data-dir>/raw]
    #[arg(long)]
    raw_dir: Option<PathBuf>,

    /// Explicit delimiter override (',' or ';'); auto-detected when absent
    #[arg(long, value_parser = parse_delimiter)]
    delimiter: Option<char>,

    /// Compute and report everything, but write nothing
    #[arg(long)]
    dry_run: bool,

    /// Append JSON-lines diagnostics to this file, in addition to stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Only the two delimiters the recovery pipeline understands are accepted.
fn parse_delimiter(s: &str) -> Result<char, String> {
    match s {
        "," => Ok(','),
        ";" => Ok(';'),
        other => Err(format!("invalid delimiter {other:?}: expected ',' or ';'")),
    }
}

fn main() {
    let cli = Cli::parse();

    let observer: Arc<dyn SanitizeObserver> = match &cli.log_file {
        Some(path) => Arc::new(CompositeObserver::new(vec![
            Arc::new(StdErrObserver),
            Arc::new(FileObserver::new(path)),
        ])),
        None => Arc::new(StdErrObserver),
    };

    let source = cli
        .source
        .unwrap_or_else(|| PathBuf::from(cli.report.default_source()));

    let mut job = ReportJob::new(cli.report.kind(), source);
    job.data_dir = cli.data_dir;
    job.raw_dir = cli.raw_dir;
    job.delimiter = cli.delimiter;
    job.dry_run = cli.dry_run;
    job.observer = Some(observer);

    match run_report(&job) {
        Ok(outcome) => {
            if cli.dry_run {
                println!("dry-run: would write {}", outcome.dest.display());
            } else {
                println!("wrote {}", outcome.dest.display());
            }
            println!("  rows parsed:    {}", outcome.stats.rows_parsed);
            println!("  malformed rows: {}", outcome.stats.malformed_rows);
            println!(
                "  existing: {}  added: {}  duplicates: {}",
                outcome.stats.existing_rows,
                outcome.stats.added_rows,
                outcome.stats.duplicate_rows
            );
            std::process::exit(outcome.exit_code());
        }
        Err(err) => {
            // The observer has already narrated the failure to stderr.
            let code = match err {
                SanitizeError::SourceNotFound { .. } => 1,
                SanitizeError::HeaderDetection => 2,
                _ => 1,
            };
            std::process::exit(code);
        }
    }
}
