//! Observer hooks for run diagnostics.
//!
//! The report runner narrates everything the operator needs to review a
//! messy upload (detected delimiter, field list, malformed samples, backup
//! paths, dedupe summary) through a [`SanitizeObserver`], so callers can
//! route diagnostics to stderr, a log file, or both.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::error::SanitizeError;
use crate::types::{RecoveryPath, ReportKind};

/// Severity classification for failure callbacks and alert thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal, e.g. malformed rows remained).
    Warning,
    /// Error-level event (run failed).
    Error,
    /// Critical error (I/O or other infrastructure failures).
    Critical,
}

/// Context about one sanitizer run.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// The source file being sanitized.
    pub source: PathBuf,
    /// Which report variant this run feeds.
    pub report: ReportKind,
}

/// Summary stats reported on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportStats {
    /// Data rows recovered from the source.
    pub rows_parsed: usize,
    /// Rows whose field count never matched the header.
    pub malformed_rows: usize,
    /// Rows already present in the prior snapshot.
    pub existing_rows: usize,
    /// Newly appended rows.
    pub added_rows: usize,
    /// Rows skipped (or routed to the duplicates file) as dedupe collisions.
    pub duplicate_rows: usize,
    /// Which parse strategy produced the table.
    pub recovery_path: RecoveryPath,
}

/// Observer interface for sanitizer runs.
///
/// Implementors can record logs, metrics, or trigger alerts. All methods have
/// no-op defaults except `on_alert`, which forwards to `on_failure`.
pub trait SanitizeObserver: Send + Sync {
    /// Called for step-by-step progress diagnostics during a run.
    fn on_progress(&self, _ctx: &RunContext, _message: &str) {}

    /// Called when a run completes (malformed rows may still be present;
    /// check [`ReportStats::malformed_rows`]).
    fn on_success(&self, _ctx: &RunContext, _stats: ReportStats) {}

    /// Called when a run fails.
    fn on_failure(&self, _ctx: &RunContext, _severity: Severity, _error: &SanitizeError) {}

    /// Called when a failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &RunContext, severity: Severity, error: &SanitizeError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn SanitizeObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn SanitizeObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl SanitizeObserver for CompositeObserver {
    fn on_progress(&self, ctx: &RunContext, message: &str) {
        for o in &self.observers {
            o.on_progress(ctx, message);
        }
    }

    fn on_success(&self, ctx: &RunContext, stats: ReportStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &RunContext, severity: Severity, error: &SanitizeError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &RunContext, severity: Severity, error: &SanitizeError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Logs run events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl SanitizeObserver for StdErrObserver {
    fn on_progress(&self, ctx: &RunContext, message: &str) {
        eprintln!(
            "[sanitize][{:?}] {}: {}",
            ctx.report,
            ctx.source.display(),
            message
        );
    }

    fn on_success(&self, ctx: &RunContext, stats: ReportStats) {
        eprintln!(
            "[sanitize][{:?}][ok] {}: rows={} malformed={} added={} duplicates={} path={:?}",
            ctx.report,
            ctx.source.display(),
            stats.rows_parsed,
            stats.malformed_rows,
            stats.added_rows,
            stats.duplicate_rows,
            stats.recovery_path
        );
    }

    fn on_failure(&self, ctx: &RunContext, severity: Severity, error: &SanitizeError) {
        eprintln!(
            "[sanitize][{:?}][{:?}] {}: {}",
            ctx.report,
            severity,
            ctx.source.display(),
            error
        );
    }

    fn on_alert(&self, ctx: &RunContext, severity: Severity, error: &SanitizeError) {
        eprintln!(
            "[ALERT][sanitize][{:?}][{:?}] {}: {}",
            ctx.report,
            severity,
            ctx.source.display(),
            error
        );
    }
}

/// Appends run events to a local log file as JSON lines.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are
    /// ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append(&self, value: serde_json::Value) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{value}");
        }
    }
}

impl SanitizeObserver for FileObserver {
    fn on_progress(&self, ctx: &RunContext, message: &str) {
        self.append(serde_json::json!({
            "ts": unix_ts(),
            "event": "progress",
            "report": format!("{:?}", ctx.report),
            "source": ctx.source.display().to_string(),
            "message": message,
        }));
    }

    fn on_success(&self, ctx: &RunContext, stats: ReportStats) {
        self.append(serde_json::json!({
            "ts": unix_ts(),
            "event": "success",
            "report": format!("{:?}", ctx.report),
            "source": ctx.source.display().to_string(),
            "stats": stats,
        }));
    }

    fn on_failure(&self, ctx: &RunContext, severity: Severity, error: &SanitizeError) {
        self.append(serde_json::json!({
            "ts": unix_ts(),
            "event": "failure",
            "severity": format!("{severity:?}"),
            "report": format!("{:?}", ctx.report),
            "source": ctx.source.display().to_string(),
            "error": error.to_string(),
        }));
    }

    fn on_alert(&self, ctx: &RunContext, severity: Severity, error: &SanitizeError) {
        self.append(serde_json::json!({
            "ts": unix_ts(),
            "event": "alert",
            "severity": format!("{severity:?}"),
            "report": format!("{:?}", ctx.report),
            "source": ctx.source.display().to_string(),
            "error": error.to_string(),
        }));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
