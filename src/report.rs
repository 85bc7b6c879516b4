//! Per-report orchestration: one source file in, one canonical table out.
//!
//! [`run_report`] wires the whole batch together in the original upload
//! flow's order: existence check, verbatim raw backup, recovery pipeline,
//! per-variant policy (amount coercion, snapshot dedupe), duplicates file,
//! then backup-and-replace of the canonical destination. Each invocation is
//! a pure function of the source file plus the prior snapshot on disk.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::dedupe::{select_dedupe_key, split_by_key, split_by_media_key, DedupeSplit};
use crate::error::{SanitizeError, SanitizeResult};
use crate::recovery::numeric::coerce_amount_column;
use crate::recovery::observability::{ReportStats, RunContext, SanitizeObserver, Severity};
use crate::recovery::parse::{recover, RecoveryOptions};
use crate::snapshot::{
    read_snapshot, replace_canonical, unix_millis, write_duplicates, write_raw_backup,
};
use crate::types::{Diagnostics, ParsedTable, ReportKind, Row};

/// A sanitizer run to execute.
#[derive(Clone)]
pub struct ReportJob {
    /// Which report variant the source feeds.
    pub kind: ReportKind,
    /// Path of the raw uploaded CSV.
    pub source: PathBuf,
    /// Directory holding the canonical outputs (the dashboard's data dir).
    pub data_dir: PathBuf,
    /// Directory for raw backups and duplicates files.
    /// Defaults to `<data_dir>/raw`.
    pub raw_dir: Option<PathBuf>,
    /// Explicit delimiter override; auto-detected when `None`.
    pub delimiter: Option<char>,
    /// Compute and report everything, but write nothing.
    pub dry_run: bool,
    /// Optional observer for diagnostics and alerts.
    pub observer: Option<Arc<dyn SanitizeObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: Severity,
}

impl ReportJob {
    /// Create a job with the default layout (`public/` data dir, `public/raw`
    /// backups, auto-detected delimiter).
    pub fn new(kind: ReportKind, source: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            source: source.into(),
            data_dir: PathBuf::from("public"),
            raw_dir: None,
            delimiter: None,
            dry_run: false,
            observer: None,
            alert_at_or_above: Severity::Critical,
        }
    }

    fn raw_dir(&self) -> PathBuf {
        self.raw_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("raw"))
    }
}

impl fmt::Debug for ReportJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportJob")
            .field("kind", &self.kind)
            .field("source", &self.source)
            .field("data_dir", &self.data_dir)
            .field("raw_dir", &self.raw_dir)
            .field("delimiter", &self.delimiter)
            .field("dry_run", &self.dry_run)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    /// Canonical destination path.
    pub dest: PathBuf,
    /// Timestamped copy of the untouched input (`None` on dry runs).
    pub raw_backup: Option<PathBuf>,
    /// Timestamped backup of the prior canonical file, when one existed.
    pub canonical_backup: Option<PathBuf>,
    /// Duplicates file, when the registrations variant hit collisions.
    pub duplicates_file: Option<PathBuf>,
    /// Run summary stats.
    pub stats: ReportStats,
    /// Diagnostics from the recovery pipeline.
    pub diagnostics: Diagnostics,
}

impl ReportOutcome {
    /// Completion signal for the invoking process: `0` when every row matched
    /// the header, `3` when malformed rows remained (recovered best-effort
    /// but never silently swallowed).
    pub fn exit_code(&self) -> i32 {
        if self.stats.malformed_rows > 0 { 3 } else { 0 }
    }
}

/// Severity of a failed run, used for observer alert thresholds.
pub fn severity_for_error(e: &SanitizeError) -> Severity {
    match e {
        SanitizeError::Io(_) | SanitizeError::Write { .. } => Severity::Critical,
        SanitizeError::Csv(err) => match err.kind() {
            csv::ErrorKind::Io(_) => Severity::Critical,
            _ => Severity::Error,
        },
        SanitizeError::SourceNotFound { .. } => Severity::Error,
        SanitizeError::HeaderDetection => Severity::Error,
    }
}

/// Run a sanitizer job end to end.
///
/// On failure the observer (if any) receives `on_failure`, plus `on_alert`
/// when the severity meets the job's threshold. On completion it receives
/// `on_success` with the run stats, even when malformed rows remained; the
/// caller decides how to surface [`ReportOutcome::exit_code`].
pub fn run_report(job: &ReportJob) -> SanitizeResult<ReportOutcome> {
    let ctx = RunContext {
        source: job.source.clone(),
        report: job.kind,
    };

    let result = run_inner(job, &ctx);
    if let Some(obs) = job.observer.as_ref() {
        match &result {
            Ok(outcome) => obs.on_success(&ctx, outcome.stats),
            Err(e) => {
                let sev = severity_for_error(e);
                obs.on_failure(&ctx, sev, e);
                if sev >= job.alert_at_or_above {
                    obs.on_alert(&ctx, sev, e);
                }
            }
        }
    }
    result
}

fn progress(job: &ReportJob, ctx: &RunContext, message: &str) {
    if let Some(obs) = job.observer.as_ref() {
        obs.on_progress(ctx, message);
    }
}

/// Rebuild rows against a (possibly different) canonical column list, so the
/// merged output keeps a single key set.
fn conform_rows(rows: Vec<Row>, columns: &[String]) -> Vec<Row> {
    rows.into_iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| (c.clone(), row.get(c).cloned().unwrap_or_default()))
                .collect()
        })
        .collect()
}

fn run_inner(job: &ReportJob, ctx: &RunContext) -> SanitizeResult<ReportOutcome> {
    if !job.source.exists() {
        return Err(SanitizeError::SourceNotFound {
            path: job.source.clone(),
        });
    }
    let bytes = fs::read(&job.source)?;

    let timestamp = unix_millis();
    let raw_dir = job.raw_dir();
    let prefix = job.kind.raw_prefix();

    // Raw backup of the verbatim input, before any normalization.
    let raw_backup = if job.dry_run {
        progress(job, ctx, "dry-run: skipping raw backup");
        None
    } else {
        let path = write_raw_backup(&raw_dir, prefix, timestamp, &bytes)?;
        progress(job, ctx, &format!("saved raw backup to {}", path.display()));
        Some(path)
    };

    let text = String::from_utf8_lossy(&bytes);
    let recovery = recover(&text, &RecoveryOptions {
        delimiter: job.delimiter,
    })?;
    let mut table = recovery.table;
    let diagnostics = recovery.diagnostics;

    progress(
        job,
        ctx,
        &format!("detected delimiter {:?}", diagnostics.delimiter),
    );
    progress(
        job,
        ctx,
        &format!("detected fields: {}", diagnostics.columns.join(", ")),
    );
    if !diagnostics.is_clean() {
        progress(
            job,
            ctx,
            &format!(
                "malformed rows (field count mismatch): {} sample={:?}",
                diagnostics.malformed_count, diagnostics.malformed_sample
            ),
        );
    }

    if job.kind == ReportKind::Payments {
        match coerce_amount_column(&mut table) {
            Some(column) => progress(job, ctx, &format!("coerced amount column '{column}'")),
            None => progress(job, ctx, "no obvious payment amount field detected"),
        }
    }

    let dest = job.data_dir.join(job.kind.dest_file_name());

    // Prior snapshot, for the dedupe variants. A snapshot that exists but
    // fails to parse degrades to "no snapshot" with a warning.
    let existing = match job.kind {
        ReportKind::Payments => None,
        ReportKind::Registrations | ReportKind::Media => {
            if dest.exists() {
                let snap = read_snapshot(&dest);
                if snap.is_none() {
                    progress(job, ctx, "failed to parse existing output for dedupe; treating all rows as new");
                }
                snap
            } else {
                None
            }
        }
    };
    let existing_rows = existing.as_ref().map_or(0, ParsedTable::row_count);

    let (final_table, split, duplicates_file) = match job.kind {
        ReportKind::Payments => {
            let added = table.rows.len();
            (
                table,
                DedupeSplit {
                    additions: Vec::with_capacity(added),
                    duplicates: Vec::new(),
                },
                None,
            )
        }
        ReportKind::Registrations => {
            let key = select_dedupe_key(&table.columns).unwrap_or_default().to_string();
            progress(job, ctx, &format!("dedupe key: '{key}'"));
            let split = split_by_key(existing.as_ref(), &table.rows, &key);

            let duplicates_file = if split.duplicates.is_empty() || job.dry_run {
                None
            } else {
                let dup_table =
                    ParsedTable::new(table.columns.clone(), split.duplicates.clone());
                let path = write_duplicates(&raw_dir, prefix, timestamp, &dup_table)?;
                progress(job, ctx, &format!("wrote duplicates to {}", path.display()));
                Some(path)
            };

            let merged = merge_with_existing(existing, &table.columns, split.additions.clone());
            (merged, split, duplicates_file)
        }
        ReportKind::Media => {
            let split = split_by_media_key(existing.as_ref(), &table.rows, &table.columns);
            let merged = merge_with_existing(existing, &table.columns, split.additions.clone());
            (merged, split, None)
        }
    };

    let stats = ReportStats {
        rows_parsed: diagnostics.rows_parsed,
        malformed_rows: diagnostics.malformed_count,
        existing_rows,
        added_rows: match job.kind {
            ReportKind::Payments => diagnostics.rows_parsed,
            _ => split.additions.len(),
        },
        duplicate_rows: split.duplicates.len(),
        recovery_path: diagnostics.recovery_path,
    };

    if job.dry_run {
        progress(
            job,
            ctx,
            &format!(
                "dry-run summary: existing={} parsed={} to_add={} duplicates={}",
                stats.existing_rows, stats.rows_parsed, stats.added_rows, stats.duplicate_rows
            ),
        );
        return Ok(ReportOutcome {
            dest,
            raw_backup,
            canonical_backup: None,
            duplicates_file: None,
            stats,
            diagnostics,
        });
    }

    let canonical_backup = replace_canonical(&dest, &final_table, timestamp)?;
    if let Some(bak) = &canonical_backup {
        progress(
            job,
            ctx,
            &format!("backed up existing {} -> {}", dest.display(), bak.display()),
        );
    }
    progress(job, ctx, &format!("wrote cleaned CSV to {}", dest.display()));

    Ok(ReportOutcome {
        dest,
        raw_backup,
        canonical_backup,
        duplicates_file,
        stats,
        diagnostics,
    })
}

/// Existing snapshot rows first (untouched, their column list wins), then the
/// new additions conformed onto that column list.
fn merge_with_existing(
    existing: Option<ParsedTable>,
    new_columns: &[String],
    additions: Vec<Row>,
) -> ParsedTable {
    match existing {
        Some(mut snapshot) if !snapshot.columns.is_empty() => {
            let conformed = conform_rows(additions, &snapshot.columns);
            snapshot.rows.extend(conformed);
            snapshot
        }
        _ => ParsedTable::new(new_columns.to_vec(), additions),
    }
}
