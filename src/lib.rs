//! `report-sanitizer` cleans up messy, hand-exported CSV reports (payments,
//! registrations, media/traffic) into stable tables a dashboard can consume.
//!
//! The core is the [`recovery`] pipeline: BOM stripping, line-wise repair of
//! known export bugs, comma/semicolon detection, header normalization, and an
//! escalating parse ladder (direct → quote-rejoin → headerless fallback).
//! Every output row is rebuilt against the canonical header, so the row-shape
//! invariant holds by construction: a row's key set always equals the
//! canonical column list, and rows that could not be reconciled are remapped
//! best-effort and *counted*, never dropped.
//!
//! ## Quick example: recover a table from a raw blob
//!
//! ```rust
//! use report_sanitizer::recovery::{recover, RecoveryOptions};
//! use report_sanitizer::types::RecoveryPath;
//!
//! # fn main() -> Result<(), report_sanitizer::SanitizeError> {
//! // A record wrapped across two physical lines inside an open quote.
//! let raw = "\"ID\",\"Name\",\"Amount\"\n\"1\",\"Jo\nhn\",\"10,50\"\n";
//!
//! let recovered = recover(raw, &RecoveryOptions::default())?;
//! assert_eq!(recovered.table.row_count(), 1);
//! assert_eq!(recovered.table.value(0, "name"), Some("John"));
//! assert_eq!(recovered.diagnostics.recovery_path, RecoveryPath::QuoteRejoined);
//! assert_eq!(recovered.diagnostics.malformed_count, 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Running a full report job
//!
//! [`report::run_report`] adds the filesystem discipline around the pipeline:
//! a timestamped verbatim backup of the raw input *before* any processing,
//! per-variant policy (amount coercion for payments, snapshot dedupe for
//! registrations/media), and copy-before-overwrite replacement of the
//! canonical output.
//!
//! ```no_run
//! use report_sanitizer::report::{run_report, ReportJob};
//! use report_sanitizer::types::ReportKind;
//!
//! # fn main() -> Result<(), report_sanitizer::SanitizeError> {
//! let job = ReportJob::new(ReportKind::Payments, "tmp_paste.csv");
//! let outcome = run_report(&job)?;
//! // 0 when clean, 3 when malformed rows remained.
//! println!("completion signal: {}", outcome.exit_code());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`recovery`]: the parse ladder, header normalization, numeric coercion,
//!   and observer hooks
//! - [`report`]: per-variant orchestration (payments/registrations/media)
//! - [`snapshot`]: canonical-output reads, timestamped backups, atomic writes
//! - [`dedupe`]: prior-snapshot deduplication
//! - [`types`]: table/diagnostics data model
//! - [`error`]: error types used across the crate

pub mod dedupe;
pub mod error;
pub mod recovery;
pub mod report;
pub mod snapshot;
pub mod types;

pub use error::{SanitizeError, SanitizeResult};
