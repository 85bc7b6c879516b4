//! Core data model for the recovery pipeline.
//!
//! The pipeline turns a raw CSV blob into a [`ParsedTable`] (rows keyed by a
//! canonical, normalized column list) plus a [`Diagnostics`] record describing
//! what the recovery had to do to get there.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single output row: normalized column name → string value.
///
/// Every row emitted by the pipeline carries *exactly* the canonical key set
/// of its [`ParsedTable`]; missing source fields become empty strings during
/// remapping rather than missing keys.
pub type Row = HashMap<String, String>;

/// An ordered table of recovered rows.
///
/// `columns` is the canonical header: lowercased, underscore-separated,
/// alphanumeric-only names, deduplicated with `_1`, `_2`, ... suffixes in
/// first-seen order. Row maps are unordered; `columns` carries the order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedTable {
    /// Canonical column names, in output order.
    pub columns: Vec<String>,
    /// Recovered rows, each keyed by exactly the canonical column set.
    pub rows: Vec<Row>,
}

impl ParsedTable {
    /// Create a table from a canonical column list and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Look up a value by row index and canonical column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(column)).map(String::as_str)
    }
}

/// Which report a source file feeds. Drives the canonical destination name
/// and the per-variant policy (amount coercion, dedupe behavior).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportKind {
    /// Payments export: amount column coerced, no dedupe.
    Payments,
    /// Registrations export: deduped against the prior snapshot by a
    /// `user_id`-like key; collisions go to a duplicates file.
    Registrations,
    /// Media/traffic export: deduped by `uid` or a composite key; collisions
    /// are counted and skipped.
    Media,
}

impl ReportKind {
    /// File name of the canonical cleaned CSV the dashboard reads.
    pub fn dest_file_name(&self) -> &'static str {
        match self {
            Self::Payments => "Payments Report.csv",
            Self::Registrations => "Registrations Report.csv",
            Self::Media => "Media Report.csv",
        }
    }

    /// Prefix used for raw backups and duplicates files.
    pub fn raw_prefix(&self) -> &'static str {
        match self {
            Self::Payments => "payments",
            Self::Registrations => "registrations",
            Self::Media => "media",
        }
    }
}

/// Which parse strategy produced the final table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryPath {
    /// The preprocessed text parsed cleanly on the first attempt.
    Direct,
    /// Physical lines had to be merged on quote balance before parsing.
    QuoteRejoined,
    /// Headerless parse of the original text, with column names synthesized
    /// from the first row.
    HeaderlessFallback,
}

/// A data row whose field count disagreed with the header's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MalformedRow {
    /// 1-based index of the row among data rows (header excluded).
    pub index: usize,
    /// Field count observed in the parsed record.
    pub fields: usize,
}

/// Diagnostic report for one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Detected (or overridden) delimiter: `,` or `;`.
    pub delimiter: char,
    /// Canonical column names of the output table.
    pub columns: Vec<String>,
    /// Number of data rows in the output table.
    pub rows_parsed: usize,
    /// Exact count of rows whose field count did not match the header's,
    /// after all recovery attempts.
    pub malformed_count: usize,
    /// Capped sample of malformed rows (see [`Diagnostics::MALFORMED_SAMPLE_CAP`]);
    /// `malformed_count` is always exact.
    pub malformed_sample: Vec<MalformedRow>,
    /// Which recovery strategy produced the table.
    pub recovery_path: RecoveryPath,
}

impl Diagnostics {
    /// How many malformed rows are retained in `malformed_sample` for logging.
    pub const MALFORMED_SAMPLE_CAP: usize = 5;

    /// True when every data row matched the header's field count.
    pub fn is_clean(&self) -> bool {
        self.malformed_count == 0
    }
}
