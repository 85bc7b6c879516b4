//! The CSV recovery & normalization pipeline.
//!
//! Most callers should use [`recover`], which runs the full parse ladder
//! over a raw text blob:
//!
//! - [`preprocess`]: line-wise cleanup (BOM strip, trailing semicolons,
//!   over-quoted line repair) and delimiter detection
//! - [`parse`]: direct parse → quote-rejoin recovery → headerless fallback,
//!   row-shape inspection, canonical remapping
//! - [`header`]: header normalization and `_1`/`_2` collision suffixing
//! - [`numeric`]: amount-column heuristic and locale-aware coercion
//! - [`observability`]: observer hooks for run diagnostics

pub mod header;
pub mod numeric;
pub mod observability;
pub mod parse;
pub mod preprocess;

pub use header::{canonicalize_columns, normalize_header_cell, synthesize_columns};
pub use numeric::{coerce_amount_column, find_amount_column, parse_locale_number};
pub use observability::{
    CompositeObserver, FileObserver, ReportStats, RunContext, SanitizeObserver, Severity,
    StdErrObserver,
};
pub use parse::{recover, Recovery, RecoveryOptions};
pub use preprocess::{detect_delimiter, preprocess, rejoin_quoted_lines, strip_bom};
