use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for sanitizer operations.
pub type SanitizeResult<T> = Result<T, SanitizeError>;

/// Error type returned by the recovery pipeline and report runner.
///
/// Parsing anomalies (rows with the wrong field count) are *not* errors: they
/// are recovered best-effort and surfaced through
/// [`crate::types::Diagnostics`]. Only total header-detection failure and
/// filesystem problems abort a run.
#[derive(Debug, Error)]
pub enum SanitizeError {
    /// Underlying I/O error (e.g. permission denied while reading).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV tokenizer error from the `csv` crate.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The source file does not exist. Nothing has been written.
    #[error("source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// No parse strategy (direct, quote-rejoined, headerless) produced any
    /// header fields. This is the only unrecoverable parse outcome.
    #[error("could not detect header fields after direct, quote-rejoin and headerless parsing")]
    HeaderDetection,

    /// Writing an output artifact failed. The prior canonical file is left
    /// untouched because destinations are only replaced after a successful
    /// write.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
