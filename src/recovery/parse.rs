//! The escalating parse ladder: direct → quote-rejoin → headerless fallback.
//!
//! The primary parser is line-oriented: every physical line is one candidate
//! record, so an open quote can never swallow the rest of the file on the
//! first attempt. A quoted field wrapped across physical lines shows up as
//! malformed rows, which is exactly what the quote-rejoin recovery repairs.

use crate::error::{SanitizeError, SanitizeResult};
use crate::types::{Diagnostics, MalformedRow, ParsedTable, RecoveryPath, Row};

use super::header::{canonicalize_columns, normalize_header_cell, synthesize_columns};
use super::preprocess::{
    detect_delimiter, header_sample, preprocess, rejoin_quoted_lines, strip_bom,
};

/// Options controlling a recovery run.
#[derive(Debug, Clone, Default)]
pub struct RecoveryOptions {
    /// Explicit delimiter override. When `None`, the delimiter is detected
    /// from the first non-empty line (comma unless semicolons strictly
    /// outnumber commas).
    pub delimiter: Option<char>,
}

/// The result of a recovery run: the table plus what it took to get it.
#[derive(Debug, Clone)]
pub struct Recovery {
    /// The recovered table. Every row carries exactly the canonical key set.
    pub table: ParsedTable,
    /// Diagnostic report for this run.
    pub diagnostics: Diagnostics,
}

/// One parse attempt: normalized header cells plus positional data records.
struct Parse {
    fields: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Tokenize a single physical line into fields with the `csv` crate.
fn parse_line(line: &str, delimiter: char) -> SanitizeResult<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter as u8)
        .quote(b'"')
        .flexible(true)
        .from_reader(line.as_bytes());

    let mut record = csv::StringRecord::new();
    if rdr.read_record(&mut record)? {
        Ok(record.iter().map(str::to_string).collect())
    } else {
        Ok(Vec::new())
    }
}

/// Parse `text` line by line, skipping fully empty lines.
fn parse_records(text: &str, delimiter: char) -> SanitizeResult<Vec<Vec<String>>> {
    let mut records = Vec::new();
    for line in text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l)) {
        if line.trim().is_empty() {
            continue;
        }
        let fields = parse_line(line, delimiter)?;
        if !fields.is_empty() {
            records.push(fields);
        }
    }
    Ok(records)
}

/// Parse with the first record as header (cells normalized).
///
/// Returns `None` when no header fields could be produced at all.
fn parse_with_header(text: &str, delimiter: char) -> SanitizeResult<Option<Parse>> {
    let mut records = parse_records(text, delimiter)?;
    if records.is_empty() {
        return Ok(None);
    }
    let header = records.remove(0);
    let fields = header.iter().map(|c| normalize_header_cell(c)).collect();
    Ok(Some(Parse {
        fields,
        rows: records,
    }))
}

/// Headerless last resort: synthesize column names from the first record.
///
/// Requires at least two records (one to name the columns, one of data);
/// otherwise the caller keeps whatever state it already has.
fn parse_headerless(text: &str, delimiter: char) -> SanitizeResult<Option<Parse>> {
    let mut records = parse_records(text, delimiter)?;
    if records.len() < 2 {
        return Ok(None);
    }
    let first = records.remove(0);
    Ok(Some(Parse {
        fields: synthesize_columns(&first),
        rows: records,
    }))
}

/// Rows whose field count disagrees with the header's, with 1-based data-row
/// indices.
fn inspect_rows(rows: &[Vec<String>], expected: usize) -> Vec<MalformedRow> {
    rows.iter()
        .enumerate()
        .filter(|(_, row)| row.len() != expected)
        .map(|(i, row)| MalformedRow {
            index: i + 1,
            fields: row.len(),
        })
        .collect()
}

/// Rebuild every row against the canonical column list.
///
/// Values are pulled positionally; missing fields become empty strings and
/// surplus fields are not carried, so each emitted row's key set equals the
/// canonical column set exactly.
fn remap_rows(rows: &[Vec<String>], columns: &[String]) -> Vec<Row> {
    rows.iter()
        .map(|row| {
            columns
                .iter()
                .enumerate()
                .map(|(i, col)| (col.clone(), row.get(i).cloned().unwrap_or_default()))
                .collect()
        })
        .collect()
}

/// Run the full recovery pipeline over a raw text blob.
///
/// Steps: BOM strip, line-wise preprocessing, delimiter detection, then the
/// parse ladder (direct, quote-rejoin on header failure or malformed rows,
/// headerless fallback over the *original* text). Rows that still disagree
/// with the header after every strategy are remapped best-effort and counted
/// in the diagnostics, never dropped.
///
/// Fails only with [`SanitizeError::HeaderDetection`] when no strategy
/// produced header fields.
pub fn recover(raw: &str, options: &RecoveryOptions) -> SanitizeResult<Recovery> {
    let text = strip_bom(raw);
    let pre = preprocess(text);
    let delimiter = options
        .delimiter
        .unwrap_or_else(|| detect_delimiter(header_sample(&pre)));

    let mut path = RecoveryPath::Direct;
    let mut attempt = parse_with_header(&pre, delimiter)?;
    if attempt.is_none() {
        path = RecoveryPath::QuoteRejoined;
        attempt = parse_with_header(&rejoin_quoted_lines(&pre), delimiter)?;
    }
    let mut parse = match attempt {
        Some(p) => p,
        None => match parse_headerless(text, delimiter)? {
            Some(p) => {
                path = RecoveryPath::HeaderlessFallback;
                p
            }
            None => return Err(SanitizeError::HeaderDetection),
        },
    };

    let mut columns = canonicalize_columns(&parse.fields);
    let mut malformed = inspect_rows(&parse.rows, columns.len());

    if !malformed.is_empty() && path != RecoveryPath::HeaderlessFallback {
        if let Some(p) = parse_with_header(&rejoin_quoted_lines(&pre), delimiter)? {
            path = RecoveryPath::QuoteRejoined;
            parse = p;
            columns = canonicalize_columns(&parse.fields);
            malformed = inspect_rows(&parse.rows, columns.len());
        }
        if !malformed.is_empty() {
            if let Some(p) = parse_headerless(text, delimiter)? {
                path = RecoveryPath::HeaderlessFallback;
                parse = p;
                columns = canonicalize_columns(&parse.fields);
                malformed = inspect_rows(&parse.rows, columns.len());
            }
        }
    }

    let rows = remap_rows(&parse.rows, &columns);
    let diagnostics = Diagnostics {
        delimiter,
        columns: columns.clone(),
        rows_parsed: rows.len(),
        malformed_count: malformed.len(),
        malformed_sample: malformed
            .iter()
            .take(Diagnostics::MALFORMED_SAMPLE_CAP)
            .copied()
            .collect(),
        recovery_path: path,
    };

    Ok(Recovery {
        table: ParsedTable::new(columns, rows),
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_line_respects_quotes_and_delimiter() {
        assert_eq!(
            parse_line("a,\"b,c\",d", ',').unwrap(),
            vec!["a", "b,c", "d"]
        );
        assert_eq!(parse_line("a;b;c", ';').unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn inspect_rows_reports_one_based_indices() {
        let rows = vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["a".to_string()],
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
        ];
        let malformed = inspect_rows(&rows, 2);
        assert_eq!(
            malformed,
            vec![
                MalformedRow { index: 2, fields: 1 },
                MalformedRow { index: 3, fields: 3 },
            ]
        );
    }

    #[test]
    fn remap_pads_and_truncates_to_the_canonical_key_set() {
        let columns = vec!["a".to_string(), "b".to_string()];
        let rows = vec![
            vec!["1".to_string()],
            vec!["1".to_string(), "2".to_string(), "3".to_string()],
        ];
        let remapped = remap_rows(&rows, &columns);
        for row in &remapped {
            assert_eq!(row.len(), 2);
        }
        assert_eq!(remapped[0]["b"], "");
        assert_eq!(remapped[1]["b"], "2");
        assert!(!remapped[1].contains_key("c"));
    }
}
