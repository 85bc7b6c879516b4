//! Canonical-output snapshot handling.
//!
//! The only shared resource in the system is the canonical destination file
//! and its backup directory. The discipline is copy-before-overwrite: the raw
//! input is backed up before any processing, and a destination file is only
//! replaced after the new content has been written out fully (tmp file, then
//! rename), with the prior version copied aside under a timestamp suffix.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{SanitizeError, SanitizeResult};
use crate::recovery::header::{canonicalize_columns, normalize_header_cell};
use crate::types::{ParsedTable, Row};

/// Unix epoch milliseconds, used as the backup timestamp suffix.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// `<dest>.<timestamp>.bak`
pub fn backup_path(dest: &Path, timestamp: u64) -> PathBuf {
    let mut os = dest.as_os_str().to_os_string();
    os.push(format!(".{timestamp}.bak"));
    PathBuf::from(os)
}

/// Read a prior canonical output, if present and parseable.
///
/// The canonical file is our own well-formed output, so this is a plain CSV
/// read with header normalization. Any parse problem degrades to `None` (the
/// run proceeds as if no snapshot existed) rather than aborting; the caller
/// logs a warning.
pub fn read_snapshot(path: &Path) -> Option<ParsedTable> {
    let bytes = fs::read(path).ok()?;
    let text = String::from_utf8_lossy(&bytes);

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let header: Vec<String> = rdr
        .headers()
        .ok()?
        .iter()
        .map(normalize_header_cell)
        .collect();
    if header.is_empty() {
        return None;
    }
    let columns = canonicalize_columns(&header);

    let mut rows: Vec<Row> = Vec::new();
    for result in rdr.records() {
        let record = result.ok()?;
        let row: Row = columns
            .iter()
            .enumerate()
            .map(|(i, col)| (col.clone(), record.get(i).unwrap_or("").to_string()))
            .collect();
        rows.push(row);
    }
    Some(ParsedTable::new(columns, rows))
}

/// Serialize a table to CSV text (canonical column order, empty string for
/// any missing key).
pub fn table_to_csv(table: &ParsedTable) -> SanitizeResult<String> {
    let mut buf: Vec<u8> = Vec::new();
    {
        let mut w = csv::Writer::from_writer(&mut buf);
        w.write_record(&table.columns)?;
        for row in &table.rows {
            let record: Vec<&str> = table
                .columns
                .iter()
                .map(|c| row.get(c).map(String::as_str).unwrap_or(""))
                .collect();
            w.write_record(&record)?;
        }
        w.flush()?;
    }
    // The writer only ever receives UTF-8 input.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn write_err(path: &Path, source: std::io::Error) -> SanitizeError {
    SanitizeError::Write {
        path: path.to_path_buf(),
        source,
    }
}

/// Persist the untouched input bytes under `<raw_dir>/<prefix>_raw.<ts>.csv`.
///
/// This happens before any normalization so recovery is always possible even
/// if the cleanup itself is wrong.
pub fn write_raw_backup(
    raw_dir: &Path,
    prefix: &str,
    timestamp: u64,
    bytes: &[u8],
) -> SanitizeResult<PathBuf> {
    fs::create_dir_all(raw_dir).map_err(|e| write_err(raw_dir, e))?;
    let path = raw_dir.join(format!("{prefix}_raw.{timestamp}.csv"));
    fs::write(&path, bytes).map_err(|e| write_err(&path, e))?;
    Ok(path)
}

/// Write dedupe collisions to `<raw_dir>/<prefix>_duplicates.<ts>.csv`.
pub fn write_duplicates(
    raw_dir: &Path,
    prefix: &str,
    timestamp: u64,
    table: &ParsedTable,
) -> SanitizeResult<PathBuf> {
    fs::create_dir_all(raw_dir).map_err(|e| write_err(raw_dir, e))?;
    let path = raw_dir.join(format!("{prefix}_duplicates.{timestamp}.csv"));
    let csv = table_to_csv(table)?;
    fs::write(&path, csv).map_err(|e| write_err(&path, e))?;
    Ok(path)
}

/// Replace the canonical destination with `table`, backing up any prior
/// version first.
///
/// Write ordering: serialize → write `<dest>.tmp` → copy existing `dest` to
/// `<dest>.<ts>.bak` → rename tmp into place. A failure at any step leaves
/// the prior canonical file untouched. Returns the backup path when a prior
/// file existed.
pub fn replace_canonical(
    dest: &Path,
    table: &ParsedTable,
    timestamp: u64,
) -> SanitizeResult<Option<PathBuf>> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| write_err(parent, e))?;
        }
    }

    let csv = table_to_csv(table)?;
    let tmp = {
        let mut os = dest.as_os_str().to_os_string();
        os.push(".tmp");
        PathBuf::from(os)
    };
    fs::write(&tmp, csv).map_err(|e| write_err(&tmp, e))?;

    let mut backup = None;
    if dest.exists() {
        let bak = backup_path(dest, timestamp);
        if let Err(e) = fs::copy(dest, &bak) {
            let _ = fs::remove_file(&tmp);
            return Err(write_err(&bak, e));
        }
        backup = Some(bak);
    }

    if let Err(e) = fs::rename(&tmp, dest) {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(dest, e));
    }
    Ok(backup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Row;

    fn table(columns: &[&str], rows: &[&[&str]]) -> ParsedTable {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let rows = rows
            .iter()
            .map(|values| {
                columns
                    .iter()
                    .cloned()
                    .zip(values.iter().map(|v| v.to_string()))
                    .collect::<Row>()
            })
            .collect();
        ParsedTable::new(columns, rows)
    }

    #[test]
    fn table_to_csv_quotes_only_when_needed() {
        let t = table(&["id", "name"], &[&["1", "a,b"], &["2", "plain"]]);
        let csv = table_to_csv(&t).unwrap();
        assert_eq!(csv, "id,name\n1,\"a,b\"\n2,plain\n");
    }

    #[test]
    fn replace_canonical_backs_up_prior_content_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("Payments Report.csv");

        let first = table(&["id"], &[&["1"]]);
        assert_eq!(replace_canonical(&dest, &first, 100).unwrap(), None);
        let original = fs::read(&dest).unwrap();

        let second = table(&["id"], &[&["1"], &["2"]]);
        let bak = replace_canonical(&dest, &second, 200).unwrap().unwrap();
        assert_eq!(bak, backup_path(&dest, 200));
        assert_eq!(fs::read(&bak).unwrap(), original);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "id\n1\n2\n");
        assert!(!dest.with_extension("csv.tmp").exists());
    }

    #[test]
    fn snapshot_round_trips_through_the_writer() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("snap.csv");
        let t = table(&["user_id", "name"], &[&["7", "Ada"]]);
        replace_canonical(&dest, &t, 1).unwrap();

        let back = read_snapshot(&dest).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn read_snapshot_returns_none_for_missing_file() {
        assert!(read_snapshot(Path::new("no/such/file.csv")).is_none());
    }

    #[test]
    fn raw_backup_preserves_bytes_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = b"\xef\xbb\xbfID;Name\n1;x\n";
        let path = write_raw_backup(dir.path(), "payments", 42, bytes).unwrap();
        assert!(path.ends_with("payments_raw.42.csv"));
        assert_eq!(fs::read(&path).unwrap(), bytes);
    }
}
