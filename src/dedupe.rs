//! Deduplication against the prior canonical snapshot.
//!
//! Existing rows always win: a colliding incoming row never replaces what is
//! already in the snapshot. Rows without any usable key are treated as
//! unconditionally new: never dropped, never blocked.

use std::collections::HashSet;

use crate::types::{ParsedTable, Row};

/// Candidate columns for the media composite key, in priority order.
const MEDIA_KEY_CANDIDATES: [&str; 10] = [
    "month",
    "affiliate",
    "country",
    "registrations",
    "ftd",
    "qftd",
    "deposits",
    "unique_impressions",
    "visitors",
    "leads",
];

/// Incoming rows split into fresh additions and snapshot collisions.
#[derive(Debug, Clone, Default)]
pub struct DedupeSplit {
    /// Rows whose key was not present in the prior snapshot.
    pub additions: Vec<Row>,
    /// Rows whose key collided with the snapshot (or an earlier incoming row).
    pub duplicates: Vec<Row>,
}

/// Pick the registrations dedupe key column: a `user_id`-like name first,
/// else an `mt5`-like one, else the first column.
pub fn select_dedupe_key(columns: &[String]) -> Option<&str> {
    columns
        .iter()
        .find(|c| *c == "user_id" || c.contains("user_id"))
        .or_else(|| columns.iter().find(|c| c.contains("mt5")))
        .or_else(|| columns.first())
        .map(String::as_str)
}

fn keyed_value(row: &Row, key: &str) -> String {
    row.get(key).map(|v| v.trim().to_string()).unwrap_or_default()
}

/// Split incoming rows by a single key column.
///
/// Rows with an empty key are additions (DedupeKeyMissing is not a failure);
/// later incoming rows also dedupe against earlier ones.
pub fn split_by_key(existing: Option<&ParsedTable>, incoming: &[Row], key: &str) -> DedupeSplit {
    let mut seen: HashSet<String> = existing
        .map(|t| t.rows.iter().map(|r| keyed_value(r, key)).collect())
        .unwrap_or_default();

    let mut split = DedupeSplit::default();
    for row in incoming {
        let k = keyed_value(row, key);
        if k.is_empty() {
            split.additions.push(row.clone());
        } else if seen.contains(&k) {
            split.duplicates.push(row.clone());
        } else {
            seen.insert(k);
            split.additions.push(row.clone());
        }
    }
    split
}

fn normalized(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Composite key for media rows: `uid` when non-empty, else the normalized
/// values of the candidate columns joined with `||`, else every value in
/// canonical column order.
pub fn media_key(row: &Row, columns: &[String]) -> String {
    if let Some(uid) = row.get("uid") {
        let uid = uid.trim();
        if !uid.is_empty() {
            return uid.to_string();
        }
    }
    let parts: Vec<String> = MEDIA_KEY_CANDIDATES
        .iter()
        .filter_map(|c| row.get(*c).map(|v| normalized(v)))
        .collect();
    if !parts.is_empty() {
        return parts.join("||");
    }
    columns
        .iter()
        .map(|c| normalized(row.get(c).map(String::as_str).unwrap_or("")))
        .collect::<Vec<_>>()
        .join("||")
}

/// Split incoming media rows by composite key.
pub fn split_by_media_key(
    existing: Option<&ParsedTable>,
    incoming: &[Row],
    columns: &[String],
) -> DedupeSplit {
    let mut seen: HashSet<String> = existing
        .map(|t| t.rows.iter().map(|r| media_key(r, &t.columns)).collect())
        .unwrap_or_default();

    let mut split = DedupeSplit::default();
    for row in incoming {
        let k = media_key(row, columns);
        if seen.contains(&k) {
            split.duplicates.push(row.clone());
        } else {
            seen.insert(k);
            split.additions.push(row.clone());
        }
    }
    split
}
