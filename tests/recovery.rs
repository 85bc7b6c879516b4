use report_sanitizer::recovery::{recover, RecoveryOptions};
use report_sanitizer::types::RecoveryPath;
use report_sanitizer::SanitizeError;

fn default_opts() -> RecoveryOptions {
    RecoveryOptions::default()
}

#[test]
fn direct_parse_normalizes_headers_and_rows() {
    let raw = "User ID,Full Name,Payment Amount\n1,Ada,100\n2,Grace,200\n";
    let rec = recover(raw, &default_opts()).unwrap();

    assert_eq!(rec.diagnostics.delimiter, ',');
    assert_eq!(rec.diagnostics.recovery_path, RecoveryPath::Direct);
    assert_eq!(
        rec.table.columns,
        vec!["user_id", "full_name", "payment_amount"]
    );
    assert_eq!(rec.table.row_count(), 2);
    assert_eq!(rec.table.value(0, "full_name"), Some("Ada"));
    assert_eq!(rec.table.value(1, "payment_amount"), Some("200"));
    assert!(rec.diagnostics.is_clean());
}

#[test]
fn semicolon_delimited_export_with_trailing_semicolons() {
    let raw = "ID;Name;;;\n1;Ada;;\n2;Grace;;;\n";
    let rec = recover(raw, &default_opts()).unwrap();

    assert_eq!(rec.diagnostics.delimiter, ';');
    assert_eq!(rec.table.columns, vec!["id", "name"]);
    assert_eq!(rec.table.row_count(), 2);
    assert_eq!(rec.table.value(1, "name"), Some("Grace"));
    assert!(rec.diagnostics.is_clean());
}

#[test]
fn bom_is_stripped_before_parsing() {
    let raw = "\u{feff}ID,Name\n1,Ada\n";
    let rec = recover(raw, &default_opts()).unwrap();
    assert_eq!(rec.table.columns, vec!["id", "name"]);
    assert_eq!(rec.table.value(0, "id"), Some("1"));
}

#[test]
fn duplicate_headers_get_first_seen_suffixes() {
    let raw = "Amount,Amount,Other\n1,2,3\n";
    let rec = recover(raw, &default_opts()).unwrap();
    assert_eq!(rec.table.columns, vec!["amount", "amount_1", "other"]);
    assert_eq!(rec.table.value(0, "amount_1"), Some("2"));
}

#[test]
fn delimiter_override_beats_detection() {
    // Commas outnumber semicolons, but the caller knows better.
    let raw = "a;b,c,d\n1;2,3,4\n";
    let opts = RecoveryOptions {
        delimiter: Some(';'),
    };
    let rec = recover(raw, &opts).unwrap();
    assert_eq!(rec.diagnostics.delimiter, ';');
    assert_eq!(rec.table.columns, vec!["a", "bcd"]);
}

#[test]
fn record_split_inside_an_open_quote_rejoins_to_one_row() {
    // One logical record wrapped across two physical lines mid-word.
    let raw = "\"ID\",\"Name\",\"Amount\"\n\"1\",\"Jo\nhn\",\"10,50\"\n";
    let rec = recover(raw, &default_opts()).unwrap();

    assert_eq!(rec.diagnostics.recovery_path, RecoveryPath::QuoteRejoined);
    assert_eq!(rec.table.row_count(), 1);
    assert_eq!(rec.table.value(0, "id"), Some("1"));
    assert_eq!(rec.table.value(0, "name"), Some("John"));
    assert_eq!(rec.table.value(0, "amount"), Some("10,50"));
    assert_eq!(rec.diagnostics.malformed_count, 0);
}

#[test]
fn over_quoted_line_is_unwrapped_before_parsing() {
    let raw = "ID,Name\n\"1,\"\"Ada\"\"\"\n";
    let rec = recover(raw, &default_opts()).unwrap();
    assert_eq!(rec.table.row_count(), 1);
    assert_eq!(rec.table.value(0, "id"), Some("1"));
    assert_eq!(rec.table.value(0, "name"), Some("Ada"));
    assert!(rec.diagnostics.is_clean());
}

#[test]
fn irreparable_rows_are_emitted_counted_and_indexed() {
    let raw = "a,b\n1,2\n3\n4,5,6\n7,8\n";
    let rec = recover(raw, &default_opts()).unwrap();

    // The escalating fallback lands on headerless parsing, which cannot fix
    // genuinely ragged rows either; they are still emitted.
    assert_eq!(rec.table.row_count(), 4);
    assert_eq!(rec.diagnostics.malformed_count, 2);
    let indices: Vec<usize> = rec
        .diagnostics
        .malformed_sample
        .iter()
        .map(|m| m.index)
        .collect();
    assert_eq!(indices, vec![2, 3]);

    // Row-shape invariant: every emitted row carries exactly the canonical
    // key set, padded or truncated as needed.
    for row in &rec.table.rows {
        let mut keys: Vec<&str> = row.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["a", "b"]);
    }
    assert_eq!(rec.table.value(1, "b"), Some(""));
    assert_eq!(rec.table.value(2, "b"), Some("5"));
}

#[test]
fn malformed_sample_is_capped_but_count_is_exact() {
    let mut raw = String::from("a,b\n");
    for i in 0..8 {
        raw.push_str(&format!("{i}\n"));
    }
    let rec = recover(&raw, &default_opts()).unwrap();
    assert_eq!(rec.diagnostics.malformed_count, 8);
    assert_eq!(rec.diagnostics.malformed_sample.len(), 5);
}

#[test]
fn headerless_fallback_synthesizes_column_names() {
    // Ragged data keeps the malformed count non-zero through the rejoin
    // rerun, driving the ladder to its last rung.
    let raw = "First Col,,\n1,2\n3,4,5\n";
    let rec = recover(raw, &default_opts()).unwrap();
    assert_eq!(
        rec.diagnostics.recovery_path,
        RecoveryPath::HeaderlessFallback
    );
    assert_eq!(rec.table.columns, vec!["first_col", "col1", "col2"]);
}

#[test]
fn empty_input_fails_header_detection() {
    for raw in ["", "\n\n", "   \n  \n"] {
        let err = recover(raw, &default_opts()).unwrap_err();
        assert!(matches!(err, SanitizeError::HeaderDetection));
        assert!(err.to_string().contains("could not detect header"));
    }
}

#[test]
fn single_header_line_yields_an_empty_table() {
    let raw = "ID,Name\n";
    let rec = recover(raw, &default_opts()).unwrap();
    assert_eq!(rec.table.columns, vec!["id", "name"]);
    assert_eq!(rec.table.row_count(), 0);
    assert!(rec.diagnostics.is_clean());
}
