//! Line-wise cleanup applied before any parse attempt.
//!
//! These are deliberately narrow repairs for export bugs we have actually
//! seen (trailing semicolon runs, fully over-quoted lines, quoted fields
//! wrapped across physical lines). They are best-effort heuristics, not a
//! general CSV repair algorithm, and can both under- and over-correct on
//! malformations they were not tuned for.

/// Remove a leading UTF-8 byte-order-mark codepoint, if present.
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Split on `\r?\n`, preserving empty lines (including a trailing one).
fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l))
}

/// Strip a trailing run of semicolons (plus any whitespace after it) that
/// some export tools append to every line.
fn strip_trailing_semicolons(line: &str) -> &str {
    let trimmed = line.trim_end();
    let stripped = trimmed.trim_end_matches(';');
    if stripped.len() < trimmed.len() {
        stripped
    } else {
        line
    }
}

/// Repair an "over-quoted" line: the whole line wrapped in one extra pair of
/// quotes with every inner quote doubled. Well-formed lines are untouched;
/// the repair only fires when the wrapped line actually contains doubled
/// quotes.
fn unwrap_overquoted(line: &str) -> String {
    if line.len() >= 2 && line.starts_with('"') && line.ends_with('"') && line.contains("\"\"") {
        line[1..line.len() - 1].replace("\"\"", "\"")
    } else {
        line.to_string()
    }
}

/// Apply the line-wise repairs to a whole text blob.
///
/// Line endings are normalized to `\n`; empty lines are preserved so that
/// physical row numbering stays stable for diagnostics.
pub fn preprocess(text: &str) -> String {
    let cleaned: Vec<String> = split_lines(text)
        .map(|line| {
            if line.is_empty() {
                return String::new();
            }
            unwrap_overquoted(strip_trailing_semicolons(line))
        })
        .collect();
    cleaned.join("\n")
}

/// Choose the delimiter by counting commas vs. semicolons in `sample`
/// (normally the first non-empty line). Semicolon wins only on a strict
/// majority. Best-effort: a header whose *names* contain commas can fool it.
pub fn detect_delimiter(sample: &str) -> char {
    let commas = sample.matches(',').count();
    let semis = sample.matches(';').count();
    if semis > commas { ';' } else { ',' }
}

/// First non-empty line of `text`, used as the delimiter-detection sample.
pub fn header_sample(text: &str) -> &str {
    split_lines(text).find(|l| !l.trim().is_empty()).unwrap_or("")
}

/// Merge physical lines back into logical records on quote balance.
///
/// Lines accumulate into a buffer until the buffer's `"` count is even, i.e.
/// no field boundary sits inside an open quote spanning a literal newline.
/// Doubled (escaped) quotes contribute two characters and so never change
/// parity. Accumulated lines are concatenated *without* a separator: the
/// exports this repairs wrap a quoted field mid-word, so the physical line
/// break is an artifact, not content.
pub fn rejoin_quoted_lines(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut buffering = false;

    for line in split_lines(text) {
        if buffering {
            buf.push_str(line);
        } else {
            buf = line.to_string();
            buffering = true;
        }
        if buf.matches('"').count() % 2 == 0 {
            out.push(std::mem::take(&mut buf));
            buffering = false;
        }
    }
    // A still-open quote at EOF is emitted as-is; the parser will surface it
    // as a malformed row rather than dropping it.
    if buffering {
        out.push(buf);
    }
    out.join("\n")
}
