//! Header normalization and canonicalization.

/// Normalize one header cell: trim, lowercase, collapse internal whitespace
/// runs to a single underscore, drop anything outside `[a-z0-9_]`.
///
/// Normalization is idempotent: applying it to an already-normalized name
/// returns the name unchanged.
pub fn normalize_header_cell(cell: &str) -> String {
    let mut out = String::with_capacity(cell.len());
    let mut pending_sep = false;
    for ch in cell.trim().chars() {
        if ch.is_whitespace() {
            pending_sep = true;
            continue;
        }
        for lc in ch.to_lowercase() {
            if lc.is_ascii_lowercase() || lc.is_ascii_digit() || lc == '_' {
                if pending_sep && !out.is_empty() {
                    out.push('_');
                }
                pending_sep = false;
                out.push(lc);
            }
        }
    }
    out
}

/// Build the canonical column list from normalized header cells.
///
/// Cells that normalized to the empty string become `col_<i>`; duplicate
/// names are disambiguated by appending `_1`, `_2`, ... in first-seen order.
pub fn canonicalize_columns(fields: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(fields.len());
    for (i, field) in fields.iter().enumerate() {
        let mut name = if field.is_empty() {
            format!("col_{i}")
        } else {
            field.clone()
        };
        if seen.iter().any(|s| s == &name) {
            let mut k = 1usize;
            while seen.iter().any(|s| *s == format!("{name}_{k}")) {
                k += 1;
            }
            name = format!("{name}_{k}");
        }
        seen.push(name);
    }
    seen
}

/// Synthesize column names from a data row, for the headerless fallback.
///
/// Each cell is normalized; empty results default to `col<N>`.
pub fn synthesize_columns(first_row: &[String]) -> Vec<String> {
    let synthesized: Vec<String> = first_row
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let name = normalize_header_cell(cell);
            if name.is_empty() { format!("col{i}") } else { name }
        })
        .collect();
    canonicalize_columns(&synthesized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_lowercases_and_underscores() {
        assert_eq!(normalize_header_cell("  Payment Amount "), "payment_amount");
        assert_eq!(normalize_header_cell("User\tID"), "user_id");
        assert_eq!(normalize_header_cell("FTD (count)"), "ftd_count");
        assert_eq!(normalize_header_cell("MT5 #"), "mt5");
    }

    #[test]
    fn normalization_collapses_whitespace_runs() {
        assert_eq!(normalize_header_cell("a   b\t c"), "a_b_c");
    }

    #[test]
    fn normalization_is_idempotent() {
        for name in ["payment_amount", "user_id", "col_3", "x", ""] {
            assert_eq!(normalize_header_cell(name), name);
        }
        let messy = "  Déjà  Vu! 2 ";
        let once = normalize_header_cell(messy);
        assert_eq!(normalize_header_cell(&once), once);
    }

    #[test]
    fn canonicalize_suffixes_duplicates_in_first_seen_order() {
        let fields = vec![
            "amount".to_string(),
            "amount".to_string(),
            "amount".to_string(),
            "other".to_string(),
        ];
        assert_eq!(
            canonicalize_columns(&fields),
            vec!["amount", "amount_1", "amount_2", "other"]
        );
    }

    #[test]
    fn canonicalize_avoids_colliding_with_existing_suffixed_names() {
        let fields = vec![
            "amount".to_string(),
            "amount_1".to_string(),
            "amount".to_string(),
        ];
        assert_eq!(
            canonicalize_columns(&fields),
            vec!["amount", "amount_1", "amount_2"]
        );
    }

    #[test]
    fn canonicalize_fills_empty_names_positionally() {
        let fields = vec![String::new(), "id".to_string(), String::new()];
        assert_eq!(canonicalize_columns(&fields), vec!["col_0", "id", "col_2"]);
    }

    #[test]
    fn canonicalize_is_idempotent_on_canonical_input() {
        let canonical = vec![
            "id".to_string(),
            "amount".to_string(),
            "amount_1".to_string(),
        ];
        assert_eq!(canonicalize_columns(&canonical), canonical);
    }

    #[test]
    fn synthesize_defaults_empty_cells_to_col_n() {
        let row = vec![
            "User ID".to_string(),
            String::new(),
            "Name".to_string(),
        ];
        assert_eq!(synthesize_columns(&row), vec!["user_id", "col1", "name"]);
    }
}
