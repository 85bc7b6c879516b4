//! Amount-column heuristic and locale-aware numeric coercion.

use crate::types::ParsedTable;

/// Find the column that holds the payment amount.
///
/// Heuristic, kept behind this single function so it can be swapped without
/// touching parsing: prefer a name containing both `payment` and `amount`,
/// else any name containing `amount`.
pub fn find_amount_column(columns: &[String]) -> Option<&str> {
    columns
        .iter()
        .find(|c| c.contains("payment") && c.contains("amount"))
        .or_else(|| columns.iter().find(|c| c.contains("amount")))
        .map(String::as_str)
}

/// Parse a human-formatted amount into a number.
///
/// - currency symbols (`€`, `$`, `£`) and whitespace are stripped;
/// - when both `,` and `.` appear, whichever comes last is the decimal
///   separator and the other is a thousands separator;
/// - `,` without any `.` is a thousands separator when every group after the
///   first is a digit triplet (`1,234` → `1234`), otherwise the decimal
///   separator (`10,50` → `10.5`);
/// - otherwise `,` is a thousands separator and is removed;
/// - anything that still fails to parse coerces to `0`.
pub fn parse_locale_number(raw: &str) -> f64 {
    let mut v: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '€' | '$' | '£'))
        .collect();
    if v.is_empty() {
        return 0.0;
    }

    let last_dot = v.rfind('.');
    let last_comma = v.rfind(',');
    match (last_comma, last_dot) {
        (Some(c), Some(d)) if c > d => {
            v = v.replace('.', "").replace(',', ".");
        }
        (Some(_), Some(_)) => {
            v = v.replace(',', "");
        }
        (Some(_), None) => {
            if comma_groups_are_triplets(&v) {
                v = v.replace(',', "");
            } else {
                v = v.replace(',', ".");
            }
        }
        _ => {
            v = v.replace(',', "");
        }
    }

    match v.parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

/// True when every comma-delimited group after the first is exactly three
/// digits, i.e. the commas read as thousands separators.
fn comma_groups_are_triplets(value: &str) -> bool {
    value
        .split(',')
        .skip(1)
        .all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit()))
}

/// Coerce the amount-like column of `table` in place.
///
/// Values are rewritten through [`parse_locale_number`] and formatted with
/// `f64`'s shortest display form (`2100`, `10.5`). Returns the name of the
/// coerced column, or `None` when no amount-like column exists.
pub fn coerce_amount_column(table: &mut ParsedTable) -> Option<String> {
    let column = find_amount_column(&table.columns)?.to_string();
    for row in &mut table.rows {
        if let Some(value) = row.get_mut(&column) {
            *value = parse_locale_number(value).to_string();
        }
    }
    Some(column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Row;

    #[test]
    fn amount_column_prefers_payment_amount() {
        let cols = vec![
            "amount_total".to_string(),
            "payment_amount".to_string(),
        ];
        assert_eq!(find_amount_column(&cols), Some("payment_amount"));
    }

    #[test]
    fn amount_column_falls_back_to_any_amount() {
        let cols = vec!["id".to_string(), "deposit_amount".to_string()];
        assert_eq!(find_amount_column(&cols), Some("deposit_amount"));
        let none = vec!["id".to_string(), "name".to_string()];
        assert_eq!(find_amount_column(&none), None);
    }

    #[test]
    fn parses_us_and_european_thousands() {
        assert_eq!(parse_locale_number("2,100.00"), 2100.0);
        assert_eq!(parse_locale_number("2.100,00"), 2100.0);
        assert_eq!(parse_locale_number("1,234"), 1234.0);
    }

    #[test]
    fn parses_lone_comma_as_decimal() {
        assert_eq!(parse_locale_number("10,50"), 10.5);
    }

    #[test]
    fn comma_without_decimal_point_reads_as_thousands_on_triplets() {
        assert_eq!(parse_locale_number("1,234"), 1234.0);
        assert_eq!(parse_locale_number("1,000"), 1000.0);
        assert_eq!(parse_locale_number("1,234,567"), 1234567.0);
        // Non-triplet groups keep the comma as the decimal separator.
        assert_eq!(parse_locale_number("10,50"), 10.5);
        assert_eq!(parse_locale_number("0,5"), 0.5);
    }

    #[test]
    fn strips_currency_symbols_and_whitespace() {
        assert_eq!(parse_locale_number("€ 1 234,56"), 1234.56);
        assert_eq!(parse_locale_number("$99.90"), 99.9);
        assert_eq!(parse_locale_number("£1,000"), 1000.0);
    }

    #[test]
    fn junk_coerces_to_zero() {
        assert_eq!(parse_locale_number(""), 0.0);
        assert_eq!(parse_locale_number("   "), 0.0);
        assert_eq!(parse_locale_number("n/a"), 0.0);
        assert_eq!(parse_locale_number("12.3.4"), 0.0);
    }

    #[test]
    fn coercion_rewrites_only_the_amount_column() {
        let columns = vec!["id".to_string(), "payment_amount".to_string()];
        let mut row = Row::new();
        row.insert("id".to_string(), "7".to_string());
        row.insert("payment_amount".to_string(), "2,100.00".to_string());
        let mut table = ParsedTable::new(columns, vec![row]);

        let coerced = coerce_amount_column(&mut table);
        assert_eq!(coerced.as_deref(), Some("payment_amount"));
        assert_eq!(table.value(0, "payment_amount"), Some("2100"));
        assert_eq!(table.value(0, "id"), Some("7"));
    }
}
