//! Best-guess column selection for tables whose schema varies by source.

use crate::error::AnalyticsError;
use core_types::Table;

/// Candidate names for a reward/revenue amount, in priority order.
pub const AMOUNT_COLUMNS: &[&str] = &[
    "total_rewards_usd",
    "amount_usd",
    "rewards_usd",
    "amount",
    "value",
];

/// Candidate names for a grouping category (network, vault or protocol).
pub const CATEGORY_COLUMNS: &[&str] = &["network", "vault", "vault_name", "protocol"];

/// Candidate names for a timestamp.
pub const TIME_COLUMNS: &[&str] = &["time", "date", "timestamp", "block_time"];

/// Candidate names for a TVL figure.
pub const TVL_COLUMNS: &[&str] = &["tvl", "total_tvl", "tvl_usd", "value", "amount"];

/// Returns the first candidate present in the table.
pub fn find_column(table: &Table, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .find(|c| table.has_column(c))
        .map(|c| c.to_string())
}

/// Returns the first column whose cells are all numbers, ignoring nulls.
/// A column made only of nulls does not qualify.
pub fn first_numeric_column(table: &Table) -> Option<String> {
    table
        .columns()
        .iter()
        .find(|name| {
            table.column(name).is_some_and(|mut cells| {
                let mut seen_number = false;
                let all_numeric = cells.all(|v| {
                    seen_number |= v.is_number();
                    v.is_null() || v.is_number()
                });
                all_numeric && seen_number
            })
        })
        .cloned()
}

/// Picks a column by candidate name, falling back to the first numeric column.
pub fn detect_column(table: &Table, candidates: &[&str]) -> Result<String, AnalyticsError> {
    find_column(table, candidates)
        .or_else(|| first_numeric_column(table))
        .ok_or_else(|| missing(candidates))
}

/// Uses `requested` when the table has it, otherwise auto-detects.
///
/// With `numeric_fallback` unset only the candidate names are tried, which is
/// what categorical and timestamp columns need.
pub fn resolve_column(
    table: &Table,
    requested: Option<&str>,
    candidates: &[&str],
    numeric_fallback: bool,
) -> Result<String, AnalyticsError> {
    if let Some(name) = requested.filter(|name| table.has_column(name)) {
        return Ok(name.to_string());
    }
    if numeric_fallback {
        detect_column(table, candidates)
    } else {
        find_column(table, candidates).ok_or_else(|| missing(candidates))
    }
}

fn missing(candidates: &[&str]) -> AnalyticsError {
    AnalyticsError::MissingColumn {
        candidates: candidates.iter().map(|c| c.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Value;
    use rust_decimal_macros::dec;

    fn table(columns: Vec<&str>, rows: Vec<Vec<Value>>) -> Table {
        Table::from_rows(columns, rows)
    }

    #[test]
    fn priority_order_wins_over_column_order() {
        let t = table(
            vec!["amount", "amount_usd"],
            vec![vec![dec!(1).into(), dec!(2).into()]],
        );
        assert_eq!(detect_column(&t, AMOUNT_COLUMNS).unwrap(), "amount_usd");
    }

    #[test]
    fn falls_back_to_first_all_numeric_column() {
        let t = table(
            vec!["label", "mixed", "score", "other"],
            vec![
                vec!["a".into(), dec!(1).into(), dec!(3).into(), dec!(9).into()],
                vec!["b".into(), "x".into(), Value::Null, dec!(8).into()],
            ],
        );
        assert_eq!(detect_column(&t, AMOUNT_COLUMNS).unwrap(), "score");
    }

    #[test]
    fn all_null_column_is_not_numeric() {
        let t = table(
            vec!["blank", "n"],
            vec![vec![Value::Null, dec!(1).into()]],
        );
        assert_eq!(first_numeric_column(&t).unwrap(), "n");
    }

    #[test]
    fn no_candidate_and_no_numeric_column_is_missing() {
        let t = table(vec!["label"], vec![vec!["a".into()]]);
        let err = detect_column(&t, AMOUNT_COLUMNS).unwrap_err();
        assert!(matches!(err, AnalyticsError::MissingColumn { ref candidates } if candidates.len() == 5));

        assert!(detect_column(&Table::empty(), AMOUNT_COLUMNS).is_err());
    }

    #[test]
    fn detection_is_deterministic() {
        let t = table(
            vec!["x", "y"],
            vec![vec![dec!(1).into(), dec!(2).into()]],
        );
        let first = detect_column(&t, AMOUNT_COLUMNS).unwrap();
        for _ in 0..10 {
            assert_eq!(detect_column(&t, AMOUNT_COLUMNS).unwrap(), first);
        }
    }

    #[test]
    fn requested_column_is_used_only_when_present() {
        let t = table(
            vec!["vault", "tvl"],
            vec![vec!["v1".into(), dec!(5).into()]],
        );
        assert_eq!(resolve_column(&t, Some("tvl"), TVL_COLUMNS, true).unwrap(), "tvl");
        assert_eq!(
            resolve_column(&t, Some("network"), CATEGORY_COLUMNS, false).unwrap(),
            "vault"
        );
        assert!(resolve_column(&t, None, TIME_COLUMNS, false).is_err());
    }
}
