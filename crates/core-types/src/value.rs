use crate::error::CoreError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Timestamp layouts seen in query API results and CSV exports, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f UTC",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// A single loosely typed table cell.
///
/// No schema is enforced on incoming data, so a column may hold a mix of
/// variants. Timestamps are kept as text and parsed on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Decimal),
    Text(String),
}

impl Value {
    /// Converts a JSON cell from a query API record.
    ///
    /// Numbers outside the `Decimal` range are kept as their text so that
    /// summing them fails loudly instead of skipping them as nulls.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => parse_number(&n.to_string())
                .or_else(|| n.as_f64().and_then(Decimal::from_f64))
                .map(Value::Number)
                .unwrap_or_else(|| Value::Text(n.to_string())),
            serde_json::Value::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        }
    }

    /// Converts a raw CSV field. Empty fields are null, numeric-looking fields
    /// become numbers and everything else stays text.
    pub fn from_csv_field(field: &str) -> Self {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        match parse_number(trimmed) {
            Some(d) => Value::Number(d),
            None => Value::Text(trimmed.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    /// Returns the numeric content of the cell.
    ///
    /// Text that spells a number is accepted, since some sources quote their
    /// numeric columns. Nulls, booleans and other text fail with `Parse`.
    pub fn to_decimal(&self) -> Result<Decimal, CoreError> {
        match self {
            Value::Number(d) => Ok(*d),
            Value::Text(s) => parse_number(s.trim()).ok_or_else(|| CoreError::Parse {
                kind: "number",
                value: s.clone(),
            }),
            other => Err(CoreError::Parse {
                kind: "number",
                value: other.to_string(),
            }),
        }
    }

    /// Parses the cell as a UTC timestamp.
    pub fn to_datetime(&self) -> Result<NaiveDateTime, CoreError> {
        let Value::Text(raw) = self else {
            return Err(CoreError::Parse {
                kind: "timestamp",
                value: self.to_string(),
            });
        };
        parse_timestamp(raw.trim()).ok_or_else(|| CoreError::Parse {
            kind: "timestamp",
            value: raw.clone(),
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(d) => write!(f, "{}", d.normalize()),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Number(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

fn parse_number(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn csv_fields_are_typed_loosely() {
        assert_eq!(Value::from_csv_field(""), Value::Null);
        assert_eq!(Value::from_csv_field(" 12.5 "), Value::Number(dec!(12.5)));
        assert_eq!(Value::from_csv_field("1e3"), Value::Number(dec!(1000)));
        assert_eq!(
            Value::from_csv_field("Ethereum"),
            Value::Text("Ethereum".to_string())
        );
    }

    #[test]
    fn json_numbers_keep_their_digits() {
        let raw: serde_json::Value = serde_json::json!({"a": 1234.56, "b": 7, "c": null});
        assert_eq!(Value::from_json(&raw["a"]), Value::Number(dec!(1234.56)));
        assert_eq!(Value::from_json(&raw["b"]), Value::Number(dec!(7)));
        assert_eq!(Value::from_json(&raw["c"]), Value::Null);
    }

    #[test]
    fn out_of_range_json_numbers_are_not_nulls() {
        let cell = Value::from_json(&serde_json::json!(1.2e29));
        assert!(matches!(cell, Value::Text(_)), "{cell:?}");
        assert!(!cell.is_null());
        assert!(matches!(
            cell.to_decimal(),
            Err(CoreError::Parse { kind: "number", .. })
        ));
    }

    #[test]
    fn quoted_numbers_convert_but_words_do_not() {
        assert_eq!(Value::from("42").to_decimal().unwrap(), dec!(42));
        assert!(matches!(
            Value::from("n/a").to_decimal(),
            Err(CoreError::Parse { kind: "number", .. })
        ));
        assert!(Value::Null.to_decimal().is_err());
    }

    #[test]
    fn timestamps_in_common_layouts_parse() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        for raw in [
            "2024-01-15 10:30:00.000 UTC",
            "2024-01-15 10:30:00",
            "2024-01-15T10:30:00",
            "2024-01-15T10:30:00Z",
        ] {
            assert_eq!(Value::from(raw).to_datetime().unwrap(), expected, "{raw}");
        }
        let midnight = Value::from("2024-01-15").to_datetime().unwrap();
        assert_eq!(midnight.date(), expected.date());
    }

    #[test]
    fn garbage_timestamp_is_a_parse_error() {
        let err = Value::from("last tuesday").to_datetime().unwrap_err();
        assert!(matches!(err, CoreError::Parse { kind: "timestamp", .. }));
        assert!(Value::Number(dec!(1)).to_datetime().is_err());
    }
}
