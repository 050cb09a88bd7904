use crate::error::CoreError;
use crate::value::Value;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

/// An ordered, schemaless table of rows.
///
/// Column order is preserved from the source, which matters for the
/// "first numeric column" fallback used by column detection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// A borrowed view of a single row that can be indexed by column name.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> Row<'a> {
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// A table with no columns and no rows. Used as the stand-in for a dataset
    /// that could not be fetched.
    pub const fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Builds a table from column names and row values. Short rows are padded
    /// with nulls and long rows are truncated to the column count.
    pub fn from_rows<S: Into<String>>(columns: Vec<S>, rows: Vec<Vec<Value>>) -> Self {
        let mut table = Self::new(columns.into_iter().map(Into::into).collect());
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Builds a table from JSON records as returned by the query API.
    ///
    /// When the API supplies its column list it is used as the column order;
    /// otherwise columns appear in first-seen order. Keys missing from a
    /// record become nulls.
    pub fn from_records(records: &[Map<String, JsonValue>], column_order: Option<&[String]>) -> Self {
        let mut columns: Vec<String> = column_order.map(<[String]>::to_vec).unwrap_or_default();
        for record in records {
            for key in record.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.get(c).map(Value::from_json).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    /// Parses CSV text with a header row.
    pub fn from_csv(text: &str) -> Result<Self, CoreError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let mut table = Self::new(headers.iter().map(str::to_string).collect());

        for record in reader.records() {
            let record = record?;
            table.push_row(record.iter().map(Value::from_csv_field).collect());
        }

        tracing::debug!(
            columns = table.columns.len(),
            rows = table.rows.len(),
            "Parsed CSV table."
        );
        Ok(table)
    }

    pub fn push_row(&mut self, mut values: Vec<Value>) {
        values.resize(self.columns.len(), Value::Null);
        self.rows.push(values);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|values| Row {
            columns: &self.columns,
            values,
        })
    }

    /// All cells of one column, in row order. `None` if the column is absent.
    pub fn column(&self, column: &str) -> Option<impl Iterator<Item = &Value>> {
        let idx = self.columns.iter().position(|c| c == column)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }
}
