use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: String,
}

/// Outcome of a single statement. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub success: bool,
    pub columns: Vec<ColumnDef>,
    /// Row values in column order.
    pub rows: Vec<Vec<serde_json::Value>>,
    pub error: Option<String>,
    pub execution_time_ms: u64,
    /// Rows returned for row-producing statements, driver rowcount otherwise.
    pub affected_rows: u64,
    /// Rows produced before `default_limit` was applied.
    pub total_rows: usize,
    pub has_more: bool,
    pub executed_at: DateTime<Utc>,
}

impl QueryResult {
    pub fn failure(error: impl Into<String>, execution_time_ms: u64) -> Self {
        QueryResult {
            success: false,
            columns: vec![],
            rows: vec![],
            error: Some(error.into()),
            execution_time_ms,
            affected_rows: 0,
            total_rows: 0,
            has_more: false,
            executed_at: Utc::now(),
        }
    }

    /// True when the statement produced a result set (possibly empty).
    pub fn has_result_set(&self) -> bool {
        self.success && !self.columns.is_empty()
    }

    /// Rows as flat key-value records keyed by column name.
    pub fn records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row.iter())
                    .map(|(col, value)| (col.name.clone(), value.clone()))
                    .collect()
            })
            .collect()
    }

    /// Values of the first column rendered as text (table lists and the like).
    pub fn first_column_strings(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.first())
            .map(value_to_string)
            .collect()
    }

    pub fn statistics(&self) -> ResultStatistics {
        let columns = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let values: Vec<&serde_json::Value> =
                    self.rows.iter().filter_map(|row| row.get(i)).collect();
                let non_null: Vec<&&serde_json::Value> =
                    values.iter().filter(|v| !v.is_null()).collect();
                let distinct: HashSet<String> =
                    non_null.iter().map(|v| v.to_string()).collect();
                let numbers: Vec<f64> = non_null.iter().filter_map(|v| v.as_f64()).collect();
                let numeric = if !numbers.is_empty() && numbers.len() == non_null.len() {
                    let min = numbers.iter().cloned().fold(f64::INFINITY, f64::min);
                    let max = numbers.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                    let mean = numbers.iter().sum::<f64>() / numbers.len() as f64;
                    Some(NumericSummary { min, max, mean })
                } else {
                    None
                };
                ColumnStatistics {
                    name: col.name.clone(),
                    data_type: col.data_type.clone(),
                    non_null: non_null.len(),
                    distinct: distinct.len(),
                    numeric,
                }
            })
            .collect();

        ResultStatistics {
            row_count: self.rows.len(),
            column_count: self.columns.len(),
            columns,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultStatistics {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnStatistics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnStatistics {
    pub name: String,
    pub data_type: String,
    pub non_null: usize,
    pub distinct: usize,
    pub numeric: Option<NumericSummary>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct NumericSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Render a cell for text output: strings unquoted, NULL as `NULL`.
pub fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> QueryResult {
        QueryResult {
            success: true,
            columns: vec![
                ColumnDef { name: "name".into(), data_type: "TEXT".into() },
                ColumnDef { name: "price".into(), data_type: "REAL".into() },
            ],
            rows: vec![
                vec![json!("Apple"), json!(1.5)],
                vec![json!("Banana"), json!(0.5)],
                vec![json!("Apple"), serde_json::Value::Null],
            ],
            error: None,
            execution_time_ms: 3,
            affected_rows: 3,
            total_rows: 3,
            has_more: false,
            executed_at: Utc::now(),
        }
    }

    #[test]
    fn records_are_keyed_by_column() {
        let records = sample().records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1]["name"], json!("Banana"));
        assert_eq!(records[2]["price"], serde_json::Value::Null);
    }

    #[test]
    fn statistics_count_nulls_and_distinct_values() {
        let stats = sample().statistics();
        assert_eq!(stats.row_count, 3);
        assert_eq!(stats.column_count, 2);
        assert_eq!(stats.columns[0].non_null, 3);
        assert_eq!(stats.columns[0].distinct, 2);
        assert!(stats.columns[0].numeric.is_none());

        let price = stats.columns[1].numeric.expect("numeric column");
        assert_eq!(stats.columns[1].non_null, 2);
        assert_eq!(price.min, 0.5);
        assert_eq!(price.max, 1.5);
        assert_eq!(price.mean, 1.0);
    }

    #[test]
    fn failure_has_no_result_set() {
        let result = QueryResult::failure("boom", 7);
        assert!(!result.success);
        assert!(!result.has_result_set());
        assert_eq!(result.error.as_deref(), Some("boom"));
    }
}
