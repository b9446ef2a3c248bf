use sqlx::mysql::{MySqlColumn, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Executor, MySqlPool, Row, TypeInfo};
use std::time::Duration;

use super::{dialect, StatementOutput};
use crate::models::{ColumnDef, ConnectionConfig, DatabaseSettings};

/// Create a MySQL connection pool for the given configuration
pub async fn create_pool(
    config: &ConnectionConfig,
    settings: &DatabaseSettings,
) -> Result<MySqlPool, sqlx::Error> {
    MySqlPoolOptions::new()
        .max_connections(settings.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(settings.connection_timeout_seconds))
        .connect(&config.connection_string())
        .await
}

/// Run one statement on the pool
pub async fn run(pool: &MySqlPool, sql: &str, max_rows: usize) -> Result<StatementOutput, sqlx::Error> {
    if !dialect::returns_rows(sql) {
        let result = sqlx::query(sql).execute(pool).await?;
        return Ok(StatementOutput::affected(result.rows_affected()));
    }

    let rows = sqlx::query(sql).fetch_all(pool).await?;
    let columns = match rows.first() {
        Some(first_row) => column_defs(first_row.columns()),
        // No row to read the shape from; ask the server
        None => column_defs(pool.describe(sql).await?.columns()),
    };

    let total_rows = rows.len();
    let data = rows
        .iter()
        .take(max_rows)
        .map(|row| {
            columns
                .iter()
                .enumerate()
                .map(|(i, col)| extract_value(row, i, &col.data_type))
                .collect()
        })
        .collect();

    Ok(StatementOutput {
        columns,
        rows: data,
        total_rows,
        affected_rows: total_rows as u64,
    })
}

fn decode<'r, T, F>(row: &'r MySqlRow, index: usize, map: F) -> Option<serde_json::Value>
where
    T: sqlx::Decode<'r, sqlx::MySql> + sqlx::Type<sqlx::MySql>,
    F: FnOnce(T) -> serde_json::Value,
{
    row.try_get::<Option<T>, _>(index)
        .ok()
        .map(|v| v.map(map).unwrap_or(serde_json::Value::Null))
}

fn json_f64(n: f64) -> serde_json::Value {
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or_else(|| serde_json::Value::String(n.to_string()))
}

fn column_defs(columns: &[MySqlColumn]) -> Vec<ColumnDef> {
    columns
        .iter()
        .map(|col| ColumnDef {
            name: col.name().to_string(),
            data_type: col.type_info().name().to_string(),
        })
        .collect()
}

/// Extract a value from a row at the given index
fn extract_value(row: &MySqlRow, index: usize, type_name: &str) -> serde_json::Value {
    let upper_type = type_name.to_uppercase();
    let unsigned = upper_type.ends_with("UNSIGNED");
    let base_type = upper_type.trim_end_matches(" UNSIGNED");

    let value = match base_type {
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            if unsigned {
                decode::<u64, _>(row, index, |n| n.into())
            } else {
                decode::<i64, _>(row, index, |n| n.into())
            }
        }
        "BOOLEAN" => decode::<bool, _>(row, index, serde_json::Value::Bool),
        "FLOAT" => decode::<f32, _>(row, index, |n| json_f64(n as f64)),
        "DOUBLE" => decode::<f64, _>(row, index, json_f64),
        "DECIMAL" => decode::<rust_decimal::Decimal, _>(row, index, |d| {
            serde_json::Value::String(d.to_string())
        }),
        "JSON" => decode::<serde_json::Value, _>(row, index, |v| v),
        "DATETIME" => decode::<chrono::NaiveDateTime, _>(row, index, |dt| {
            dt.format("%Y-%m-%d %H:%M:%S%.f").to_string().into()
        }),
        "TIMESTAMP" => decode::<chrono::DateTime<chrono::Utc>, _>(row, index, |dt| {
            dt.to_rfc3339().into()
        }),
        "DATE" => decode::<chrono::NaiveDate, _>(row, index, |d| d.to_string().into()),
        "TIME" => decode::<chrono::NaiveTime, _>(row, index, |t| {
            t.format("%H:%M:%S%.f").to_string().into()
        }),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
            decode::<Vec<u8>, _>(row, index, |bytes| format!("\\x{}", hex::encode(bytes)).into())
        }
        _ => None,
    };

    value
        .or_else(|| decode::<String, _>(row, index, serde_json::Value::String))
        // Binary collations report text columns as bytes
        .or_else(|| {
            decode::<Vec<u8>, _>(row, index, |bytes| {
                String::from_utf8_lossy(&bytes).into_owned().into()
            })
        })
        .unwrap_or(serde_json::Value::Null)
}
