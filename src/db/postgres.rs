use sqlx::postgres::types::{Oid, PgInterval};
use sqlx::postgres::{PgColumn, PgPoolOptions, PgRow};
use sqlx::{Column, Executor, PgPool, Row, TypeInfo};
use std::time::Duration;

use super::{dialect, StatementOutput};
use crate::models::{ColumnDef, ConnectionConfig, DatabaseSettings};

/// Create a PostgreSQL connection pool for the given configuration
pub async fn create_pool(
    config: &ConnectionConfig,
    settings: &DatabaseSettings,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(settings.connection_timeout_seconds))
        .connect(&config.connection_string())
        .await
}

/// Run one statement on the pool
pub async fn run(pool: &PgPool, sql: &str, max_rows: usize) -> Result<StatementOutput, sqlx::Error> {
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

fn column_defs(columns: &[PgColumn]) -> Vec<ColumnDef> {
    columns
        .iter()
        .map(|col| ColumnDef {
            name: col.name().to_string(),
            data_type: col.type_info().name().to_string(),
        })
        .collect()
}

fn json_f64(n: f64) -> serde_json::Value {
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or_else(|| serde_json::Value::String(n.to_string()))
}

/// Decode column `index` as `T`, mapping it to JSON. `None` when the column
/// is not decodable as `T`.
fn decode<'r, T, F>(row: &'r PgRow, index: usize, map: F) -> Option<serde_json::Value>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    F: FnOnce(T) -> serde_json::Value,
{
    row.try_get::<Option<T>, _>(index)
        .ok()
        .map(|v| v.map(map).unwrap_or(serde_json::Value::Null))
}

/// Extract a value from a row at the given index
fn extract_value(row: &PgRow, index: usize, type_name: &str) -> serde_json::Value {
    let upper_type = type_name.to_uppercase();

    // Array types are reported as e.g. "INT4[]"
    if upper_type.ends_with("[]") {
        return extract_array_value(row, index);
    }

    let value = match upper_type.as_str() {
        "INT2" => decode::<i16, _>(row, index, |n| n.into()),
        "INT4" => decode::<i32, _>(row, index, |n| n.into()),
        "INT8" => decode::<i64, _>(row, index, |n| n.into()),
        "OID" => decode::<Oid, _>(row, index, |oid| oid.0.into()),
        // Same wire format as OID, but sqlx only accepts the OID type name
        "REGCLASS" | "REGPROC" | "REGTYPE" => row
            .try_get_unchecked::<Option<Oid>, _>(index)
            .ok()
            .map(|v| v.map(|oid| oid.0.into()).unwrap_or(serde_json::Value::Null)),
        "FLOAT4" => decode::<f32, _>(row, index, |n| json_f64(n as f64)),
        "FLOAT8" => decode::<f64, _>(row, index, json_f64),
        // Decimal keeps full precision as a string
        "NUMERIC" => decode::<rust_decimal::Decimal, _>(row, index, |d| {
            serde_json::Value::String(d.to_string())
        }),
        "BOOL" => decode::<bool, _>(row, index, serde_json::Value::Bool),
        "JSON" | "JSONB" => decode::<serde_json::Value, _>(row, index, |v| v),
        "UUID" => decode::<uuid::Uuid, _>(row, index, |u| u.to_string().into()),
        "TIMESTAMP" => decode::<chrono::NaiveDateTime, _>(row, index, |dt| {
            dt.format("%Y-%m-%d %H:%M:%S%.f").to_string().into()
        }),
        "TIMESTAMPTZ" => decode::<chrono::DateTime<chrono::Utc>, _>(row, index, |dt| {
            dt.to_rfc3339().into()
        }),
        "DATE" => decode::<chrono::NaiveDate, _>(row, index, |d| d.to_string().into()),
        "TIME" => decode::<chrono::NaiveTime, _>(row, index, |t| {
            t.format("%H:%M:%S%.f").to_string().into()
        }),
        "INTERVAL" => decode::<PgInterval, _>(row, index, |iv| format_interval(&iv).into()),
        "INET" => decode::<ipnetwork::IpNetwork, _>(row, index, |ip| {
            // For single host addresses, don't show CIDR notation
            let is_single_host = match ip {
                ipnetwork::IpNetwork::V4(net) => net.prefix() == 32,
                ipnetwork::IpNetwork::V6(net) => net.prefix() == 128,
            };
            if is_single_host {
                ip.ip().to_string().into()
            } else {
                ip.to_string().into()
            }
        }),
        "CIDR" => decode::<ipnetwork::IpNetwork, _>(row, index, |ip| ip.to_string().into()),
        "MACADDR" => decode::<mac_address::MacAddress, _>(row, index, |mac| mac.to_string().into()),
        "BYTEA" => decode::<Vec<u8>, _>(row, index, |bytes| {
            format!("\\x{}", hex::encode(bytes)).into()
        }),
        _ => None,
    };

    value
        // Fallback: try to get as string (TEXT, VARCHAR, NAME, enums, ...)
        .or_else(|| decode::<String, _>(row, index, serde_json::Value::String))
        .unwrap_or(serde_json::Value::Null)
}

fn plural(n: i64, unit: &str) -> String {
    format!("{} {}{}", n, unit, if n.abs() != 1 { "s" } else { "" })
}

/// Render an interval the way psql does, e.g. `1 year 2 mons 3 days 04:05:06`
pub(crate) fn format_interval(interval: &PgInterval) -> String {
    let mut parts = Vec::new();

    let years = interval.months / 12;
    let months = interval.months % 12;
    if years != 0 {
        parts.push(plural(years.into(), "year"));
    }
    if months != 0 {
        parts.push(plural(months.into(), "mon"));
    }
    if interval.days != 0 {
        parts.push(plural(interval.days.into(), "day"));
    }

    if interval.microseconds != 0 {
        let sign = if interval.microseconds < 0 { "-" } else { "" };
        let micros_total = interval.microseconds.unsigned_abs();
        let total_secs = micros_total / 1_000_000;
        let micros = micros_total % 1_000_000;
        let clock = format!(
            "{}{:02}:{:02}:{:02}",
            sign,
            total_secs / 3600,
            (total_secs % 3600) / 60,
            total_secs % 60
        );
        if micros != 0 {
            parts.push(format!("{}.{:06}", clock, micros));
        } else {
            parts.push(clock);
        }
    }

    if parts.is_empty() {
        "00:00:00".to_string()
    } else {
        parts.join(" ")
    }
}

fn extract_array_value(row: &PgRow, index: usize) -> serde_json::Value {
    decode::<Vec<i64>, _>(row, index, |arr| arr.into_iter().collect())
        .or_else(|| decode::<Vec<i32>, _>(row, index, |arr| arr.into_iter().collect()))
        .or_else(|| decode::<Vec<f64>, _>(row, index, |arr| arr.into_iter().map(json_f64).collect()))
        .or_else(|| decode::<Vec<bool>, _>(row, index, |arr| arr.into_iter().collect()))
        .or_else(|| decode::<Vec<String>, _>(row, index, |arr| arr.into_iter().collect()))
        .unwrap_or(serde_json::Value::Null)
}
