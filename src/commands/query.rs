use std::future::Future;
use std::time::{Duration, Instant};

use chrono::Utc;

use super::connection::{resolve_connection, sanitize_error};
use crate::db::{DbHandle, StatementOutput};
use crate::error::{Error, Result};
use crate::models::QueryResult;
use crate::state::AppState;

const LOGGED_SQL_CHARS: usize = 100;

/// Execute a SQL statement on the named (or active) connection.
///
/// Failures never surface as `Err`: they come back as a `QueryResult` with
/// `success == false`. Database failures are recorded in history, a missing
/// connection or blank input is not.
pub async fn execute_query(state: &AppState, sql: &str, connection: Option<&str>) -> QueryResult {
    execute_query_until(state, sql, connection, std::future::pending::<()>()).await
}

/// Like [`execute_query`], but abandons the statement when `cancel` resolves.
pub async fn execute_query_until<F>(
    state: &AppState,
    sql: &str,
    connection: Option<&str>,
    cancel: F,
) -> QueryResult
where
    F: Future<Output = ()>,
{
    execute(state, sql, connection, state.settings.query.default_limit, cancel).await
}

/// Like [`execute_query`], but keeps every row. Used when the result is
/// written to a file rather than shown.
pub async fn execute_query_for_export(state: &AppState, sql: &str, connection: Option<&str>) -> QueryResult {
    execute(state, sql, connection, usize::MAX, std::future::pending::<()>()).await
}

async fn execute<F>(state: &AppState, sql: &str, connection: Option<&str>, limit: usize, cancel: F) -> QueryResult
where
    F: Future<Output = ()>,
{
    let (name, handle) = match resolve_connection(state, connection).await {
        Ok(resolved) => resolved,
        Err(e) => {
            log::error!("Query failed: {}", e);
            return QueryResult::failure(e.to_string(), 0);
        }
    };

    let sql = sql.trim();
    if sql.is_empty() {
        return QueryResult::failure(Error::EmptyQuery.to_string(), 0);
    }

    let timeout_secs = state.settings.query.timeout_seconds;
    let start = Instant::now();

    let outcome = tokio::select! {
        res = run_bounded(&handle, sql, limit, timeout_secs) => res,
        _ = cancel => {
            handle.interrupt();
            Err(Error::Cancelled)
        }
    };

    let elapsed = start.elapsed();
    let result = match outcome {
        Ok(output) => to_result(output, limit, elapsed),
        Err(e) => QueryResult::failure(sanitize_error(&e.to_string()), elapsed.as_millis() as u64),
    };

    log_query(sql, &result, elapsed);
    state.history().record(sql, &result, &name);

    result
}

/// Run with the configured timeout; `0` disables it
async fn run_bounded(
    handle: &DbHandle,
    sql: &str,
    limit: usize,
    timeout_secs: u64,
) -> Result<StatementOutput> {
    if timeout_secs == 0 {
        return handle.run(sql, limit).await;
    }

    match tokio::time::timeout(Duration::from_secs(timeout_secs), handle.run(sql, limit)).await {
        Ok(res) => res,
        Err(_) => {
            handle.interrupt();
            Err(Error::Timeout(timeout_secs))
        }
    }
}

fn to_result(output: StatementOutput, limit: usize, elapsed: Duration) -> QueryResult {
    QueryResult {
        success: true,
        has_more: output.total_rows > limit,
        columns: output.columns,
        rows: output.rows,
        error: None,
        execution_time_ms: elapsed.as_millis() as u64,
        affected_rows: output.affected_rows,
        total_rows: output.total_rows,
        executed_at: Utc::now(),
    }
}

fn log_query(sql: &str, result: &QueryResult, elapsed: Duration) {
    let shown: String = sql.chars().take(LOGGED_SQL_CHARS).collect();
    let ellipsis = if sql.chars().count() > LOGGED_SQL_CHARS { "..." } else { "" };

    if result.success {
        log::info!(
            "[QUERY] SUCCESS - {:.3}s - {}{}",
            elapsed.as_secs_f64(),
            shown,
            ellipsis
        );
    } else {
        log::error!(
            "[QUERY] FAILED - {:.3}s - {}{} - Error: {}",
            elapsed.as_secs_f64(),
            shown,
            ellipsis,
            result.error.as_deref().unwrap_or("unknown")
        );
    }
}

/// Execute statements one after another. A failing statement does not stop
/// the batch.
pub async fn execute_batch<S: AsRef<str>>(
    state: &AppState,
    statements: &[S],
    connection: Option<&str>,
) -> Vec<QueryResult> {
    let mut results = Vec::with_capacity(statements.len());

    for (i, statement) in statements.iter().enumerate() {
        let result = execute_query(state, statement.as_ref(), connection).await;
        if !result.success {
            log::warn!(
                "Statement {} of {} failed: {}",
                i + 1,
                statements.len(),
                result.error.as_deref().unwrap_or("unknown")
            );
        }
        results.push(result);
    }

    results
}
