use rusqlite::types::ValueRef;
use rusqlite::{Connection, InterruptHandle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::StatementOutput;
use crate::error::{Error, Result};
use crate::models::ColumnDef;

/// A single SQLite connection shared by all statements of a named connection.
/// Statements run on the blocking thread pool; `interrupt` aborts the one in
/// flight and drops any that are still waiting for the connection.
#[derive(Clone)]
pub struct SqliteHandle {
    conn: Arc<Mutex<Connection>>,
    interrupt: Arc<InterruptHandle>,
    // Bumped by every interrupt
    generation: Arc<AtomicU64>,
}

/// Open a SQLite database file, or an in-memory database for `:memory:`.
pub fn open(path: &str) -> Result<SqliteHandle> {
    let conn = Connection::open(path)?;
    let interrupt = Arc::new(conn.get_interrupt_handle());
    Ok(SqliteHandle {
        conn: Arc::new(Mutex::new(conn)),
        interrupt,
        generation: Arc::new(AtomicU64::new(0)),
    })
}

impl SqliteHandle {
    pub async fn run(&self, sql: &str, max_rows: usize) -> Result<StatementOutput> {
        let conn = Arc::clone(&self.conn);
        let generation = Arc::clone(&self.generation);
        let started = generation.load(Ordering::SeqCst);
        let sql = sql.to_string();

        let output = tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            if generation.load(Ordering::SeqCst) != started {
                return Err(Error::Cancelled);
            }
            Ok(run_statement(&conn, &sql, max_rows)?)
        })
        .await??;

        Ok(output)
    }

    pub fn interrupt(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.interrupt.interrupt();
    }
}

/// Execute one statement. Statements with result columns are read into rows,
/// everything else reports the number of changed rows.
pub(crate) fn run_statement(
    conn: &Connection,
    sql: &str,
    max_rows: usize,
) -> rusqlite::Result<StatementOutput> {
    let mut stmt = conn.prepare(sql)?;

    if stmt.column_count() == 0 {
        let affected = stmt.execute([])?;
        return Ok(StatementOutput::affected(affected as u64));
    }

    let mut columns: Vec<ColumnDef> = stmt
        .columns()
        .iter()
        .map(|col| ColumnDef {
            name: col.name().to_string(),
            data_type: col.decl_type().unwrap_or_default().to_uppercase(),
        })
        .collect();

    let mut data: Vec<Vec<serde_json::Value>> = Vec::new();
    let mut total_rows = 0usize;
    let mut rows = stmt.query([])?;

    while let Some(row) = rows.next()? {
        // Expression columns have no declared type; take it from the first row
        if total_rows == 0 {
            for (i, col) in columns.iter_mut().enumerate() {
                if col.data_type.is_empty() {
                    col.data_type = storage_class(row.get_ref(i)?).to_string();
                }
            }
        }

        total_rows += 1;
        if data.len() < max_rows {
            let values = (0..columns.len())
                .map(|i| row.get_ref(i).map(value_to_json))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            data.push(values);
        }
    }

    Ok(StatementOutput {
        columns,
        rows: data,
        total_rows,
        affected_rows: total_rows as u64,
    })
}

fn storage_class(value: ValueRef<'_>) -> &'static str {
    match value {
        ValueRef::Null => "NULL",
        ValueRef::Integer(_) => "INTEGER",
        ValueRef::Real(_) => "REAL",
        ValueRef::Text(_) => "TEXT",
        ValueRef::Blob(_) => "BLOB",
    }
}

fn value_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(n) => serde_json::Value::Number(n.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::String(f.to_string())),
        ValueRef::Text(bytes) => serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => serde_json::Value::String(format!("\\x{}", hex::encode(bytes))),
    }
}
