pub mod credentials;
pub mod dialect;
pub mod mysql;
pub mod postgres;
pub mod sqlite;
pub mod store;

use sqlx::{MySqlPool, PgPool};

use crate::error::{Error, Result};
use crate::models::{ColumnDef, ConnectionConfig, DatabaseKind, DatabaseSettings};

/// What one statement produced, before timing and history are attached.
#[derive(Debug, Default)]
pub struct StatementOutput {
    pub columns: Vec<ColumnDef>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub total_rows: usize,
    pub affected_rows: u64,
}

impl StatementOutput {
    pub fn affected(affected_rows: u64) -> Self {
        StatementOutput {
            affected_rows,
            ..Default::default()
        }
    }
}

/// An open connection to one target database.
#[derive(Clone)]
pub enum DbHandle {
    Sqlite(sqlite::SqliteHandle),
    Postgres(PgPool),
    Mysql(MySqlPool),
}

impl DbHandle {
    /// Open a handle for `config`. Nothing is verified beyond what the driver
    /// does on connect; call [`DbHandle::ping`] for that.
    pub async fn open(config: &ConnectionConfig, settings: &DatabaseSettings) -> Result<Self> {
        match config.kind {
            DatabaseKind::Sqlite => Ok(DbHandle::Sqlite(sqlite::open(config.database_or_default())?)),
            DatabaseKind::Postgresql => Ok(DbHandle::Postgres(postgres::create_pool(config, settings).await?)),
            DatabaseKind::Mysql => Ok(DbHandle::Mysql(mysql::create_pool(config, settings).await?)),
            DatabaseKind::SqlServer => Err(Error::DriverUnavailable(config.kind)),
        }
    }

    pub fn kind(&self) -> DatabaseKind {
        match self {
            DbHandle::Sqlite(_) => DatabaseKind::Sqlite,
            DbHandle::Postgres(_) => DatabaseKind::Postgresql,
            DbHandle::Mysql(_) => DatabaseKind::Mysql,
        }
    }

    /// Run a trivial query to verify the connection
    pub async fn ping(&self) -> Result<()> {
        self.run("SELECT 1", 1).await.map(|_| ())
    }

    /// Execute one statement, keeping at most `max_rows` rows.
    pub async fn run(&self, sql: &str, max_rows: usize) -> Result<StatementOutput> {
        match self {
            DbHandle::Sqlite(handle) => handle.run(sql, max_rows).await,
            DbHandle::Postgres(pool) => Ok(postgres::run(pool, sql, max_rows).await?),
            DbHandle::Mysql(pool) => Ok(mysql::run(pool, sql, max_rows).await?),
        }
    }

    /// Abort the statement in flight. Pool-backed handles abort when the
    /// executing future is dropped, so only SQLite needs an explicit signal.
    pub fn interrupt(&self) {
        if let DbHandle::Sqlite(handle) = self {
            handle.interrupt();
        }
    }

    pub async fn close(&self) {
        match self {
            DbHandle::Sqlite(_) => {}
            DbHandle::Postgres(pool) => pool.close().await,
            DbHandle::Mysql(pool) => pool.close().await,
        }
    }
}
