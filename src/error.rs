//! Crate-wide error type.
//!
//! Query execution failures do not travel as `Err`: the executor folds them
//! into a failed [`QueryResult`](crate::models::QueryResult). Everything else
//! (connection management, files, configuration) returns [`Error`].

use thiserror::Error;

use crate::models::DatabaseKind;

/// Errors produced by sqlman.
#[derive(Debug, Error)]
pub enum Error {
    /// The vendor tag is not one of the supported database types.
    #[error("unsupported database type: {0}")]
    UnsupportedDatabase(String),

    /// The vendor is known but no driver is compiled into this build.
    #[error("no driver available for {0} in this build")]
    DriverUnavailable(DatabaseKind),

    #[error("connection not found: {0}")]
    ConnectionNotFound(String),

    #[error("connection already exists: {0}")]
    DuplicateConnection(String),

    #[error("no database connection available")]
    NoActiveConnection,

    #[error("SQL query cannot be empty")]
    EmptyQuery,

    /// A statement run from the command line failed; the message is the
    /// database error.
    #[error("{0}")]
    QueryFailed(String),

    #[error("query timed out after {0}s")]
    Timeout(u64),

    #[error("query was cancelled")]
    Cancelled,

    /// Driver error message, already stripped of credentials.
    #[error("{0}")]
    Connect(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("credential store error: {0}")]
    Credentials(String),

    #[error("nothing to export: {0}")]
    NothingToExport(&'static str),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("shell error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),

    /// Background task failed to complete (panic or runtime shutdown).
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map the error to a process exit code (sysexits.h conventions).
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::UnsupportedDatabase(_)
            | Error::ConnectionNotFound(_)
            | Error::DuplicateConnection(_)
            | Error::EmptyQuery => 64, // EX_USAGE
            Error::QueryFailed(_) => 65,                                 // EX_DATAERR
            Error::NoActiveConnection | Error::NothingToExport(_) => 66, // EX_NOINPUT
            Error::DriverUnavailable(_) => 69,                          // EX_UNAVAILABLE
            Error::Connect(_) | Error::Timeout(_) => 75,                // EX_TEMPFAIL
            Error::Io(_) | Error::Csv(_) | Error::Xlsx(_) => 74,        // EX_IOERR
            Error::Config(_) | Error::Json(_) => 78,                    // EX_CONFIG
            Error::Credentials(_) => 77,                                // EX_NOPERM
            Error::Cancelled => 130,
            _ => 1,
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_errors_map_to_ex_usage() {
        assert_eq!(Error::EmptyQuery.exit_code(), 64);
        assert_eq!(Error::ConnectionNotFound("x".into()).exit_code(), 64);
        assert_eq!(Error::DriverUnavailable(DatabaseKind::SqlServer).exit_code(), 69);
        assert_eq!(Error::Config("bad".into()).exit_code(), 78);
    }

    #[test]
    fn driver_unavailable_names_the_vendor() {
        let msg = Error::DriverUnavailable(DatabaseKind::SqlServer).to_string();
        assert_eq!(msg, "no driver available for sqlserver in this build");
    }
}
