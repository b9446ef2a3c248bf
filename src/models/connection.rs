use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// Placeholder written in place of secrets when connection lists are saved.
pub const PASSWORD_PLACEHOLDER: &str = "***";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Sqlite,
    Mysql,
    Postgresql,
    #[serde(rename = "sqlserver")]
    SqlServer,
}

impl DatabaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseKind::Sqlite => "sqlite",
            DatabaseKind::Mysql => "mysql",
            DatabaseKind::Postgresql => "postgresql",
            DatabaseKind::SqlServer => "sqlserver",
        }
    }

    pub fn default_port(&self) -> Option<u16> {
        match self {
            DatabaseKind::Sqlite => None,
            DatabaseKind::Mysql => Some(3306),
            DatabaseKind::Postgresql => Some(5432),
            DatabaseKind::SqlServer => Some(1433),
        }
    }

    fn default_username(&self) -> &'static str {
        match self {
            DatabaseKind::Mysql => "root",
            DatabaseKind::Postgresql => "postgres",
            DatabaseKind::Sqlite | DatabaseKind::SqlServer => "",
        }
    }
}

impl std::fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(DatabaseKind::Sqlite),
            "mysql" => Ok(DatabaseKind::Mysql),
            "postgresql" | "postgres" => Ok(DatabaseKind::Postgresql),
            "sqlserver" | "mssql" => Ok(DatabaseKind::SqlServer),
            other => Err(Error::UnsupportedDatabase(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    Disable,
    #[default]
    Prefer,
    Require,
}

impl std::fmt::Display for SslMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SslMode::Disable => write!(f, "disable"),
            SslMode::Prefer => write!(f, "prefer"),
            SslMode::Require => write!(f, "require"),
        }
    }
}

impl FromStr for SslMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            other => Err(Error::Config(format!("invalid ssl mode: {}", other))),
        }
    }
}

/// A named set of parameters identifying a target database and credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DatabaseKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    /// Database name, or the file path for SQLite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default)]
    pub ssl_mode: SslMode,
}

impl ConnectionConfig {
    pub fn new(name: impl Into<String>, kind: DatabaseKind) -> Self {
        ConnectionConfig {
            name: name.into(),
            kind,
            host: None,
            port: None,
            username: None,
            password: String::new(),
            database: None,
            ssl_mode: SslMode::default(),
        }
    }

    /// Convenience constructor for a SQLite file (or `:memory:`).
    pub fn sqlite(name: impl Into<String>, path: impl Into<String>) -> Self {
        ConnectionConfig {
            database: Some(path.into()),
            ..ConnectionConfig::new(name, DatabaseKind::Sqlite)
        }
    }

    pub fn host_or_default(&self) -> &str {
        self.host.as_deref().unwrap_or("localhost")
    }

    pub fn port_or_default(&self) -> Option<u16> {
        self.port.or_else(|| self.kind.default_port())
    }

    pub fn username_or_default(&self) -> &str {
        self.username
            .as_deref()
            .unwrap_or_else(|| self.kind.default_username())
    }

    pub fn database_or_default(&self) -> &str {
        match (&self.database, self.kind) {
            (Some(db), _) => db,
            (None, DatabaseKind::Sqlite) => ":memory:",
            (None, _) => "",
        }
    }

    /// Human-readable target, safe to display (never includes the password).
    pub fn target(&self) -> String {
        match self.kind {
            DatabaseKind::Sqlite => self.database_or_default().to_string(),
            _ => format!(
                "{}@{}:{}/{}",
                self.username_or_default(),
                self.host_or_default(),
                self.port_or_default().unwrap_or_default(),
                self.database_or_default()
            ),
        }
    }

    /// Build the driver connection string for this configuration.
    pub fn connection_string(&self) -> String {
        // URL encode username and password to handle special characters safely
        let username = urlencoding::encode(self.username_or_default());
        let password = urlencoding::encode(&self.password);
        let host = self.host_or_default();
        let port = self.port_or_default().unwrap_or_default();
        let database = self.database_or_default();

        match self.kind {
            DatabaseKind::Mysql => {
                format!("mysql://{}:{}@{}:{}/{}", username, password, host, port, database)
            }
            DatabaseKind::Postgresql => format!(
                "postgres://{}:{}@{}:{}/{}?sslmode={}",
                username, password, host, port, database, self.ssl_mode
            ),
            DatabaseKind::Sqlite => database.to_string(),
            DatabaseKind::SqlServer => format!(
                "Server=tcp:{},{};Database={};User Id={};Password={};TrustServerCertificate=true",
                host,
                port,
                database,
                self.username_or_default(),
                self.password
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Disconnected,
    Connected,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub name: String,
    pub kind: DatabaseKind,
    pub target: String,
    pub status: ConnectionStatus,
    pub is_active: bool,
    pub error: Option<String>,
}

impl From<&ConnectionConfig> for ConnectionInfo {
    fn from(config: &ConnectionConfig) -> Self {
        ConnectionInfo {
            name: config.name.clone(),
            kind: config.kind,
            target: config.target(),
            status: ConnectionStatus::Disconnected,
            is_active: false,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConnectionResult {
    pub success: bool,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}
