use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::query_history::DEFAULT_HISTORY_SIZE;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "xlsx" => Some(ExportFormat::Xlsx),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub max_connections: u32,
    pub connection_timeout_seconds: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            max_connections: 10,
            connection_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    pub default_limit: usize,
    pub preview_limit: usize,
    pub history_size: usize,
    pub timeout_seconds: u64,
}

impl Default for QuerySettings {
    fn default() -> Self {
        QuerySettings {
            default_limit: 1000,
            preview_limit: 100,
            history_size: DEFAULT_HISTORY_SIZE,
            timeout_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub default_format: ExportFormat,
    pub include_headers: bool,
    pub null_as_empty: bool,
    /// Prefix CSV files with a UTF-8 byte order mark
    pub csv_bom: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        ExportSettings {
            default_format: ExportFormat::Csv,
            include_headers: true,
            null_as_empty: true,
            csv_bom: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Rotate the log file once it would grow past this size; `0` never rotates
    pub max_size_bytes: u64,
    /// Rotated files kept as `FILE.1` .. `FILE.N`
    pub backup_count: u32,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            level: "info".to_string(),
            file: None,
            max_size_bytes: 10 * 1024 * 1024,
            backup_count: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory for connections.json and history.json (default ~/.sql_manager)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    pub remember_passwords: bool,
    pub persist_history: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            data_dir: None,
            remember_passwords: true,
            persist_history: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub database: DatabaseSettings,
    pub query: QuerySettings,
    pub export: ExportSettings,
    pub logging: LoggingSettings,
    pub storage: StorageSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_merges_over_defaults() {
        let settings: AppSettings = serde_json::from_str(
            r#"{ "query": { "timeout_seconds": 5 }, "export": { "default_format": "xlsx" } }"#,
        )
        .unwrap();
        assert_eq!(settings.query.timeout_seconds, 5);
        assert_eq!(settings.query.default_limit, 1000);
        assert_eq!(settings.query.history_size, 1000);
        assert_eq!(settings.export.default_format, ExportFormat::Xlsx);
        assert!(settings.export.include_headers);
        assert_eq!(settings.database.max_connections, 10);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn export_format_from_extension() {
        assert_eq!(ExportFormat::from_extension("CSV"), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::from_extension("xlsx"), Some(ExportFormat::Xlsx));
        assert_eq!(ExportFormat::from_extension("txt"), None);
    }
}
