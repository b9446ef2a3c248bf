use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::AppSettings;

const APP_DIR: &str = ".sql_manager";
const CONFIG_FILE: &str = "config.json";
const CONNECTIONS_FILE: &str = "connections.json";
const HISTORY_FILE: &str = "history.json";
const SESSION_FILE: &str = "session.json";
const SHELL_HISTORY_FILE: &str = "shell_history.txt";

/// `~/.sql_manager`, or the working directory when there is no home
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn default_config_path() -> PathBuf {
    default_data_dir().join(CONFIG_FILE)
}

/// Files the application keeps in its data directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    pub data_dir: PathBuf,
    pub connections: PathBuf,
    pub history: PathBuf,
    pub session: PathBuf,
    pub shell_history: PathBuf,
}

impl StoragePaths {
    pub fn new(data_dir: PathBuf) -> Self {
        StoragePaths {
            connections: data_dir.join(CONNECTIONS_FILE),
            history: data_dir.join(HISTORY_FILE),
            session: data_dir.join(SESSION_FILE),
            shell_history: data_dir.join(SHELL_HISTORY_FILE),
            data_dir,
        }
    }

    pub fn from_settings(settings: &AppSettings) -> Self {
        Self::new(settings.storage.data_dir.clone().unwrap_or_else(default_data_dir))
    }
}

/// Load settings. An explicitly named file must exist and parse; without
/// one, the default location is tried and defaults are used if it is absent.
pub fn load_settings(path: Option<&Path>) -> Result<AppSettings> {
    let (path, explicit) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (default_config_path(), false),
    };

    if !path.exists() {
        if explicit {
            return Err(Error::Config(format!("config file not found: {}", path.display())));
        }
        return Ok(AppSettings::default());
    }

    let text = fs::read_to_string(&path)?;
    serde_json::from_str(&text)
        .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(settings)?)?;
    log::info!("Saved settings to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExportFormat;

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_settings(Some(&dir.path().join("none.json"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_settings(Some(&path)), Err(Error::Config(_))));
    }

    #[test]
    fn saved_settings_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.json");

        let mut settings = AppSettings::default();
        settings.query.default_limit = 50;
        settings.export.default_format = ExportFormat::Xlsx;
        save_settings(&path, &settings).unwrap();

        let loaded = load_settings(Some(&path)).unwrap();
        assert_eq!(loaded.query.default_limit, 50);
        assert_eq!(loaded.export.default_format, ExportFormat::Xlsx);
        assert_eq!(loaded.query.history_size, 1000);
    }

    #[test]
    fn storage_paths_follow_data_dir() {
        let mut settings = AppSettings::default();
        settings.storage.data_dir = Some(PathBuf::from("/tmp/sqlman"));
        let paths = StoragePaths::from_settings(&settings);
        assert_eq!(paths.connections, PathBuf::from("/tmp/sqlman/connections.json"));
        assert_eq!(paths.history, PathBuf::from("/tmp/sqlman/history.json"));
    }
}
