//! JSON files kept in the data directory: the saved connection list and the
//! query history.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::models::{
    ConnectionConfig, DatabaseKind, QueryHistory, QueryHistoryEntry, SslMode, PASSWORD_PLACEHOLDER,
};

/// On-disk shape of one saved connection. `type` stays a plain string so an
/// unknown vendor skips one entry instead of failing the whole file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredConnection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ssl_mode: Option<SslMode>,
}

impl From<&ConnectionConfig> for StoredConnection {
    fn from(config: &ConnectionConfig) -> Self {
        StoredConnection {
            kind: config.kind.to_string(),
            host: config.host.clone(),
            port: config.port,
            username: config.username.clone(),
            // Never write secrets to the file
            password: (!config.password.is_empty()).then(|| PASSWORD_PLACEHOLDER.to_string()),
            database: config.database.clone(),
            ssl_mode: (config.kind == DatabaseKind::Postgresql).then_some(config.ssl_mode),
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Save connection configurations, passwords replaced by a placeholder.
pub fn save_connections<'a>(
    path: &Path,
    configs: impl IntoIterator<Item = &'a ConnectionConfig>,
) -> Result<()> {
    let stored: BTreeMap<&str, StoredConnection> = configs
        .into_iter()
        .map(|config| (config.name.as_str(), StoredConnection::from(config)))
        .collect();

    ensure_parent(path)?;
    fs::write(path, serde_json::to_string_pretty(&stored)?)?;
    log::info!("Saved {} connection(s) to {}", stored.len(), path.display());
    Ok(())
}

/// Load connection configurations. Redacted passwords are restored from
/// `passwords`; entries whose secret is unavailable are skipped.
pub fn load_connections(
    path: &Path,
    passwords: &HashMap<String, String>,
) -> Result<Vec<ConnectionConfig>> {
    if !path.exists() {
        log::warn!("Connection file does not exist: {}", path.display());
        return Ok(vec![]);
    }

    let stored: BTreeMap<String, StoredConnection> = serde_json::from_str(&fs::read_to_string(path)?)?;
    let mut configs = Vec::with_capacity(stored.len());

    for (name, entry) in stored {
        let kind = match entry.kind.parse::<DatabaseKind>() {
            Ok(kind) => kind,
            Err(e) => {
                log::warn!("Skipping connection {}: {}", name, e);
                continue;
            }
        };

        let password = match entry.password.as_deref() {
            None | Some("") => String::new(),
            Some(PASSWORD_PLACEHOLDER) => match passwords.get(&name) {
                Some(secret) => secret.clone(),
                None => {
                    log::warn!("Skipping connection {}: password must be re-entered", name);
                    continue;
                }
            },
            Some(plain) => plain.to_string(),
        };

        configs.push(ConnectionConfig {
            name,
            kind,
            host: entry.host,
            port: entry.port,
            username: entry.username,
            password,
            database: entry.database,
            ssl_mode: entry.ssl_mode.unwrap_or_default(),
        });
    }

    log::info!("Loaded {} connection(s) from {}", configs.len(), path.display());
    Ok(configs)
}

/// Session state carried between invocations
#[derive(Debug, Default, Serialize, Deserialize)]
struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active_connection: Option<String>,
}

pub fn save_active_connection(path: &Path, name: Option<&str>) -> Result<()> {
    let session = Session {
        active_connection: name.map(str::to_string),
    };
    ensure_parent(path)?;
    fs::write(path, serde_json::to_string_pretty(&session)?)?;
    Ok(())
}

pub fn load_active_connection(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let session: Session = serde_json::from_str(&fs::read_to_string(path)?)?;
    Ok(session.active_connection)
}

pub fn save_history(path: &Path, history: &QueryHistory) -> Result<()> {
    let entries: Vec<&QueryHistoryEntry> = history.entries().collect();
    ensure_parent(path)?;
    fs::write(path, serde_json::to_string(&entries)?)?;
    Ok(())
}

/// Load saved history into a buffer of `capacity`; the newest entries win.
pub fn load_history(path: &Path, capacity: usize) -> Result<QueryHistory> {
    let mut history = QueryHistory::with_capacity(capacity);
    if path.exists() {
        let entries: Vec<QueryHistoryEntry> = serde_json::from_str(&fs::read_to_string(path)?)?;
        history.extend(entries);
    }
    Ok(history)
}
