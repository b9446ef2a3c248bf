use std::path::Path;

use crate::db::store;
use crate::error::Result;
use crate::models::QueryHistoryEntry;
use crate::state::AppState;

pub const DEFAULT_RECENT_LIMIT: usize = 20;

/// The newest `limit` entries, oldest first
pub fn recent_queries(state: &AppState, limit: Option<usize>) -> Vec<QueryHistoryEntry> {
    state.history().recent(limit.unwrap_or(DEFAULT_RECENT_LIMIT))
}

pub fn search_history(state: &AppState, keyword: &str) -> Vec<QueryHistoryEntry> {
    state.history().search(keyword)
}

pub fn clear_history(state: &AppState) {
    state.history().clear();
    log::info!("Query history cleared");
}

/// Write the history to `path` when `storage.persist_history` is on
pub fn save_history(state: &AppState, path: &Path) -> Result<()> {
    if !state.settings.storage.persist_history {
        return Ok(());
    }
    store::save_history(path, &state.history())
}

/// Replace the in-memory history with the one saved at `path`
pub fn load_history(state: &AppState, path: &Path) -> Result<usize> {
    if !state.settings.storage.persist_history {
        return Ok(0);
    }
    let history = store::load_history(path, state.settings.query.history_size)?;
    let count = history.len();
    state.replace_history(history);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{add_connection, execute_query};
    use crate::db::credentials::MemoryStore;
    use crate::models::{AppSettings, ConnectionConfig};

    #[tokio::test]
    async fn history_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let state = AppState::new(AppSettings::default(), Box::new(MemoryStore::default()));
        add_connection(&state, ConnectionConfig::sqlite("mem", ":memory:")).await.unwrap();
        execute_query(&state, "SELECT 1", None).await;
        execute_query(&state, "select 'users'", None).await;
        save_history(&state, &path).unwrap();

        let restored = AppState::new(AppSettings::default(), Box::new(MemoryStore::default()));
        assert_eq!(load_history(&restored, &path).unwrap(), 2);
        assert_eq!(search_history(&restored, "USERS").len(), 1);
        assert_eq!(recent_queries(&restored, Some(1))[0].connection_name, "mem");

        clear_history(&restored);
        assert!(recent_queries(&restored, None).is_empty());
    }

    #[test]
    fn persistence_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let mut settings = AppSettings::default();
        settings.storage.persist_history = false;
        let state = AppState::new(settings, Box::new(MemoryStore::default()));
        save_history(&state, &path).unwrap();
        assert!(!path.exists());
    }
}
