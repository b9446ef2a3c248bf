use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::db::credentials::CredentialStore;
use crate::db::DbHandle;
use crate::models::{AppSettings, ConnectionConfig, QueryHistory};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Application state shared by every command
pub struct AppState {
    pub settings: AppSettings,

    /// Open connection handles, keyed by connection name
    connections: Mutex<HashMap<String, DbHandle>>,

    /// Known connection configurations, opened or not
    connection_configs: Mutex<BTreeMap<String, ConnectionConfig>>,

    /// Connection used when a command names none
    active_connection: Mutex<Option<String>>,

    history: Mutex<QueryHistory>,

    /// In-memory copy of the credential store (loaded once at startup)
    password_cache: Mutex<HashMap<String, String>>,

    credentials: Box<dyn CredentialStore>,
}

impl AppState {
    pub fn new(settings: AppSettings, credentials: Box<dyn CredentialStore>) -> Self {
        let history = QueryHistory::with_capacity(settings.query.history_size);
        Self {
            settings,
            connections: Mutex::new(HashMap::new()),
            connection_configs: Mutex::new(BTreeMap::new()),
            active_connection: Mutex::new(None),
            history: Mutex::new(history),
            password_cache: Mutex::new(HashMap::new()),
            credentials,
        }
    }

    pub fn credentials(&self) -> &dyn CredentialStore {
        self.credentials.as_ref()
    }

    /// Initialize the password cache from the credential store (call once at startup)
    pub fn init_password_cache(&self, passwords: HashMap<String, String>) {
        *lock(&self.password_cache) = passwords;
    }

    pub fn passwords(&self) -> HashMap<String, String> {
        lock(&self.password_cache).clone()
    }

    /// Apply `f` to the password cache and return the updated map for persisting
    pub fn update_passwords(
        &self,
        f: impl FnOnce(&mut HashMap<String, String>),
    ) -> HashMap<String, String> {
        let mut cache = lock(&self.password_cache);
        f(&mut cache);
        cache.clone()
    }

    /// Get a connection handle by name
    pub fn get_handle(&self, name: &str) -> Option<DbHandle> {
        lock(&self.connections).get(name).cloned()
    }

    pub fn add_handle(&self, name: String, handle: DbHandle) {
        lock(&self.connections).insert(name, handle);
    }

    pub fn remove_handle(&self, name: &str) -> Option<DbHandle> {
        lock(&self.connections).remove(name)
    }

    pub fn has_handle(&self, name: &str) -> bool {
        lock(&self.connections).contains_key(name)
    }

    pub fn drain_handles(&self) -> Vec<(String, DbHandle)> {
        lock(&self.connections).drain().collect()
    }

    pub fn get_config(&self, name: &str) -> Option<ConnectionConfig> {
        lock(&self.connection_configs).get(name).cloned()
    }

    /// Add or update a connection config. The first one becomes active.
    pub fn set_config(&self, config: ConnectionConfig) {
        let mut active = lock(&self.active_connection);
        if active.is_none() {
            *active = Some(config.name.clone());
        }
        lock(&self.connection_configs).insert(config.name.clone(), config);
    }

    /// Remove a connection config; an active connection passes to the next
    /// remaining name, if any.
    pub fn remove_config(&self, name: &str) -> Option<ConnectionConfig> {
        let mut active = lock(&self.active_connection);
        let mut configs = lock(&self.connection_configs);
        let removed = configs.remove(name);
        if active.as_deref() == Some(name) {
            *active = configs.keys().next().cloned();
        }
        removed
    }

    pub fn configs(&self) -> Vec<ConnectionConfig> {
        lock(&self.connection_configs).values().cloned().collect()
    }

    pub fn active_connection(&self) -> Option<String> {
        lock(&self.active_connection).clone()
    }

    /// Make `name` the active connection; false if it is unknown
    pub fn set_active(&self, name: &str) -> bool {
        if !lock(&self.connection_configs).contains_key(name) {
            return false;
        }
        *lock(&self.active_connection) = Some(name.to_string());
        true
    }

    pub fn clear_active(&self) {
        *lock(&self.active_connection) = None;
    }

    pub fn history(&self) -> MutexGuard<'_, QueryHistory> {
        lock(&self.history)
    }

    pub fn replace_history(&self, history: QueryHistory) {
        *lock(&self.history) = history;
    }
}
