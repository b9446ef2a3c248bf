use keyring::Entry;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Error, Result};

const SERVICE_NAME: &str = "sqlman";
const CREDENTIALS_KEY: &str = "connection-passwords";

/// Where connection passwords live between sessions. The whole map is read
/// once at startup and rewritten on every change.
pub trait CredentialStore: Send + Sync {
    fn load_all(&self) -> Result<HashMap<String, String>>;
    fn save_all(&self, passwords: &HashMap<String, String>) -> Result<()>;
}

/// OS keychain: one entry holding a JSON map of connection name to password.
pub struct KeyringStore;

impl KeyringStore {
    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE_NAME, CREDENTIALS_KEY)
            .map_err(|e| Error::Credentials(format!("failed to create keyring entry: {}", e)))
    }
}

impl CredentialStore for KeyringStore {
    fn load_all(&self) -> Result<HashMap<String, String>> {
        match self.entry()?.get_password() {
            Ok(json) => serde_json::from_str(&json)
                .map_err(|e| Error::Credentials(format!("failed to parse credentials: {}", e))),
            Err(keyring::Error::NoEntry) => Ok(HashMap::new()),
            Err(e) => Err(Error::Credentials(format!("failed to retrieve credentials: {}", e))),
        }
    }

    fn save_all(&self, passwords: &HashMap<String, String>) -> Result<()> {
        let entry = self.entry()?;

        if passwords.is_empty() {
            // Delete the entry if no passwords remain
            return match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(Error::Credentials(format!("failed to delete credentials: {}", e))),
            };
        }

        let json = serde_json::to_string(passwords)?;
        entry
            .set_password(&json)
            .map_err(|e| Error::Credentials(format!("failed to store credentials: {}", e)))
    }
}

/// Process-local store, used when passwords must not leave memory and in tests.
#[derive(Default)]
pub struct MemoryStore {
    passwords: Mutex<HashMap<String, String>>,
}

impl CredentialStore for MemoryStore {
    fn load_all(&self) -> Result<HashMap<String, String>> {
        Ok(self
            .passwords
            .lock()
            .map_err(|e| Error::Credentials(e.to_string()))?
            .clone())
    }

    fn save_all(&self, passwords: &HashMap<String, String>) -> Result<()> {
        *self
            .passwords
            .lock()
            .map_err(|e| Error::Credentials(e.to_string()))? = passwords.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_the_map() {
        let store = MemoryStore::default();
        assert!(store.load_all().unwrap().is_empty());

        let mut passwords = HashMap::new();
        passwords.insert("prod".to_string(), "s3cret".to_string());
        store.save_all(&passwords).unwrap();

        assert_eq!(store.load_all().unwrap().get("prod").map(String::as_str), Some("s3cret"));
    }
}
