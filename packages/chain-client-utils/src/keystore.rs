use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::keys::{KeyError, KeyPair};

#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error("key store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed credentials file {0}: {1}")]
    Malformed(String, String),
    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Persistence capability for account signing keys, keyed by
/// `(network, account)`. Callers guarantee at most one writer per slot.
pub trait KeyStore: Send + Sync {
    fn set_key(
        &self,
        network_id: &str,
        account_id: &str,
        key_pair: &KeyPair,
    ) -> Result<(), KeyStoreError>;

    fn get_key(&self, network_id: &str, account_id: &str)
        -> Result<Option<KeyPair>, KeyStoreError>;
}

#[derive(Serialize, Deserialize)]
struct CredentialsFile {
    account_id: String,
    public_key: String,
    private_key: String,
}

/// Unencrypted file-system key store: one JSON credentials file per
/// account under `<credentials_dir>/<network_id>/<account_id>.json`.
pub struct FileKeyStore {
    credentials_dir: PathBuf,
}

impl FileKeyStore {
    pub fn new<P: AsRef<Path>>(credentials_dir: P) -> Self {
        Self {
            credentials_dir: credentials_dir.as_ref().to_path_buf(),
        }
    }

    fn credentials_path(&self, network_id: &str, account_id: &str) -> PathBuf {
        self.credentials_dir
            .join(network_id)
            .join(format!("{account_id}.json"))
    }
}

impl KeyStore for FileKeyStore {
    fn set_key(
        &self,
        network_id: &str,
        account_id: &str,
        key_pair: &KeyPair,
    ) -> Result<(), KeyStoreError> {
        let path = self.credentials_path(network_id, account_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let credentials = CredentialsFile {
            account_id: account_id.to_string(),
            public_key: key_pair.public_key(),
            private_key: key_pair.to_secret_string(),
        };
        let contents = serde_json::to_vec_pretty(&credentials)
            .map_err(|e| KeyStoreError::Malformed(path.display().to_string(), e.to_string()))?;
        fs::write(&path, contents)?;
        Ok(())
    }

    fn get_key(
        &self,
        network_id: &str,
        account_id: &str,
    ) -> Result<Option<KeyPair>, KeyStoreError> {
        let path = self.credentials_path(network_id, account_id);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read(&path)?;
        let credentials: CredentialsFile = serde_json::from_slice(&contents)
            .map_err(|e| KeyStoreError::Malformed(path.display().to_string(), e.to_string()))?;
        Ok(Some(KeyPair::from_string(&credentials.private_key)?))
    }
}

/// In-memory key store for tests and ephemeral runs.
#[derive(Default)]
pub struct InMemoryKeyStore {
    keys: Mutex<HashMap<(String, String), String>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for InMemoryKeyStore {
    fn set_key(
        &self,
        network_id: &str,
        account_id: &str,
        key_pair: &KeyPair,
    ) -> Result<(), KeyStoreError> {
        self.keys
            .lock()
            .expect("key store lock poisoned")
            .insert(
                (network_id.to_string(), account_id.to_string()),
                key_pair.to_secret_string(),
            );
        Ok(())
    }

    fn get_key(
        &self,
        network_id: &str,
        account_id: &str,
    ) -> Result<Option<KeyPair>, KeyStoreError> {
        let keys = self.keys.lock().expect("key store lock poisoned");
        match keys.get(&(network_id.to_string(), account_id.to_string())) {
            Some(secret) => Ok(Some(KeyPair::from_string(secret)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trips_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path());
        let key_pair = KeyPair::generate();

        store.set_key("testnet", "alice.testnet", &key_pair).unwrap();
        let loaded = store.get_key("testnet", "alice.testnet").unwrap().unwrap();
        assert_eq!(loaded.public_key(), key_pair.public_key());

        assert!(store.get_key("testnet", "bob.testnet").unwrap().is_none());
        assert!(store.get_key("mainnet", "alice.testnet").unwrap().is_none());
    }

    #[test]
    fn in_memory_store_round_trips_keys() {
        let store = InMemoryKeyStore::new();
        let key_pair = KeyPair::generate();

        store.set_key("testnet", "alice.testnet", &key_pair).unwrap();
        let loaded = store.get_key("testnet", "alice.testnet").unwrap().unwrap();
        assert_eq!(loaded.public_key(), key_pair.public_key());
        assert!(store.get_key("testnet", "missing").unwrap().is_none());
    }
}
