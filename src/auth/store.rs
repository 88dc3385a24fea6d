use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use keyring::Entry;

/// Keyring service name; entries are scoped to the device user.
const SERVICE_NAME: &str = "glowbook";

/// The three fixed slots the client persists between runs.
///
/// Wire names match the persisted layout of the mobile app's secure store,
/// so a device upgrading from an older build keeps its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    AccessToken,
    RefreshToken,
    CurrentUser,
}

impl CredentialKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKey::AccessToken => "accessToken",
            CredentialKey::RefreshToken => "refreshToken",
            CredentialKey::CurrentUser => "currentUser",
        }
    }
}

/// Durable key-value persistence for bearer tokens and the cached profile.
///
/// Implementations do no validation and track no expiry; they store and
/// return exactly what they were given. Absence is `Ok(None)`, not an error.
/// Real storage failures propagate to the caller and are never retried here.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, key: CredentialKey) -> Result<Option<String>>;
    async fn set(&self, key: CredentialKey, value: &str) -> Result<()>;

    /// Remove a slot. Deleting an already-absent slot is a no-op, which is
    /// what makes `logout` idempotent.
    async fn delete(&self, key: CredentialKey) -> Result<()>;
}

/// Production store backed by the OS keychain.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    /// Use a non-default service name (e.g. per-flavor builds).
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: CredentialKey) -> Result<Entry> {
        Entry::new(&self.service, key.as_str()).context("Failed to create keyring entry")
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for KeyringStore {
    async fn get(&self, key: CredentialKey) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read credential from keychain"),
        }
    }

    async fn set(&self, key: CredentialKey, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store credential in keychain")
    }

    async fn delete(&self, key: CredentialKey) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }
}

/// In-memory store for tests and ephemeral (non-persisted) sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<CredentialKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get(&self, key: CredentialKey) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(&key).cloned())
    }

    async fn set(&self, key: CredentialKey, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key, value.to_string());
        Ok(())
    }

    async fn delete(&self, key: CredentialKey) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get(CredentialKey::AccessToken).await.unwrap(), None);

        store.set(CredentialKey::AccessToken, "A1").await.unwrap();
        assert_eq!(
            store.get(CredentialKey::AccessToken).await.unwrap(),
            Some("A1".to_string())
        );

        // Overwrite is wholesale
        store.set(CredentialKey::AccessToken, "A2").await.unwrap();
        assert_eq!(
            store.get(CredentialKey::AccessToken).await.unwrap(),
            Some("A2".to_string())
        );

        store.delete(CredentialKey::AccessToken).await.unwrap();
        assert_eq!(store.get(CredentialKey::AccessToken).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let store = MemoryStore::new();
        store.delete(CredentialKey::RefreshToken).await.unwrap();
        store.delete(CredentialKey::RefreshToken).await.unwrap();
    }

    #[test]
    fn test_key_wire_names() {
        assert_eq!(CredentialKey::AccessToken.as_str(), "accessToken");
        assert_eq!(CredentialKey::RefreshToken.as_str(), "refreshToken");
        assert_eq!(CredentialKey::CurrentUser.as_str(), "currentUser");
    }
}
