//! Secret store
//!
//! Provider credentials (API keys, OAuth-style tokens) live here, keyed by
//! provider id and secret kind. They are never written into the settings
//! files. Backing storage is a JSON file under the user's `.savepoint`
//! directory, restricted to the owner on Unix.

use crate::storage::JsonStore;
use crate::{Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Secrets file name inside the store directory
pub const SECRETS_FILE: &str = "secrets.json";

// ============================================================================
// Secret kinds
// ============================================================================

/// Kind of credential held for a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SecretKind {
    /// Plain API key
    ApiKey,

    /// OAuth-style token from a vendor sign-in flow
    OauthToken,
}

impl SecretKind {
    fn slot(&self) -> &'static str {
        match self {
            SecretKind::ApiKey => "apiKey",
            SecretKind::OauthToken => "oauthToken",
        }
    }
}

// ============================================================================
// SecretStore
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
struct SecretsFile {
    /// provider id -> slot -> value
    #[serde(default)]
    providers: HashMap<String, HashMap<String, String>>,
}

/// File-backed credential store
pub struct SecretStore {
    store: JsonStore,
    cache: Mutex<Option<SecretsFile>>,
}

impl SecretStore {
    pub fn new(store: JsonStore) -> Self {
        Self {
            store,
            cache: Mutex::new(None),
        }
    }

    /// Store under the user's global `.savepoint` directory
    pub fn global() -> Result<Self> {
        Ok(Self::new(JsonStore::global()?))
    }

    /// Fetch a credential
    pub fn get(&self, provider: &str, kind: SecretKind) -> Option<String> {
        let mut cache = self.cache.lock();
        let file = cache.get_or_insert_with(|| self.store.load_or_default(SECRETS_FILE));
        file.providers
            .get(provider)
            .and_then(|slots| slots.get(kind.slot()))
            .cloned()
    }

    /// Fetch a credential, falling back to an environment variable
    pub fn get_with_env(&self, provider: &str, kind: SecretKind, env_var: &str) -> Option<String> {
        self.get(provider, kind)
            .or_else(|| std::env::var(env_var).ok().filter(|v| !v.is_empty()))
    }

    /// Store a credential
    pub fn set(&self, provider: &str, kind: SecretKind, value: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(Error::Secret("Refusing to store an empty credential".into()));
        }

        let mut cache = self.cache.lock();
        let file = cache.get_or_insert_with(|| self.store.load_or_default(SECRETS_FILE));
        file.providers
            .entry(provider.to_string())
            .or_default()
            .insert(kind.slot().to_string(), value.trim().to_string());

        self.persist(file)
    }

    /// Delete a credential; missing entries are not an error
    pub fn delete(&self, provider: &str, kind: SecretKind) -> Result<()> {
        let mut cache = self.cache.lock();
        let file = cache.get_or_insert_with(|| self.store.load_or_default(SECRETS_FILE));

        if let Some(slots) = file.providers.get_mut(provider) {
            slots.remove(kind.slot());
            if slots.is_empty() {
                file.providers.remove(provider);
            }
        }

        self.persist(file)
    }

    fn persist(&self, file: &SecretsFile) -> Result<()> {
        self.store.save(SECRETS_FILE, file)?;
        restrict_permissions(&self.store.file_path(SECRETS_FILE));
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Could not restrict secrets file permissions: {}", e);
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &std::path::Path) {}

// ============================================================================
// Tests
// ============================================================================
