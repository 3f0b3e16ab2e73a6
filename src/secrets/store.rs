//! SecretStore trait and key composition for stored passwords.

use anyhow::Result;
use secrecy::SecretString;
use std::fmt;

/// Application identifier used as the service/attribute in the OS keyring
pub const APP_ID: &str = "bacpacman";

/// Kind of server a password belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    AzureSql,
    LocalSql,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::AzureSql => "azure-sql",
            TargetKind::LocalSql => "local-sql",
        }
    }
}

/// What a password unlocks: a server of a given kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretScope {
    pub kind: TargetKind,
    pub host: String,
}

impl SecretScope {
    pub fn new(kind: TargetKind, host: impl Into<String>) -> Self {
        Self {
            kind,
            host: host.into(),
        }
    }

    /// Store key for a user on this scope: `bacpacman:<kind>:<host>:<username>`
    pub fn key_for(&self, username: &str) -> String {
        format!(
            "{}:{}:{}:{}",
            APP_ID,
            self.kind.as_str(),
            self.host.to_ascii_lowercase(),
            username
        )
    }
}

impl fmt::Display for SecretScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.host, self.kind.as_str())
    }
}

/// Platform secret store.
///
/// Implementations must never write the value anywhere but the store itself.
pub trait SecretStore: Send + Sync {
    /// Look up a secret; `Ok(None)` when nothing is stored under `key`
    fn get(&self, key: &str) -> Result<Option<SecretString>>;

    /// Store or replace a secret
    fn set(&self, key: &str, secret: &SecretString) -> Result<()>;
}

/// In-memory secret store for tests
#[cfg(test)]
pub struct MockSecretStore {
    values: std::sync::Mutex<std::collections::HashMap<String, String>>,
    unavailable: bool,
    gets: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockSecretStore {
    pub fn new() -> Self {
        Self {
            values: std::sync::Mutex::new(std::collections::HashMap::new()),
            unavailable: false,
            gets: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// A store whose backend is missing: reads find nothing, writes fail
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new()
        }
    }

    pub fn with_secret(self, key: &str, value: &str) -> Self {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn stored(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl SecretStore for MockSecretStore {
    fn get(&self, key: &str) -> Result<Option<SecretString>> {
        self.gets.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(self
            .values
            .lock()
            .unwrap()
            .get(key)
            .map(|v| SecretString::from(v.clone())))
    }

    fn set(&self, key: &str, secret: &SecretString) -> Result<()> {
        use secrecy::ExposeSecret;
        if self.unavailable {
            anyhow::bail!("no secret store backend available");
        }
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), secret.expose_secret().to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_composes_kind_host_and_user() {
        let scope = SecretScope::new(TargetKind::AzureSql, "Contoso.database.windows.net");
        assert_eq!(
            scope.key_for("reporting"),
            "bacpacman:azure-sql:contoso.database.windows.net:reporting"
        );
    }

    #[test]
    fn test_keys_differ_by_kind() {
        let azure = SecretScope::new(TargetKind::AzureSql, "db1");
        let local = SecretScope::new(TargetKind::LocalSql, "db1");
        assert_ne!(azure.key_for("sa"), local.key_for("sa"));
    }
}
