//! ResourceBrowser trait: the boundary to whatever lists subscriptions,
//! servers and databases.

use crate::error::BacpacError;
use crate::workflow::ServerRef;
use anyhow::Result;

/// Result of a listing call; errors are limited to `AuthExpired`,
/// `Unreachable` and `Empty`
pub type BrowseResult<T> = std::result::Result<T, BacpacError>;

/// A listed subscription, server or database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceItem {
    /// Opaque identifier (subscription id, resource id, database name)
    pub id: String,
    pub name: String,
    /// Text shown in selection prompts
    pub label: String,
    pub resource_group: Option<String>,
    /// Fully qualified host name, for servers
    pub host: Option<String>,
}

impl ResourceItem {
    #[cfg(test)]
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            label: name.clone(),
            name,
            resource_group: None,
            host: None,
        }
    }
}

/// Subscription the servers are listed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeRef {
    pub id: String,
    pub display_name: Option<String>,
}

impl ScopeRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }

    pub fn label(&self) -> String {
        match &self.display_name {
            Some(name) => format!("{} ({})", name, self.id),
            None => self.id.clone(),
        }
    }
}

pub trait ResourceBrowser: Send + Sync {
    /// Subscriptions visible to the signed-in account
    fn list_accounts(&self) -> BrowseResult<Vec<ResourceItem>>;

    /// SQL servers in a subscription
    fn list_servers(&self, scope: &ScopeRef) -> BrowseResult<Vec<ResourceItem>>;

    /// User databases on a server
    fn list_databases(&self, server: &ServerRef) -> BrowseResult<Vec<ResourceItem>>;

    /// Sign in again after `AuthExpired`
    fn reauthenticate(&self) -> Result<()>;
}

/// Scripted ResourceBrowser for tests
#[cfg(test)]
pub struct MockResourceBrowser {
    accounts: std::sync::Mutex<std::collections::VecDeque<BrowseResult<Vec<ResourceItem>>>>,
    servers: std::sync::Mutex<std::collections::VecDeque<BrowseResult<Vec<ResourceItem>>>>,
    databases: std::sync::Mutex<std::collections::VecDeque<BrowseResult<Vec<ResourceItem>>>>,
    reauth_count: std::sync::atomic::AtomicUsize,
    reauth_fails: bool,
    calls: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockResourceBrowser {
    pub fn new() -> Self {
        Self {
            accounts: Default::default(),
            servers: Default::default(),
            databases: Default::default(),
            reauth_count: std::sync::atomic::AtomicUsize::new(0),
            reauth_fails: false,
            calls: Default::default(),
        }
    }

    pub fn accounts(self, result: BrowseResult<Vec<ResourceItem>>) -> Self {
        self.accounts.lock().unwrap().push_back(result);
        self
    }

    pub fn servers(self, result: BrowseResult<Vec<ResourceItem>>) -> Self {
        self.servers.lock().unwrap().push_back(result);
        self
    }

    pub fn databases(self, result: BrowseResult<Vec<ResourceItem>>) -> Self {
        self.databases.lock().unwrap().push_back(result);
        self
    }

    pub fn failing_reauth(mut self) -> Self {
        self.reauth_fails = true;
        self
    }

    pub fn reauth_count(&self) -> usize {
        self.reauth_count.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Listing calls made, e.g. `["servers", "servers", "databases"]`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn next(
        &self,
        name: &str,
        queue: &std::sync::Mutex<std::collections::VecDeque<BrowseResult<Vec<ResourceItem>>>>,
    ) -> BrowseResult<Vec<ResourceItem>> {
        self.calls.lock().unwrap().push(name.to_string());
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BacpacError::Unreachable(format!("no scripted {}", name))))
    }
}

#[cfg(test)]
impl ResourceBrowser for MockResourceBrowser {
    fn list_accounts(&self) -> BrowseResult<Vec<ResourceItem>> {
        self.next("accounts", &self.accounts)
    }

    fn list_servers(&self, _scope: &ScopeRef) -> BrowseResult<Vec<ResourceItem>> {
        self.next("servers", &self.servers)
    }

    fn list_databases(&self, _server: &ServerRef) -> BrowseResult<Vec<ResourceItem>> {
        self.next("databases", &self.databases)
    }

    fn reauthenticate(&self) -> Result<()> {
        self.reauth_count
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.reauth_fails {
            anyhow::bail!("az login failed");
        }
        Ok(())
    }
}
