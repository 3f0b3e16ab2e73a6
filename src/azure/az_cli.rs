//! ResourceBrowser backed by the Azure CLI.
//!
//! Authentication stays with `az`; this module only runs listing commands
//! and classifies their failures.

use super::browser::{BrowseResult, ResourceBrowser, ResourceItem, ScopeRef};
use crate::error::BacpacError;
use crate::traits::CommandExecutor;
use crate::workflow::ServerRef;
use anyhow::Result;
use log::{debug, warn};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::Arc;

pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// Command users are told to run when their login has expired
pub fn login_hint() -> String {
    format!("az login --scope {}", MANAGEMENT_SCOPE)
}

#[derive(Debug, Deserialize)]
struct AzAccount {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzServer {
    id: String,
    name: String,
    #[serde(default)]
    resource_group: Option<String>,
    #[serde(default)]
    fully_qualified_domain_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AzDatabase {
    name: String,
    #[serde(default)]
    id: Option<String>,
}

pub struct AzCliBrowser {
    command: Arc<dyn CommandExecutor>,
    working_dir: PathBuf,
}

impl AzCliBrowser {
    pub fn new(command: Arc<dyn CommandExecutor>, working_dir: PathBuf) -> Self {
        Self {
            command,
            working_dir,
        }
    }

    fn run_az<T: DeserializeOwned>(&self, args: &[&str]) -> BrowseResult<Vec<T>> {
        let mut full_args = args.to_vec();
        full_args.extend(["--output", "json", "--only-show-errors"]);
        debug!("Running az {}", full_args.join(" "));

        let output = self
            .command
            .execute("az", &full_args, &self.working_dir)
            .map_err(|e| BacpacError::Unreachable(format!("{:#}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("az {} failed: {}", args.join(" "), stderr.trim());
            return Err(classify_failure(&stderr));
        }

        let items: Vec<T> = serde_json::from_slice(&output.stdout).map_err(|e| {
            BacpacError::Unreachable(format!("unexpected output from az {}: {}", args.join(" "), e))
        })?;

        if items.is_empty() {
            return Err(BacpacError::Empty);
        }
        Ok(items)
    }

    fn find_resource_group(&self, server: &ServerRef, subscription: &str) -> BrowseResult<String> {
        let servers = self.list_servers(&ScopeRef::new(subscription))?;
        servers
            .into_iter()
            .find(|s| s.name.eq_ignore_ascii_case(&server.name))
            .and_then(|s| s.resource_group)
            .ok_or(BacpacError::Empty)
    }
}

impl ResourceBrowser for AzCliBrowser {
    fn list_accounts(&self) -> BrowseResult<Vec<ResourceItem>> {
        let accounts: Vec<AzAccount> = self.run_az(&["account", "list"])?;

        let mut items: Vec<ResourceItem> = accounts
            .into_iter()
            .filter(|a| a.state.as_deref().is_none_or(|s| s.eq_ignore_ascii_case("enabled")))
            .map(|a| {
                let name = if a.name.is_empty() {
                    "Unnamed".to_string()
                } else {
                    a.name
                };
                ResourceItem {
                    label: format!("{} ({})", name, a.id),
                    id: a.id,
                    name,
                    resource_group: None,
                    host: None,
                }
            })
            .collect();

        if items.is_empty() {
            return Err(BacpacError::Empty);
        }
        sort_by_label(&mut items);
        Ok(items)
    }

    fn list_servers(&self, scope: &ScopeRef) -> BrowseResult<Vec<ResourceItem>> {
        let servers: Vec<AzServer> =
            self.run_az(&["sql", "server", "list", "--subscription", &scope.id])?;

        let mut items: Vec<ResourceItem> = servers
            .into_iter()
            .map(|s| ResourceItem {
                label: s.name.clone(),
                resource_group: s.resource_group.or_else(|| resource_group_from_id(&s.id)),
                host: s.fully_qualified_domain_name,
                id: s.id,
                name: s.name,
            })
            .collect();

        sort_by_label(&mut items);
        Ok(items)
    }

    fn list_databases(&self, server: &ServerRef) -> BrowseResult<Vec<ResourceItem>> {
        let subscription = server.subscription_id.as_deref().ok_or_else(|| {
            BacpacError::Unreachable("no subscription is selected for this server".to_string())
        })?;

        let resource_group = match &server.resource_group {
            Some(group) => group.clone(),
            None => self.find_resource_group(server, subscription)?,
        };

        let databases: Vec<AzDatabase> = self.run_az(&[
            "sql",
            "db",
            "list",
            "--server",
            &server.name,
            "--resource-group",
            &resource_group,
            "--subscription",
            subscription,
        ])?;

        let mut items: Vec<ResourceItem> = databases
            .into_iter()
            .filter(|db| !db.name.eq_ignore_ascii_case("master"))
            .map(|db| ResourceItem {
                id: db.id.unwrap_or_else(|| db.name.clone()),
                label: db.name.clone(),
                name: db.name,
                resource_group: Some(resource_group.clone()),
                host: None,
            })
            .collect();

        if items.is_empty() {
            return Err(BacpacError::Empty);
        }
        sort_by_label(&mut items);
        Ok(items)
    }

    fn reauthenticate(&self) -> Result<()> {
        let code = self.command.execute_interactive(
            "az",
            &["login", "--scope", MANAGEMENT_SCOPE],
            &self.working_dir,
        )?;

        if code != 0 {
            anyhow::bail!("az login exited with code {}", code);
        }
        Ok(())
    }
}

/// Map az stderr to `AuthExpired` or `Unreachable`
fn classify_failure(stderr: &str) -> BacpacError {
    let lower = stderr.to_ascii_lowercase();
    let auth_markers = [
        "az login",
        "aadsts",
        "expired",
        "refresh token",
        "interactive authentication is needed",
    ];

    if auth_markers.iter().any(|marker| lower.contains(marker)) {
        return BacpacError::AuthExpired;
    }

    let first_line = stderr
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("az exited with an error");
    BacpacError::Unreachable(first_line.to_string())
}

/// `/subscriptions/<sub>/resourceGroups/<rg>/providers/...` -> `<rg>`
pub fn resource_group_from_id(id: &str) -> Option<String> {
    let mut segments = id.split('/');
    while let Some(segment) = segments.next() {
        if segment.eq_ignore_ascii_case("resourceGroups") {
            return segments
                .next()
                .filter(|rg| !rg.is_empty())
                .map(str::to_string);
        }
    }
    None
}

fn sort_by_label(items: &mut [ResourceItem]) {
    items.sort_by_key(|item| item.label.to_lowercase());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockCommandExecutor, MockCommandResult};

    const SERVERS_JSON: &str = r#"[
        {"id": "/subscriptions/s1/resourceGroups/rg-data/providers/Microsoft.Sql/servers/sales-sql",
         "name": "sales-sql", "resourceGroup": "rg-data",
         "fullyQualifiedDomainName": "sales-sql.database.windows.net"},
        {"id": "/subscriptions/s1/resourceGroups/rg-apps/providers/Microsoft.Sql/servers/apps-sql",
         "name": "apps-sql"}
    ]"#;

    fn browser(outputs: Vec<MockCommandResult>) -> (Arc<MockCommandExecutor>, AzCliBrowser) {
        let executor = Arc::new(MockCommandExecutor::with_outputs(outputs));
        let browser = AzCliBrowser::new(executor.clone(), PathBuf::from("."));
        (executor, browser)
    }

    fn server(resource_group: Option<&str>) -> ServerRef {
        ServerRef {
            name: "sales-sql".to_string(),
            host: "sales-sql.database.windows.net".to_string(),
            resource_group: resource_group.map(str::to_string),
            subscription_id: Some("s1".to_string()),
        }
    }

    #[test]
    fn test_list_accounts_labels_and_skips_disabled() {
        let (_, browser) = browser(vec![MockCommandResult::ok(
            "az account list",
            r#"[{"id": "b", "name": "Prod", "state": "Enabled"},
                {"id": "c", "name": "Old", "state": "Disabled"},
                {"id": "a", "name": "Dev"}]"#,
        )]);

        let accounts = browser.list_accounts().unwrap();
        let labels: Vec<&str> = accounts.iter().map(|a| a.label.as_str()).collect();
        assert_eq!(labels, vec!["Dev (a)", "Prod (b)"]);
    }

    #[test]
    fn test_expired_login_is_auth_expired() {
        let (_, browser) = browser(vec![MockCommandResult::failed(
            "az account list",
            1,
            "ERROR: AADSTS700082: The refresh token has expired due to inactivity.",
        )]);
        assert!(matches!(browser.list_accounts(), Err(BacpacError::AuthExpired)));
    }

    #[test]
    fn test_not_logged_in_is_auth_expired() {
        let (_, browser) = browser(vec![MockCommandResult::failed(
            "az sql server list",
            1,
            "ERROR: Please run 'az login' to setup account.",
        )]);
        let result = browser.list_servers(&ScopeRef::new("s1"));
        assert!(matches!(result, Err(BacpacError::AuthExpired)));
    }

    #[test]
    fn test_network_failure_is_unreachable() {
        let (_, browser) = browser(vec![MockCommandResult::failed(
            "az sql server list",
            1,
            "\nERROR: HTTPSConnectionPool(host='management.azure.com', port=443): Max retries exceeded\n",
        )]);
        match browser.list_servers(&ScopeRef::new("s1")) {
            Err(BacpacError::Unreachable(message)) => {
                assert!(message.starts_with("ERROR: HTTPSConnectionPool"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_missing_az_is_unreachable() {
        let (_, browser) = browser(vec![MockCommandResult::not_found("az")]);
        assert!(matches!(
            browser.list_accounts(),
            Err(BacpacError::Unreachable(_))
        ));
    }

    #[test]
    fn test_empty_list_is_empty() {
        let (_, browser) = browser(vec![MockCommandResult::ok("az sql server list", "[]")]);
        assert!(matches!(
            browser.list_servers(&ScopeRef::new("s1")),
            Err(BacpacError::Empty)
        ));
    }

    #[test]
    fn test_servers_carry_resource_group_and_host() {
        let (executor, browser) =
            browser(vec![MockCommandResult::ok("az sql server list", SERVERS_JSON)]);

        let servers = browser.list_servers(&ScopeRef::new("s1")).unwrap();
        assert_eq!(servers[0].name, "apps-sql");
        assert_eq!(servers[0].resource_group.as_deref(), Some("rg-apps"));
        assert_eq!(servers[0].host, None);
        assert_eq!(servers[1].resource_group.as_deref(), Some("rg-data"));
        assert_eq!(
            servers[1].host.as_deref(),
            Some("sales-sql.database.windows.net")
        );

        let args = &executor.calls()[0].args;
        assert!(args.windows(2).any(|w| w[0] == "--subscription" && w[1] == "s1"));
    }

    #[test]
    fn test_databases_hide_master() {
        let (executor, browser) = browser(vec![MockCommandResult::ok(
            "az sql db list",
            r#"[{"name": "master"}, {"name": "orders"}, {"name": "Archive"}]"#,
        )]);

        let databases = browser.list_databases(&server(Some("rg-data"))).unwrap();
        let names: Vec<&str> = databases.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Archive", "orders"]);

        let args = &executor.calls()[0].args;
        assert!(args.windows(2).any(|w| w[0] == "--resource-group" && w[1] == "rg-data"));
    }

    #[test]
    fn test_databases_look_up_resource_group_for_typed_server() {
        let (executor, browser) = browser(vec![
            MockCommandResult::ok("az sql server list", SERVERS_JSON),
            MockCommandResult::ok("az sql db list", r#"[{"name": "orders"}]"#),
        ]);

        let databases = browser.list_databases(&server(None)).unwrap();
        assert_eq!(databases.len(), 1);

        let calls = executor.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].args.contains(&"rg-data".to_string()));
    }

    #[test]
    fn test_only_master_is_empty() {
        let (_, browser) = browser(vec![MockCommandResult::ok(
            "az sql db list",
            r#"[{"name": "master"}]"#,
        )]);
        assert!(matches!(
            browser.list_databases(&server(Some("rg"))),
            Err(BacpacError::Empty)
        ));
    }

    #[test]
    fn test_reauthenticate_runs_az_login_interactively() {
        let (executor, browser) = browser(vec![]);
        browser.reauthenticate().unwrap();

        let calls = executor.calls();
        assert!(calls[0].interactive);
        assert_eq!(calls[0].args, vec!["login", "--scope", MANAGEMENT_SCOPE]);
    }

    #[test]
    fn test_resource_group_from_id() {
        assert_eq!(
            resource_group_from_id(
                "/subscriptions/s/resourceGroups/my-rg/providers/Microsoft.Sql/servers/x"
            ),
            Some("my-rg".to_string())
        );
        assert_eq!(resource_group_from_id("/subscriptions/s"), None);
    }
}
