//! The record of every choice made during one run.
//!
//! Fields are set once, in dependency order. Changing a field means
//! restarting its step, which also clears everything that depends on it.

use crate::azure::ScopeRef;
use crate::error::BacpacError;
use crate::secrets::{CredentialHandle, SecretScope, TargetKind};
use std::fmt;
use std::path::{Path, PathBuf};

pub const AZURE_SQL_SUFFIX: &str = ".database.windows.net";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Azure SQL database to a local .bacpac file
    Export,
    /// Local .bacpac file into a database server
    Import,
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flow::Export => write!(f, "Export"),
            Flow::Import => write!(f, "Import"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    ActiveDirectory,
    SqlAuth,
    WindowsAuth,
}

impl AuthMethod {
    pub fn label(&self) -> &'static str {
        match self {
            AuthMethod::ActiveDirectory => "Azure Active Directory",
            AuthMethod::SqlAuth => "SQL Server authentication",
            AuthMethod::WindowsAuth => "Windows authentication",
        }
    }

    /// Whether a username and password have to be resolved
    pub fn needs_password(&self) -> bool {
        matches!(self, AuthMethod::SqlAuth)
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Azure SQL, found through the resource browser
    Remote,
    /// A server reachable without Azure
    Local,
}

/// A database server, as selected or typed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRef {
    /// Short name (Azure) or the name given by the user (local)
    pub name: String,
    /// Address handed to sqlpackage
    pub host: String,
    pub resource_group: Option<String>,
    pub subscription_id: Option<String>,
}

impl ServerRef {
    /// Server typed by hand: a bare name gets the Azure SQL domain appended
    pub fn typed(name: &str, subscription_id: Option<String>) -> Self {
        let name = strip_protocol(name.trim());
        let (short, host) = if name.contains('.') {
            let short = name.split('.').next().unwrap_or(name);
            (short.to_string(), name.to_string())
        } else {
            (name.to_string(), format!("{}{}", name, AZURE_SQL_SUFFIX))
        };
        Self {
            name: short,
            host,
            resource_group: None,
            subscription_id,
        }
    }

    /// Local server: connected to exactly as named
    pub fn local(name: &str) -> Self {
        let name = name.trim();
        Self {
            name: name.to_string(),
            host: name.to_string(),
            resource_group: None,
            subscription_id: None,
        }
    }
}

/// `tcp:` as pasted from a connection string; the command builder adds its own
fn strip_protocol(name: &str) -> &str {
    match name.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("tcp:") => name[4..].trim_start(),
        _ => name,
    }
}

/// Steps whose result is stored in the state, in dependency order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    AuthMethod,
    AccountScope,
    Server,
    Database,
    Credential,
    FilePath,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::AuthMethod => "authentication method",
            Field::AccountScope => "subscription",
            Field::Server => "server",
            Field::Database => "database",
            Field::Credential => "credential",
            Field::FilePath => "file",
        }
    }

    /// Fields cleared together with this one
    fn dependents(&self) -> &'static [Field] {
        match self {
            Field::AuthMethod => &[Field::Credential],
            Field::AccountScope => &[Field::Server, Field::Database, Field::Credential],
            Field::Server => &[Field::Database, Field::Credential],
            Field::Database | Field::Credential | Field::FilePath => &[],
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelectionState {
    flow: Flow,
    auth_method: Option<AuthMethod>,
    account_scope: Option<ScopeRef>,
    target: Option<Target>,
    server: Option<ServerRef>,
    database: Option<String>,
    credential: Option<CredentialHandle>,
    file_path: Option<PathBuf>,
    frozen: bool,
}

impl SelectionState {
    pub fn new(flow: Flow) -> Self {
        Self {
            flow,
            auth_method: None,
            account_scope: None,
            target: None,
            server: None,
            database: None,
            credential: None,
            file_path: None,
            frozen: false,
        }
    }

    pub fn flow(&self) -> Flow {
        self.flow
    }

    pub fn auth_method(&self) -> Option<AuthMethod> {
        self.auth_method
    }

    pub fn account_scope(&self) -> Option<&ScopeRef> {
        self.account_scope.as_ref()
    }

    pub fn target(&self) -> Option<Target> {
        self.target
    }

    pub fn server(&self) -> Option<&ServerRef> {
        self.server.as_ref()
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn credential(&self) -> Option<&CredentialHandle> {
        self.credential.as_ref()
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    #[cfg(test)]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn is_set(&self, field: Field) -> bool {
        match field {
            Field::AuthMethod => self.auth_method.is_some(),
            Field::AccountScope => self.account_scope.is_some(),
            Field::Server => self.server.is_some(),
            Field::Database => self.database.is_some(),
            Field::Credential => self.credential.is_some(),
            Field::FilePath => self.file_path.is_some(),
        }
    }

    pub fn set_auth_method(&mut self, method: AuthMethod) -> Result<(), BacpacError> {
        self.check_unset(Field::AuthMethod)?;
        self.auth_method = Some(method);
        Ok(())
    }

    pub fn set_account_scope(&mut self, scope: ScopeRef) -> Result<(), BacpacError> {
        self.check_unset(Field::AccountScope)?;
        self.account_scope = Some(scope);
        Ok(())
    }

    /// Server and whether it is reached through Azure
    pub fn set_server(&mut self, server: ServerRef, target: Target) -> Result<(), BacpacError> {
        self.check_unset(Field::Server)?;
        self.server = Some(server);
        self.target = Some(target);
        Ok(())
    }

    pub fn set_database(&mut self, database: impl Into<String>) -> Result<(), BacpacError> {
        self.check_unset(Field::Database)?;
        self.require(Field::Database, Field::Server)?;
        self.database = Some(database.into());
        Ok(())
    }

    pub fn set_credential(&mut self, handle: CredentialHandle) -> Result<(), BacpacError> {
        self.check_unset(Field::Credential)?;
        self.require(Field::Credential, Field::AuthMethod)?;
        self.require(Field::Credential, Field::Server)?;
        self.credential = Some(handle);
        Ok(())
    }

    pub fn set_file_path(&mut self, path: impl Into<PathBuf>) -> Result<(), BacpacError> {
        self.check_unset(Field::FilePath)?;
        self.file_path = Some(path.into());
        Ok(())
    }

    /// Clear `field` and every field that depends on it
    pub fn restart_step(&mut self, field: Field) -> Result<(), BacpacError> {
        if self.frozen {
            return Err(BacpacError::Frozen);
        }
        self.clear(field);
        for dependent in field.dependents() {
            self.clear(*dependent);
        }
        Ok(())
    }

    /// Lock the state once the summary is confirmed
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Secret store scope of the selected server
    pub fn secret_scope(&self) -> Option<SecretScope> {
        let server = self.server.as_ref()?;
        let kind = match self.target? {
            Target::Remote => TargetKind::AzureSql,
            Target::Local => TargetKind::LocalSql,
        };
        Some(SecretScope::new(kind, server.host.clone()))
    }

    /// Rows shown at confirmation, in display order
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![("Operation", self.flow.to_string())];

        if let Some(method) = self.auth_method {
            rows.push(("Authentication", method.label().to_string()));
        }
        if let Some(scope) = &self.account_scope {
            rows.push(("Subscription", scope.label()));
        }
        if let Some(server) = &self.server {
            rows.push(("Server", server.host.clone()));
        }
        if let Some(database) = &self.database {
            rows.push(("Database", database.clone()));
        }
        if let Some(credential) = &self.credential {
            rows.push(("Username", credential.username.clone()));
        }
        if let Some(path) = &self.file_path {
            let label = match self.flow {
                Flow::Export => "Output file",
                Flow::Import => "Input file",
            };
            rows.push((label, path.display().to_string()));
        }
        rows
    }

    fn clear(&mut self, field: Field) {
        match field {
            Field::AuthMethod => self.auth_method = None,
            Field::AccountScope => self.account_scope = None,
            Field::Server => {
                self.server = None;
                self.target = None;
            }
            Field::Database => self.database = None,
            Field::Credential => self.credential = None,
            Field::FilePath => self.file_path = None,
        }
    }

    fn check_unset(&self, field: Field) -> Result<(), BacpacError> {
        if self.frozen {
            return Err(BacpacError::Frozen);
        }
        if self.is_set(field) {
            return Err(BacpacError::FieldAlreadySet {
                field: field.name(),
            });
        }
        Ok(())
    }

    fn require(&self, field: Field, requires: Field) -> Result<(), BacpacError> {
        if self.is_set(requires) {
            Ok(())
        } else {
            Err(BacpacError::OutOfOrder {
                field: field.name(),
                requires: requires.name(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_server_gets_azure_domain() {
        let server = ServerRef::typed("sales-sql", Some("sub".to_string()));
        assert_eq!(server.name, "sales-sql");
        assert_eq!(server.host, "sales-sql.database.windows.net");

        let qualified = ServerRef::typed("sales-sql.database.windows.net", None);
        assert_eq!(qualified.name, "sales-sql");
        assert_eq!(qualified.host, "sales-sql.database.windows.net");
    }

    #[test]
    fn test_typed_server_drops_pasted_tcp_prefix() {
        let pasted = ServerRef::typed("TCP:sales-sql.database.windows.net", None);
        assert_eq!(pasted.name, "sales-sql");
        assert_eq!(pasted.host, "sales-sql.database.windows.net");

        let bare = ServerRef::typed("tcp:sales-sql", None);
        assert_eq!(bare.host, "sales-sql.database.windows.net");
    }

    #[test]
    fn test_field_is_set_once() {
        let mut state = SelectionState::new(Flow::Export);
        state.set_auth_method(AuthMethod::ActiveDirectory).unwrap();

        let err = state.set_auth_method(AuthMethod::SqlAuth).unwrap_err();
        assert!(matches!(err, BacpacError::FieldAlreadySet { .. }));
        assert_eq!(state.auth_method(), Some(AuthMethod::ActiveDirectory));
    }

    #[test]
    fn test_database_requires_server() {
        let mut state = SelectionState::new(Flow::Export);
        let err = state.set_database("orders").unwrap_err();
        assert!(matches!(
            err,
            BacpacError::OutOfOrder {
                field: "database",
                requires: "server"
            }
        ));
    }

    #[test]
    fn test_restart_clears_dependents() {
        let mut state = SelectionState::new(Flow::Export);
        state.set_account_scope(ScopeRef::new("sub")).unwrap();
        state
            .set_server(ServerRef::typed("a", None), Target::Remote)
            .unwrap();
        state.set_database("orders").unwrap();
        state.set_file_path("orders.bacpac").unwrap();

        state.restart_step(Field::Server).unwrap();

        assert!(state.server().is_none());
        assert!(state.target().is_none());
        assert!(state.database().is_none());
        assert!(state.account_scope().is_some());
        assert!(state.file_path().is_some());

        state
            .set_server(ServerRef::typed("b", None), Target::Remote)
            .unwrap();
        assert_eq!(state.server().unwrap().name, "b");
    }

    #[test]
    fn test_frozen_state_rejects_changes() {
        let mut state = SelectionState::new(Flow::Import);
        state.set_file_path("x.bacpac").unwrap();
        state.freeze();

        assert!(matches!(
            state.set_auth_method(AuthMethod::WindowsAuth),
            Err(BacpacError::Frozen)
        ));
        assert!(matches!(
            state.restart_step(Field::FilePath),
            Err(BacpacError::Frozen)
        ));
    }

    #[test]
    fn test_secret_scope_follows_target() {
        let mut state = SelectionState::new(Flow::Import);
        assert!(state.secret_scope().is_none());

        state
            .set_server(ServerRef::local("localhost\\SQLEXPRESS"), Target::Local)
            .unwrap();
        let scope = state.secret_scope().unwrap();
        assert_eq!(scope.kind, TargetKind::LocalSql);
        assert_eq!(scope.host, "localhost\\SQLEXPRESS");
    }

    #[test]
    fn test_summary_rows() {
        let mut state = SelectionState::new(Flow::Import);
        state.set_file_path("orders.bacpac").unwrap();
        state.set_auth_method(AuthMethod::WindowsAuth).unwrap();
        state
            .set_server(ServerRef::local("localhost"), Target::Local)
            .unwrap();
        state.set_database("orders").unwrap();

        let rows = state.summary();
        assert_eq!(
            rows,
            vec![
                ("Operation", "Import".to_string()),
                ("Authentication", "Windows authentication".to_string()),
                ("Server", "localhost".to_string()),
                ("Database", "orders".to_string()),
                ("Input file", "orders.bacpac".to_string()),
            ]
        );
    }
}
