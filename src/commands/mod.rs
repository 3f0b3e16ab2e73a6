pub mod authenticate;
pub mod export;
pub mod import;
pub mod list;
pub mod run_export;
pub mod scope;

pub use authenticate::AuthenticateCommand;
pub use export::ExportCommand;
pub use import::{ImportArgs, ImportCommand};
pub use list::ListCommand;
pub use run_export::{RunExportArgs, RunExportCommand};
pub use scope::ScopeCommand;

use crate::workflow::AuthMethod;
use clap::ValueEnum;

/// Authentication method accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AuthOption {
    /// Azure Active Directory (interactive, `/ua:True`)
    Aad,
    /// SQL Server login with a stored or prompted password
    Sql,
    /// Integrated Windows authentication
    Windows,
}

impl From<AuthOption> for AuthMethod {
    fn from(option: AuthOption) -> Self {
        match option {
            AuthOption::Aad => AuthMethod::ActiveDirectory,
            AuthOption::Sql => AuthMethod::SqlAuth,
            AuthOption::Windows => AuthMethod::WindowsAuth,
        }
    }
}
