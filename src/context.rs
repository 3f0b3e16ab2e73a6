use crate::azure::{AzCliBrowser, ResourceBrowser};
use crate::prerequisites::HostOs;
use crate::secrets::{SecretStore, SystemKeyring};
use crate::traits::{
    CommandExecutor, FileSystem, InquireUserInput, Output, RealCommandExecutor, RealFileSystem,
    TerminalOutput, UserInput,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Application context that holds all dependencies for dependency injection
#[derive(Clone)]
pub struct Context {
    pub fs: Arc<dyn FileSystem>,
    pub input: Arc<dyn UserInput>,
    pub output: Arc<dyn Output>,
    pub command: Arc<dyn CommandExecutor>,
    pub secrets: Arc<dyn SecretStore>,
    pub browser: Arc<dyn ResourceBrowser>,
}

impl Context {
    /// Create a new context with real implementations (for production use)
    pub fn new(working_dir: PathBuf) -> Self {
        let command: Arc<dyn CommandExecutor> = Arc::new(RealCommandExecutor::new());
        Self {
            fs: Arc::new(RealFileSystem),
            input: Arc::new(InquireUserInput),
            output: Arc::new(TerminalOutput),
            secrets: Arc::new(SystemKeyring::new(command.clone(), HostOs::current())),
            browser: Arc::new(AzCliBrowser::new(command.clone(), working_dir)),
            command,
        }
    }

    /// Create a test context with specific mock implementations
    #[cfg(test)]
    pub fn test_with(
        fs: Arc<dyn FileSystem>,
        input: Arc<dyn UserInput>,
        output: Arc<dyn Output>,
        command: Arc<dyn CommandExecutor>,
        secrets: Arc<dyn SecretStore>,
        browser: Arc<dyn ResourceBrowser>,
    ) -> Self {
        Self {
            fs,
            input,
            output,
            command,
            secrets,
            browser,
        }
    }
}
