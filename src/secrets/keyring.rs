//! OS keyring access
//!
//! Linux uses `secret-tool` (libsecret Secret Service API: GNOME Keyring,
//! KDE Wallet), macOS uses `security` (login keychain). Secret values given
//! to those tools are always written on stdin, never passed as arguments.
//! Windows goes straight to Credential Manager through the Win32 API.

use super::store::{APP_ID, SecretStore};
use crate::prerequisites::HostOs;
use crate::traits::CommandExecutor;
use anyhow::{Context, Result};
use log::{debug, warn};
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use std::sync::Arc;

pub struct SystemKeyring {
    command: Arc<dyn CommandExecutor>,
    host: HostOs,
    working_dir: PathBuf,
    /// In-process store used on Windows instead of a command-line tool
    native: Option<Arc<dyn SecretStore>>,
}

impl SystemKeyring {
    pub fn new(command: Arc<dyn CommandExecutor>, host: HostOs) -> Self {
        Self {
            command,
            host,
            working_dir: std::env::temp_dir(),
            native: native_store(host),
        }
    }

    #[cfg(test)]
    fn with_native(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.native = Some(store);
        self
    }

    fn lookup_linux(&self, key: &str) -> Result<Option<SecretString>> {
        let output = self
            .command
            .execute(
                "secret-tool",
                &["lookup", "application", APP_ID, "key", key],
                &self.working_dir,
            )
            .context("Failed to run secret-tool")?;

        if !output.status.success() {
            return Ok(None);
        }
        Ok(non_empty_secret(output.stdout))
    }

    fn store_linux(&self, key: &str, secret: &SecretString) -> Result<()> {
        let label = format!("{} {}", APP_ID, key);
        let output = self
            .command
            .execute_with_input(
                "secret-tool",
                &["store", "--label", &label, "application", APP_ID, "key", key],
                secret.expose_secret().as_bytes(),
                &self.working_dir,
            )
            .context("secret-tool not found. Install libsecret-tools to remember passwords")?;

        if !output.status.success() {
            anyhow::bail!(
                "secret-tool store failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    fn lookup_macos(&self, key: &str) -> Result<Option<SecretString>> {
        let output = self
            .command
            .execute(
                "security",
                &["find-generic-password", "-s", APP_ID, "-a", key, "-w"],
                &self.working_dir,
            )
            .context("Failed to run security")?;

        if !output.status.success() {
            return Ok(None);
        }
        Ok(non_empty_secret(output.stdout))
    }

    fn store_macos(&self, key: &str, secret: &SecretString) -> Result<()> {
        // `security -i` reads commands from stdin, keeping -w out of argv
        let script = format!(
            "add-generic-password -U -s {} -a {} -w {}\n",
            quote(APP_ID),
            quote(key),
            quote(secret.expose_secret())
        );
        let output = self
            .command
            .execute_with_input("security", &["-i"], script.as_bytes(), &self.working_dir)
            .context("Failed to run security")?;

        if !output.status.success() {
            anyhow::bail!(
                "security add-generic-password failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

impl SecretStore for SystemKeyring {
    fn get(&self, key: &str) -> Result<Option<SecretString>> {
        debug!("Looking up stored password for {}", key);
        match (self.host, &self.native) {
            (HostOs::Linux, _) => self.lookup_linux(key),
            (HostOs::MacOs, _) => self.lookup_macos(key),
            (HostOs::Windows, Some(store)) => store.get(key),
            _ => Ok(None),
        }
    }

    fn set(&self, key: &str, secret: &SecretString) -> Result<()> {
        debug!("Storing password for {}", key);
        match (self.host, &self.native) {
            (HostOs::Linux, _) => self.store_linux(key, secret),
            (HostOs::MacOs, _) => self.store_macos(key, secret),
            (HostOs::Windows, Some(store)) => store.set(key, secret),
            _ => {
                warn!("No supported secret store on this platform");
                anyhow::bail!("no supported secret store on this platform")
            }
        }
    }
}

#[cfg(target_os = "windows")]
fn native_store(host: HostOs) -> Option<Arc<dyn SecretStore>> {
    match host {
        HostOs::Windows => Some(Arc::new(super::wincred::CredentialManager)),
        _ => None,
    }
}

#[cfg(not(target_os = "windows"))]
fn native_store(_host: HostOs) -> Option<Arc<dyn SecretStore>> {
    None
}

/// Tool output minus the trailing newline; `None` when empty
fn non_empty_secret(stdout: Vec<u8>) -> Option<SecretString> {
    let mut value = String::from_utf8_lossy(&stdout).into_owned();
    if value.ends_with('\n') {
        value.pop();
        if value.ends_with('\r') {
            value.pop();
        }
    }

    if value.is_empty() {
        None
    } else {
        Some(SecretString::from(value))
    }
}

/// Double-quote a word for the `security -i` command parser
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::CredentialBroker;
    use crate::secrets::store::{MockSecretStore, SecretScope, TargetKind};
    use crate::traits::{
        MockCommandExecutor, MockCommandResult, MockOutput, MockResponse, MockUserInput,
    };

    fn keyring(executor: &Arc<MockCommandExecutor>, host: HostOs) -> SystemKeyring {
        SystemKeyring::new(executor.clone(), host)
    }

    #[test]
    fn test_linux_store_writes_secret_on_stdin_only() {
        let executor = Arc::new(MockCommandExecutor::new());
        let store = keyring(&executor, HostOs::Linux);

        store
            .set("bacpacman:local-sql:localhost:sa", &SecretString::from("p@ss".to_string()))
            .unwrap();

        let calls = executor.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].command, "secret-tool");
        assert!(calls[0].args.iter().all(|a| !a.contains("p@ss")));
        assert_eq!(calls[0].stdin.as_deref(), Some("p@ss"));
    }

    #[test]
    fn test_linux_lookup_strips_trailing_newline() {
        let executor = Arc::new(MockCommandExecutor::with_outputs(vec![MockCommandResult::ok(
            "secret-tool lookup",
            "hunter2\n",
        )]));
        let store = keyring(&executor, HostOs::Linux);

        let secret = store.get("k").unwrap().unwrap();
        assert_eq!(secret.expose_secret(), "hunter2");
    }

    #[test]
    fn test_linux_lookup_miss_is_none() {
        let executor = Arc::new(MockCommandExecutor::with_outputs(vec![
            MockCommandResult::failed("secret-tool lookup", 1, ""),
        ]));
        let store = keyring(&executor, HostOs::Linux);
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_linux_store_without_secret_tool_fails() {
        let executor = Arc::new(MockCommandExecutor::with_outputs(vec![
            MockCommandResult::not_found("secret-tool store"),
        ]));
        let store = keyring(&executor, HostOs::Linux);
        let err = store
            .set("k", &SecretString::from("x".to_string()))
            .unwrap_err();
        assert!(format!("{:#}", err).contains("libsecret-tools"));
    }

    #[test]
    fn test_macos_store_uses_interactive_mode() {
        let executor = Arc::new(MockCommandExecutor::new());
        let store = keyring(&executor, HostOs::MacOs);

        store
            .set("k", &SecretString::from("with \"quote\"".to_string()))
            .unwrap();

        let calls = executor.calls();
        assert_eq!(calls[0].args, vec!["-i".to_string()]);
        assert_eq!(
            calls[0].stdin.as_deref(),
            Some("add-generic-password -U -s \"bacpacman\" -a \"k\" -w \"with \\\"quote\\\"\"\n")
        );
    }

    #[test]
    fn test_windows_uses_native_store_without_tools() {
        let executor = Arc::new(MockCommandExecutor::new());
        let native = Arc::new(MockSecretStore::new());
        let store = keyring(&executor, HostOs::Windows).with_native(native.clone());

        store.set("k", &SecretString::from("x".to_string())).unwrap();

        assert_eq!(store.get("k").unwrap().unwrap().expose_secret(), "x");
        assert_eq!(native.stored("k").as_deref(), Some("x"));
        assert!(executor.calls().is_empty());
    }

    #[test]
    fn test_windows_rerun_reuses_stored_password() {
        let executor = Arc::new(MockCommandExecutor::new());
        let native = Arc::new(MockSecretStore::new());
        let scope = SecretScope::new(TargetKind::LocalSql, "localhost");
        let output = MockOutput::new();

        // First run: one prompt, the answer lands in Credential Manager
        let first_input =
            MockUserInput::with_responses(vec![MockResponse::Password("pw".to_string())]);
        let first_store = keyring(&executor, HostOs::Windows).with_native(native.clone());
        let mut first = CredentialBroker::new(&first_store, &first_input, &output);
        first.resolve(&scope, "sa", true).unwrap();
        assert_eq!(first_input.asked().len(), 1);

        // Second run: a fresh keyring and broker, nothing scripted
        let second_input = MockUserInput::new();
        let second_store = keyring(&executor, HostOs::Windows).with_native(native.clone());
        let mut second = CredentialBroker::new(&second_store, &second_input, &output);
        let handle = second.resolve(&scope, "sa", true).unwrap();

        assert!(second_input.asked().is_empty());
        assert_eq!(second.take_secret(&handle).unwrap().expose_secret(), "pw");
        assert!(output.get_warnings().is_empty());
    }

    #[test]
    fn test_other_platforms_have_no_backend() {
        let executor = Arc::new(MockCommandExecutor::new());
        let store = keyring(&executor, HostOs::Other);

        assert!(store.get("k").unwrap().is_none());
        assert!(store.set("k", &SecretString::from("x".to_string())).is_err());
        assert!(executor.calls().is_empty());
    }
}
