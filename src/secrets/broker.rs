//! Resolves database passwords: secret store first, prompt second.

use super::store::{SecretScope, SecretStore};
use crate::error::{BacpacError, is_cancelled};
use crate::traits::{Output, UserInput};
use log::{debug, warn};
use secrecy::{ExposeSecret, SecretString};

/// Reference to a resolved password. Holds the store key, never the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialHandle {
    pub scope: SecretScope,
    pub username: String,
    key: String,
    persisted: bool,
}

impl CredentialHandle {
    /// Whether the password lives in the secret store (and will be reused)
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }
}

/// Password kept in memory only because the secret store refused it
struct PendingSecret {
    key: String,
    secret: SecretString,
}

pub struct CredentialBroker<'a> {
    store: &'a dyn SecretStore,
    input: &'a dyn UserInput,
    output: &'a dyn Output,
    pending: Option<PendingSecret>,
}

impl<'a> CredentialBroker<'a> {
    pub fn new(
        store: &'a dyn SecretStore,
        input: &'a dyn UserInput,
        output: &'a dyn Output,
    ) -> Self {
        Self {
            store,
            input,
            output,
            pending: None,
        }
    }

    /// Find a password for `identity` on `scope`, prompting when allowed.
    pub fn resolve(
        &mut self,
        scope: &SecretScope,
        identity: &str,
        prompt_if_missing: bool,
    ) -> Result<CredentialHandle, BacpacError> {
        let key = scope.key_for(identity);

        match self.store.get(&key) {
            Ok(Some(_)) => {
                debug!("Using stored password for {}", key);
                return Ok(CredentialHandle {
                    scope: scope.clone(),
                    username: identity.to_string(),
                    key,
                    persisted: true,
                });
            }
            Ok(None) => debug!("No stored password for {}", key),
            Err(e) => warn!("Secret store lookup failed for {}: {:#}", key, e),
        }

        if !prompt_if_missing {
            return Err(BacpacError::CredentialUnavailable(format!(
                "no stored password for '{}' on {} and prompting is disabled",
                identity, scope.host
            )));
        }

        let secret = self
            .input
            .password(&format!("Enter password for {} on {}:", identity, scope.host))
            .map_err(|e| {
                if is_cancelled(&e) {
                    BacpacError::CredentialUnavailable("password entry was cancelled".to_string())
                } else {
                    BacpacError::CredentialUnavailable(format!("{:#}", e))
                }
            })?;

        if secret.expose_secret().is_empty() {
            return Err(BacpacError::CredentialUnavailable(
                "an empty password was entered".to_string(),
            ));
        }

        let persisted = match self.store(scope, identity, &secret) {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not store password for {}: {:#}", key, e);
                self.output.warning(
                    "No usable secret store was found; the password will be used for this run only.",
                );
                self.pending = Some(PendingSecret {
                    key: key.clone(),
                    secret,
                });
                false
            }
        };

        Ok(CredentialHandle {
            scope: scope.clone(),
            username: identity.to_string(),
            key,
            persisted,
        })
    }

    /// Persist a password keyed by scope and identity
    pub fn store(
        &self,
        scope: &SecretScope,
        identity: &str,
        secret: &SecretString,
    ) -> anyhow::Result<()> {
        self.store.set(&scope.key_for(identity), secret)
    }

    /// Hand out the password behind `handle`. The in-memory copy, if any, is
    /// released by this call.
    pub fn take_secret(&mut self, handle: &CredentialHandle) -> Result<SecretString, BacpacError> {
        if self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.key == handle.key)
        {
            if let Some(pending) = self.pending.take() {
                return Ok(pending.secret);
            }
        }

        match self.store.get(&handle.key) {
            Ok(Some(secret)) => Ok(secret),
            Ok(None) => Err(BacpacError::CredentialUnavailable(format!(
                "the stored password for '{}' on {} has disappeared",
                handle.username, handle.scope.host
            ))),
            Err(e) => Err(BacpacError::CredentialUnavailable(format!("{:#}", e))),
        }
    }

    /// True while a password is held in memory
    #[cfg(test)]
    pub fn holds_secret(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::store::{MockSecretStore, TargetKind};
    use crate::traits::{MockOutput, MockResponse, MockUserInput};

    fn scope() -> SecretScope {
        SecretScope::new(TargetKind::LocalSql, "localhost")
    }

    #[test]
    fn test_second_resolve_does_not_prompt() {
        let store = MockSecretStore::new();
        // Exactly one scripted password: a second prompt would fail the test
        let input = MockUserInput::with_responses(vec![MockResponse::Password("pw1".to_string())]);
        let output = MockOutput::new();
        let mut broker = CredentialBroker::new(&store, &input, &output);

        let first = broker.resolve(&scope(), "sa", true).unwrap();
        let second = broker.resolve(&scope(), "sa", true).unwrap();

        assert_eq!(first, second);
        assert!(second.is_persisted());
        assert_eq!(input.asked().len(), 1);
        assert_eq!(store.stored("bacpacman:local-sql:localhost:sa").as_deref(), Some("pw1"));
    }

    #[test]
    fn test_stored_secret_is_used_without_prompt() {
        let store =
            MockSecretStore::new().with_secret("bacpacman:local-sql:localhost:sa", "stored");
        let input = MockUserInput::new();
        let output = MockOutput::new();
        let mut broker = CredentialBroker::new(&store, &input, &output);

        let handle = broker.resolve(&scope(), "sa", false).unwrap();
        assert!(input.asked().is_empty());
        assert_eq!(broker.take_secret(&handle).unwrap().expose_secret(), "stored");
    }

    #[test]
    fn test_missing_secret_without_prompt_is_unavailable() {
        let store = MockSecretStore::new();
        let input = MockUserInput::new();
        let output = MockOutput::new();
        let mut broker = CredentialBroker::new(&store, &input, &output);

        let err = broker.resolve(&scope(), "sa", false).unwrap_err();
        assert!(matches!(err, BacpacError::CredentialUnavailable(_)));
    }

    #[test]
    fn test_cancelled_prompt_is_unavailable() {
        let store = MockSecretStore::new();
        let input = MockUserInput::with_responses(vec![MockResponse::Cancel]);
        let output = MockOutput::new();
        let mut broker = CredentialBroker::new(&store, &input, &output);

        let err = broker.resolve(&scope(), "sa", true).unwrap_err();
        assert!(err.to_string().contains("cancelled"));
        assert!(store.stored("bacpacman:local-sql:localhost:sa").is_none());
    }

    #[test]
    fn test_empty_password_is_rejected() {
        let store = MockSecretStore::new();
        let input = MockUserInput::with_responses(vec![MockResponse::Password(String::new())]);
        let output = MockOutput::new();
        let mut broker = CredentialBroker::new(&store, &input, &output);

        assert!(broker.resolve(&scope(), "sa", true).is_err());
    }

    #[test]
    fn test_unavailable_store_keeps_one_secret_until_taken() {
        let store = MockSecretStore::unavailable();
        let input = MockUserInput::with_responses(vec![MockResponse::Password("mem".to_string())]);
        let output = MockOutput::new();
        let mut broker = CredentialBroker::new(&store, &input, &output);

        let handle = broker.resolve(&scope(), "sa", true).unwrap();
        assert!(!handle.is_persisted());
        assert!(broker.holds_secret());
        assert_eq!(output.get_warnings().len(), 1);

        assert_eq!(broker.take_secret(&handle).unwrap().expose_secret(), "mem");
        assert!(!broker.holds_secret());
        assert!(broker.take_secret(&handle).is_err());
    }

    #[test]
    fn test_handle_debug_never_contains_secret() {
        let store = MockSecretStore::new();
        let input =
            MockUserInput::with_responses(vec![MockResponse::Password("topsecret".to_string())]);
        let output = MockOutput::new();
        let mut broker = CredentialBroker::new(&store, &input, &output);

        let handle = broker.resolve(&scope(), "sa", true).unwrap();
        assert!(!format!("{:?}", handle).contains("topsecret"));
    }
}
