//! Database password handling.
//!
//! Passwords are looked up in (and written back to) the OS keyring
//! (Secret Service, macOS keychain, Windows Credential Manager) and only
//! ever reach sqlpackage through its environment.

mod broker;
mod keyring;
mod store;
#[cfg(target_os = "windows")]
mod wincred;

pub use broker::{CredentialBroker, CredentialHandle};
pub use keyring::SystemKeyring;
pub use store::{SecretScope, SecretStore, TargetKind};

#[cfg(test)]
pub use store::MockSecretStore;
