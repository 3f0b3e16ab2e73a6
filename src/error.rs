use thiserror::Error;

/// Message shown instead of the raw sqlpackage output when the target's TLS
/// certificate is rejected.
pub const CERTIFICATE_TRUST_REMEDIATION: &str = "The database server presented a TLS certificate that is not trusted by this machine. \
Local targets are always connected with TrustServerCertificate=True; for a remote server, install a certificate \
issued by a trusted authority (or add its issuer to the system trust store) and run the command again.";

/// Failure taxonomy of the export/import workflow.
#[derive(Debug, Error)]
pub enum BacpacError {
    /// One or more required external tools are not on PATH
    #[error("required tool(s) not found on PATH: {}", tools.join(", "))]
    PrerequisiteMissing { tools: Vec<String> },

    /// Azure rejected the cached login
    #[error("Azure credentials have expired or are invalid")]
    AuthExpired,

    /// The resource listing backend could not be reached or failed
    #[error("could not reach Azure: {0}")]
    Unreachable(String),

    /// The resource listing returned nothing
    #[error("no items found")]
    Empty,

    /// No password could be obtained for the selected identity
    #[error("credential unavailable: {0}")]
    CredentialUnavailable(String),

    /// A field needed to build the command was never selected
    #[error("internal error: selection is incomplete, missing {0}")]
    IncompleteState(&'static str),

    /// A set-once field was assigned twice
    #[error("internal error: {field} is already selected; restart that step to change it")]
    FieldAlreadySet { field: &'static str },

    /// A field was assigned before the field it depends on
    #[error("internal error: {field} cannot be selected before {requires}")]
    OutOfOrder {
        field: &'static str,
        requires: &'static str,
    },

    /// The selection was confirmed and can no longer change
    #[error("internal error: selection is frozen after confirmation")]
    Frozen,

    /// sqlpackage ran and exited non-zero
    #[error("{}", describe_tool_failure(*exit_code, diagnostics, *certificate_trust))]
    ExternalToolFailure {
        exit_code: i32,
        diagnostics: String,
        certificate_trust: bool,
    },

    /// The user backed out of a prompt or declined the summary
    #[error("cancelled by user")]
    Cancelled,
}

fn describe_tool_failure(exit_code: i32, diagnostics: &str, certificate_trust: bool) -> String {
    if certificate_trust {
        return CERTIFICATE_TRUST_REMEDIATION.to_string();
    }

    let diagnostics = diagnostics.trim();
    if diagnostics.is_empty() {
        format!("sqlpackage failed with exit code {}", exit_code)
    } else {
        format!(
            "sqlpackage failed with exit code {}:\n{}",
            exit_code, diagnostics
        )
    }
}

impl BacpacError {
    /// Whether a resource listing failure should fall back to manual entry
    pub fn degrades_to_manual(&self) -> bool {
        matches!(
            self,
            BacpacError::AuthExpired | BacpacError::Unreachable(_) | BacpacError::Empty
        )
    }
}

/// True when the error chain carries a user cancellation
pub fn is_cancelled(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<BacpacError>(),
        Some(BacpacError::Cancelled)
    )
}
