//! Runs sqlpackage and turns its exit status into a result.

use super::command::CommandSpec;
use crate::error::BacpacError;
use crate::traits::CommandExecutor;
use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;

lazy_static! {
    /// SqlClient wording for an untrusted server certificate
    static ref CERTIFICATE_TRUST_FAILURE: Regex = Regex::new(
        r"(?i)(certificate chain was issued by an authority that is not trusted|remote certificate was rejected|certificate verify failed)",
    )
    .expect("Invalid certificate trust pattern regex");

    /// SqlClient error 18456
    static ref LOGIN_FAILURE: Regex =
        Regex::new(r"(?i)login failed for user").expect("Invalid login failure pattern regex");
}

/// Whether `err` is sqlpackage reporting that the server refused the login
pub fn is_login_failure(err: &BacpacError) -> bool {
    matches!(
        err,
        BacpacError::ExternalToolFailure { diagnostics, .. } if LOGIN_FAILURE.is_match(diagnostics)
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Whether the output carries the untrusted-certificate signature
    pub fn is_certificate_trust_failure(&self) -> bool {
        CERTIFICATE_TRUST_FAILURE.is_match(&self.stderr)
            || CERTIFICATE_TRUST_FAILURE.is_match(&self.stdout)
    }

    /// `Ok` on exit code 0, otherwise `ExternalToolFailure` with the tool's
    /// own diagnostics
    pub fn check(self) -> Result<RunResult, BacpacError> {
        if self.success() {
            return Ok(self);
        }

        let certificate_trust = self.is_certificate_trust_failure();
        let diagnostics = if self.stderr.trim().is_empty() {
            self.stdout.clone()
        } else {
            self.stderr.clone()
        };

        Err(BacpacError::ExternalToolFailure {
            exit_code: self.exit_code,
            diagnostics,
            certificate_trust,
        })
    }
}

pub struct ProcessRunner<'a> {
    command: &'a dyn CommandExecutor,
    working_dir: &'a Path,
}

impl<'a> ProcessRunner<'a> {
    pub fn new(command: &'a dyn CommandExecutor, working_dir: &'a Path) -> Self {
        Self {
            command,
            working_dir,
        }
    }

    /// Run `spec` once. The password is only placed in the child's
    /// environment and is dropped when this returns.
    pub fn run(
        &self,
        spec: &CommandSpec,
        secret: Option<SecretString>,
    ) -> Result<RunResult, BacpacError> {
        let args = spec.to_args();
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

        let envs: Vec<(&str, &str)> = match (&spec.password_env, &secret) {
            (Some(name), Some(secret)) => vec![(name.as_str(), secret.expose_secret())],
            (Some(_), None) => {
                return Err(BacpacError::CredentialUnavailable(
                    "no password was provided for SQL authentication".to_string(),
                ));
            }
            (None, _) => Vec::new(),
        };

        info!("Running {} ({}): {}", spec.action, spec.auth_method, spec);
        debug!("Password passed via environment: {}", !envs.is_empty());

        let output = self
            .command
            .execute_with_env(&spec.program, &arg_refs, &envs, self.working_dir)
            .map_err(|e| spawn_failure(&spec.program, e))?;

        let result = RunResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!("{} exited with code {}", spec.program, result.exit_code);

        Ok(result)
    }
}

fn spawn_failure(program: &str, err: anyhow::Error) -> BacpacError {
    let not_found = err.chain().any(|cause| {
        cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound)
    });

    if not_found {
        BacpacError::PrerequisiteMissing {
            tools: vec![program.to_string()],
        }
    } else {
        BacpacError::ExternalToolFailure {
            exit_code: -1,
            diagnostics: format!("{:#}", err),
            certificate_trust: false,
        }
    }
}
