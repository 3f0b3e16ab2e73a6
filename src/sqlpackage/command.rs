//! Maps a completed selection to a sqlpackage argument vector.

use crate::error::BacpacError;
use crate::workflow::{AuthMethod, Flow, SelectionState, Target};
use std::fmt;

/// One sqlpackage invocation. Never holds a password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub action: Flow,
    /// (flag, value) pairs in the order they are passed
    args: Vec<(String, String)>,
    pub auth_method: AuthMethod,
    pub trust_server_certificate: bool,
    /// Child environment variable the password goes into, for SQL auth
    pub password_env: Option<String>,
}

impl CommandSpec {
    /// `/p:` properties use `=`, every other flag `:`
    pub fn to_args(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|(flag, value)| {
                if flag.starts_with("/p:") {
                    format!("{}={}", flag, value)
                } else {
                    format!("{}:{}", flag, value)
                }
            })
            .collect()
    }

    /// Value passed with `flag`, if any
    #[cfg(test)]
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(f, _)| f == flag)
            .map(|(_, v)| v.as_str())
    }

    pub fn needs_secret(&self) -> bool {
        self.password_env.is_some()
    }
}

/// Printable command line, for failure reports
impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote_arg(&self.program))?;
        for arg in self.to_args() {
            write!(f, " {}", quote_arg(&arg))?;
        }
        Ok(())
    }
}

fn quote_arg(arg: &str) -> String {
    if arg.contains(char::is_whitespace) {
        format!("\"{}\"", arg)
    } else {
        arg.to_string()
    }
}

pub struct CommandBuilder {
    program: String,
    password_env: String,
}

impl CommandBuilder {
    pub fn new(program: impl Into<String>, password_env: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            password_env: password_env.into(),
        }
    }

    pub fn build(&self, state: &SelectionState) -> Result<CommandSpec, BacpacError> {
        let auth_method = state
            .auth_method()
            .ok_or(BacpacError::IncompleteState("authentication method"))?;
        let server = state.server().ok_or(BacpacError::IncompleteState("server"))?;
        let target = state.target().ok_or(BacpacError::IncompleteState("target"))?;
        let database = state
            .database()
            .ok_or(BacpacError::IncompleteState("database"))?;
        let file = state
            .file_path()
            .ok_or(BacpacError::IncompleteState("file"))?
            .display()
            .to_string();

        let username = if auth_method.needs_password() {
            let credential = state
                .credential()
                .ok_or(BacpacError::IncompleteState("credential"))?;
            Some(credential.username.clone())
        } else {
            None
        };

        let trust = target == Target::Local;
        let mut args: Vec<(String, String)> = Vec::new();
        let mut push = |flag: &str, value: String| args.push((flag.to_string(), value));

        match state.flow() {
            Flow::Export => {
                push("/Action", "Export".to_string());
                push("/SourceServerName", format!("tcp:{}", server.host));
                push("/SourceDatabaseName", database.to_string());
                push_auth(&mut push, "/SourceUser", auth_method, username.as_deref());
                if trust {
                    push("/SourceTrustServerCertificate", "True".to_string());
                }
                push("/p:VerifyExtraction", "False".to_string());
                push("/TargetFile", file);
            }
            Flow::Import => {
                push("/Action", "Import".to_string());
                push("/SourceFile", file);
                push("/TargetServerName", server.host.clone());
                push("/TargetDatabaseName", database.to_string());
                push_auth(&mut push, "/TargetUser", auth_method, username.as_deref());
                if trust {
                    push("/TargetTrustServerCertificate", "True".to_string());
                }
            }
        }

        Ok(CommandSpec {
            program: self.program.clone(),
            action: state.flow(),
            args,
            auth_method,
            trust_server_certificate: trust,
            password_env: username.map(|_| self.password_env.clone()),
        })
    }
}

fn push_auth(
    push: &mut impl FnMut(&str, String),
    user_flag: &str,
    auth_method: AuthMethod,
    username: Option<&str>,
) {
    match (auth_method, username) {
        (AuthMethod::ActiveDirectory, _) => push("/ua", "True".to_string()),
        (AuthMethod::SqlAuth, Some(user)) => push(user_flag, user.to_string()),
        (AuthMethod::SqlAuth, None) | (AuthMethod::WindowsAuth, _) => {}
    }
}
