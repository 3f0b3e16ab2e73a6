use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

/// Trait for executing system commands, allowing for mocking in tests
pub trait CommandExecutor: Send + Sync {
    /// Execute a command with arguments and return output
    fn execute(&self, command: &str, args: &[&str], working_dir: &Path) -> Result<Output>;

    /// Execute a command interactively (inherits stdin/stdout/stderr)
    fn execute_interactive(&self, command: &str, args: &[&str], working_dir: &Path) -> Result<i32>;

    /// Execute a command with extra environment variables visible only to the child
    fn execute_with_env(
        &self,
        command: &str,
        args: &[&str],
        envs: &[(&str, &str)],
        working_dir: &Path,
    ) -> Result<Output>;

    /// Execute a command and write `input` to its stdin
    fn execute_with_input(
        &self,
        command: &str,
        args: &[&str],
        input: &[u8],
        working_dir: &Path,
    ) -> Result<Output>;
}

/// Real command executor using std::process::Command
pub struct RealCommandExecutor;

impl RealCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RealCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor for RealCommandExecutor {
    fn execute(&self, command: &str, args: &[&str], working_dir: &Path) -> Result<Output> {
        let output = Command::new(command)
            .args(args)
            .current_dir(working_dir)
            .output()
            .with_context(|| format!("Failed to execute {}", command))?;

        Ok(output)
    }

    fn execute_interactive(&self, command: &str, args: &[&str], working_dir: &Path) -> Result<i32> {
        let mut child = Command::new(command)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to execute {}", command))?;

        let status = child.wait()?;
        Ok(status.code().unwrap_or(-1))
    }

    fn execute_with_env(
        &self,
        command: &str,
        args: &[&str],
        envs: &[(&str, &str)],
        working_dir: &Path,
    ) -> Result<Output> {
        let output = Command::new(command)
            .args(args)
            .envs(envs.iter().copied())
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to execute {}", command))?;

        Ok(output)
    }

    fn execute_with_input(
        &self,
        command: &str,
        args: &[&str],
        input: &[u8],
        working_dir: &Path,
    ) -> Result<Output> {
        let mut child = Command::new(command)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to execute {}", command))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input)
                .with_context(|| format!("Failed to write to {} stdin", command))?;
        }

        child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for {}", command))
    }
}

/// Mock command executor for testing
#[cfg(test)]
pub struct MockCommandExecutor {
    /// Pre-configured outputs for commands
    outputs: std::sync::Mutex<Vec<MockCommandResult>>,
    /// Every invocation seen, in order
    calls: std::sync::Mutex<Vec<RecordedCall>>,
}

#[cfg(test)]
#[derive(Clone, Debug)]
pub struct MockCommandResult {
    /// Matched against "<command> <args...>" as a prefix
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Simulate the binary missing from PATH
    pub not_found: bool,
}

#[cfg(test)]
impl MockCommandResult {
    pub fn ok(command: &str, stdout: &str) -> Self {
        Self {
            command: command.to_string(),
            exit_code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
            not_found: false,
        }
    }

    pub fn failed(command: &str, exit_code: i32, stderr: &str) -> Self {
        Self {
            command: command.to_string(),
            exit_code,
            stdout: String::new(),
            stderr: stderr.to_string(),
            not_found: false,
        }
    }

    pub fn not_found(command: &str) -> Self {
        Self {
            command: command.to_string(),
            exit_code: -1,
            stdout: String::new(),
            stderr: String::new(),
            not_found: true,
        }
    }
}

#[cfg(test)]
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedCall {
    pub command: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
    pub stdin: Option<String>,
    pub interactive: bool,
}

#[cfg(test)]
impl MockCommandExecutor {
    pub fn new() -> Self {
        Self::with_outputs(Vec::new())
    }

    pub fn with_outputs(outputs: Vec<MockCommandResult>) -> Self {
        Self {
            outputs: std::sync::Mutex::new(outputs),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn add_output(&self, output: MockCommandResult) {
        let mut outputs = self.outputs.lock().unwrap();
        outputs.push(output);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn take(&self, call: RecordedCall) -> Result<Output> {
        let line = std::iter::once(call.command.as_str())
            .chain(call.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(call);

        let mut outputs = self.outputs.lock().unwrap();
        if let Some(index) = outputs.iter().position(|r| line.starts_with(&r.command)) {
            let mock_result = outputs.remove(index);
            if mock_result.not_found {
                return Err(anyhow::Error::new(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "program not found",
                ))
                .context(format!("Failed to execute {}", mock_result.command)));
            }
            return Ok(Output {
                status: create_exit_status(mock_result.exit_code),
                stdout: mock_result.stdout.into_bytes(),
                stderr: mock_result.stderr.into_bytes(),
            });
        }

        // Default: successful empty output
        Ok(Output {
            status: create_exit_status(0),
            stdout: Vec::new(),
            stderr: Vec::new(),
        })
    }
}

#[cfg(test)]
impl Default for MockCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
fn to_call(command: &str, args: &[&str]) -> RecordedCall {
    RecordedCall {
        command: command.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
        envs: Vec::new(),
        stdin: None,
        interactive: false,
    }
}

#[cfg(test)]
impl CommandExecutor for MockCommandExecutor {
    fn execute(&self, command: &str, args: &[&str], _working_dir: &Path) -> Result<Output> {
        self.take(to_call(command, args))
    }

    fn execute_interactive(
        &self,
        command: &str,
        args: &[&str],
        _working_dir: &Path,
    ) -> Result<i32> {
        let mut call = to_call(command, args);
        call.interactive = true;
        let output = self.take(call)?;
        Ok(output.status.code().unwrap_or(-1))
    }

    fn execute_with_env(
        &self,
        command: &str,
        args: &[&str],
        envs: &[(&str, &str)],
        _working_dir: &Path,
    ) -> Result<Output> {
        let mut call = to_call(command, args);
        call.envs = envs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.take(call)
    }

    fn execute_with_input(
        &self,
        command: &str,
        args: &[&str],
        input: &[u8],
        _working_dir: &Path,
    ) -> Result<Output> {
        let mut call = to_call(command, args);
        call.stdin = Some(String::from_utf8_lossy(input).into_owned());
        self.take(call)
    }
}

#[cfg(test)]
fn create_exit_status(code: i32) -> std::process::ExitStatus {
    // ExitStatus can't be constructed directly
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        // Raw wait status carries the exit code in the high byte
        std::process::ExitStatus::from_raw((code & 0xff) << 8)
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code as u32)
    }
}
