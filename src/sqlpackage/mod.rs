//! sqlpackage invocation: argument vector construction and process execution.

mod command;
mod runner;

pub use command::{CommandBuilder, CommandSpec};
pub use runner::{ProcessRunner, RunResult, is_login_failure};
