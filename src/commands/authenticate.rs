use crate::azure::login_hint;
use crate::config::AppConfig;
use crate::context::Context;
use crate::error::BacpacError;
use crate::workflow::{Flow, WorkflowEngine, WorkflowOptions};
use anyhow::Result;
use std::path::PathBuf;

/// Handles the 'authenticate' command - checks the Azure login by listing subscriptions
pub struct AuthenticateCommand;

impl AuthenticateCommand {
    pub fn execute(ctx: &Context, config: &mut AppConfig, working_dir: PathBuf) -> Result<bool> {
        let engine = WorkflowEngine::new(
            ctx,
            config,
            Flow::Export,
            WorkflowOptions::interactive(working_dir),
        );

        match engine.list_accounts() {
            Ok(accounts) => {
                ctx.output
                    .success("Authentication successful. Available subscriptions:");
                for account in &accounts {
                    ctx.output.list_item(&account.label);
                }
                Ok(true)
            }
            Err(BacpacError::Empty) => {
                ctx.output
                    .warning("Signed in, but no subscriptions are visible to this account.");
                Ok(true)
            }
            Err(BacpacError::AuthExpired) => {
                ctx.output.error(
                    "Authentication failed. Your Azure credentials may have expired or are invalid.",
                );
                ctx.output
                    .command_suggestion("Please run the following to authenticate:", &login_hint());
                Ok(false)
            }
            Err(err) => {
                ctx.output.error(&format!("Authentication failed: {}", err));
                Ok(false)
            }
        }
    }
}
