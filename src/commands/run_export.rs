use super::AuthOption;
use crate::config::AppConfig;
use crate::context::Context;
use crate::workflow::{Flow, WorkflowEngine, WorkflowOptions, WorkflowSeed};
use anyhow::Result;
use std::path::PathBuf;

/// Flags accepted by `run-export`
#[derive(Debug, Clone)]
pub struct RunExportArgs {
    pub server_name: String,
    pub database_name: String,
    pub output_file: PathBuf,
    pub auth: AuthOption,
    pub username: Option<String>,
    pub yes: bool,
    pub no_prompt: bool,
}

/// Handles the 'run-export' command - an export with every choice given up front
pub struct RunExportCommand;

impl RunExportCommand {
    pub fn execute(
        ctx: &Context,
        config: &mut AppConfig,
        args: RunExportArgs,
        working_dir: PathBuf,
    ) -> Result<bool> {
        let options = WorkflowOptions {
            assume_yes: args.yes,
            allow_prompt: !args.no_prompt,
            ..WorkflowOptions::interactive(working_dir)
        };

        let mut engine = WorkflowEngine::new(ctx, config, Flow::Export, options);
        engine.seed(WorkflowSeed {
            auth_method: Some(args.auth.into()),
            server_name: Some(args.server_name),
            database: Some(args.database_name),
            username: args.username,
            file_path: Some(args.output_file),
        })?;

        Ok(engine.run().finish())
    }
}
