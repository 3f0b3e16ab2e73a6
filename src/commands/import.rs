use super::AuthOption;
use crate::config::AppConfig;
use crate::context::Context;
use crate::workflow::{Flow, WorkflowEngine, WorkflowOptions, WorkflowSeed};
use anyhow::Result;
use std::path::PathBuf;

/// Flags accepted by `import`
#[derive(Debug, Clone, Default)]
pub struct ImportArgs {
    pub input_file: Option<PathBuf>,
    pub server_name: Option<String>,
    pub database_name: Option<String>,
    pub auth: Option<AuthOption>,
    pub username: Option<String>,
    pub yes: bool,
    pub no_prompt: bool,
}

/// Handles the 'import' command - loads a .bacpac into a database server
pub struct ImportCommand;

impl ImportCommand {
    /// Returns whether the import completed
    pub fn execute(
        ctx: &Context,
        config: &mut AppConfig,
        args: ImportArgs,
        working_dir: PathBuf,
    ) -> Result<bool> {
        ctx.output.section("BacPacman import");

        let options = WorkflowOptions {
            assume_yes: args.yes,
            allow_prompt: !args.no_prompt,
            ..WorkflowOptions::interactive(working_dir)
        };

        let mut engine = WorkflowEngine::new(ctx, config, Flow::Import, options);
        engine.seed(WorkflowSeed {
            auth_method: args.auth.map(Into::into),
            server_name: args.server_name,
            database: args.database_name,
            username: args.username,
            file_path: args.input_file,
        })?;

        Ok(engine.run().finish())
    }
}
