use crate::config::AppConfig;
use crate::context::Context;
use crate::workflow::{Flow, WorkflowEngine, WorkflowOptions};
use anyhow::Result;
use std::path::PathBuf;

/// Handles the default command - the interactive export
pub struct ExportCommand;

impl ExportCommand {
    /// Returns whether the export completed
    pub fn execute(ctx: &Context, config: &mut AppConfig, working_dir: PathBuf) -> Result<bool> {
        ctx.output.section("BacPacman export");
        ctx.output
            .dimmed("Export an Azure SQL database to a local .bacpac file.");

        let mut engine = WorkflowEngine::new(
            ctx,
            config,
            Flow::Export,
            WorkflowOptions::interactive(working_dir),
        );
        Ok(engine.run().finish())
    }
}
