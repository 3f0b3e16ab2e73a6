use crate::config::AppConfig;
use crate::context::Context;
use crate::workflow::{Flow, WorkflowEngine, WorkflowOptions};
use anyhow::Result;
use std::path::PathBuf;

/// Handles 'list-servers' and 'list-databases' in the saved subscription
pub struct ListCommand;

impl ListCommand {
    pub fn execute_servers(
        ctx: &Context,
        config: &mut AppConfig,
        working_dir: PathBuf,
    ) -> Result<bool> {
        let subscription = config.subscription_id.clone().unwrap_or_default();
        let engine = WorkflowEngine::new(
            ctx,
            config,
            Flow::Export,
            WorkflowOptions::interactive(working_dir),
        );
        let servers = engine.list_servers()?;

        if servers.is_empty() {
            ctx.output
                .warning("No SQL servers found in the selected subscription.");
            return Ok(true);
        }

        ctx.output
            .section(&format!("SQL servers in subscription {}", subscription));
        for server in &servers {
            match &server.resource_group {
                Some(group) => ctx
                    .output
                    .list_item(&format!("{} (resource group: {})", server.label, group)),
                None => ctx.output.list_item(&server.label),
            }
        }
        Ok(true)
    }

    pub fn execute_databases(
        ctx: &Context,
        config: &mut AppConfig,
        server_name: &str,
        working_dir: PathBuf,
    ) -> Result<bool> {
        let engine = WorkflowEngine::new(
            ctx,
            config,
            Flow::Export,
            WorkflowOptions::interactive(working_dir),
        );
        let databases = engine.list_databases(server_name)?;

        if databases.is_empty() {
            ctx.output
                .warning("No databases found on the specified server.");
            return Ok(true);
        }

        ctx.output
            .section(&format!("Databases on {}", server_name));
        for database in &databases {
            ctx.output.list_item(&database.label);
        }
        Ok(true)
    }
}
