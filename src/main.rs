mod azure;
mod commands;
mod config;
mod context;
mod error;
mod output;
mod prerequisites;
mod secrets;
mod sqlpackage;
mod traits;
mod workflow;

#[cfg(test)]
mod test_helpers;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{
    AuthOption, AuthenticateCommand, ExportCommand, ImportArgs, ImportCommand, ListCommand,
    RunExportArgs, RunExportCommand, ScopeCommand,
};
use config::AppConfig;
use context::Context;
use log::{LevelFilter, debug};
use prerequisites::{AZURE_CLI, PrerequisiteChecker};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "bacpacman")]
#[command(
    about = "BacPacman - export Azure SQL databases to .bacpac files and import them locally",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, env = "BACPACMAN_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Without a subcommand the interactive export runs
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a .bacpac file into a local SQL server
    Import {
        /// The .bacpac file to import
        #[arg(long)]
        input_file: Option<PathBuf>,

        /// Target server (defaults to the configured local server)
        #[arg(long)]
        server_name: Option<String>,

        /// Name of the database to create
        #[arg(long)]
        database_name: Option<String>,

        /// Authentication method for the target server
        #[arg(long, value_enum)]
        auth: Option<AuthOption>,

        /// SQL login name (with --auth sql)
        #[arg(long)]
        username: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Fail instead of prompting for missing values
        #[arg(long)]
        no_prompt: bool,
    },

    /// Check the Azure login and list the available subscriptions
    Authenticate,

    /// Choose and save the Azure subscription to use
    ChooseScope {
        /// Subscription id to save (lists subscriptions when omitted)
        #[arg(long)]
        subscription_id: Option<String>,
    },

    /// List SQL servers in the saved subscription
    ListServers,

    /// List databases on a SQL server in the saved subscription
    ListDatabases {
        /// Name of the SQL server
        #[arg(long)]
        server_name: String,
    },

    /// Export a database without the interactive selection steps
    RunExport {
        /// Name or host of the Azure SQL server
        #[arg(long)]
        server_name: String,

        /// Name of the database to export
        #[arg(long)]
        database_name: String,

        /// Where to write the .bacpac file
        #[arg(long, default_value = "database.bacpac")]
        output_file: PathBuf,

        /// Authentication method for the source server
        #[arg(long, value_enum, default_value = "aad")]
        auth: AuthOption,

        /// SQL login name (with --auth sql)
        #[arg(long)]
        username: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Fail instead of prompting for missing values
        #[arg(long)]
        no_prompt: bool,
    },
}

impl Commands {
    /// External tools the command needs before it can start
    fn required_tools<'a>(&self, config: &'a AppConfig) -> Vec<&'a str> {
        match self {
            Commands::Import { .. } | Commands::RunExport { .. } => {
                vec![config.sqlpackage.as_str()]
            }
            Commands::ChooseScope {
                subscription_id: Some(_),
            } => Vec::new(),
            Commands::Authenticate
            | Commands::ChooseScope { .. }
            | Commands::ListServers
            | Commands::ListDatabases { .. } => vec![AZURE_CLI],
        }
    }
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn"),
    );
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

fn run(cli: Cli) -> Result<bool> {
    let config_path = match cli.config {
        Some(path) => path,
        None => AppConfig::default_path()?,
    };
    let working_dir = std::env::current_dir()?;
    let ctx = Context::new(working_dir.clone());
    let mut config = AppConfig::load(ctx.fs.as_ref(), &config_path)?;
    debug!("Using config file {}", config.path().display());

    let tools = match &cli.command {
        Some(command) => command.required_tools(&config),
        None => vec![AZURE_CLI, config.sqlpackage.as_str()],
    };
    debug!("Checking prerequisites: {:?}", tools);
    PrerequisiteChecker::from_env(ctx.fs.as_ref()).ensure(ctx.output.as_ref(), &tools)?;

    match cli.command {
        None => ExportCommand::execute(&ctx, &mut config, working_dir),
        Some(Commands::Import {
            input_file,
            server_name,
            database_name,
            auth,
            username,
            yes,
            no_prompt,
        }) => {
            let args = ImportArgs {
                input_file,
                server_name,
                database_name,
                auth,
                username,
                yes,
                no_prompt,
            };
            ImportCommand::execute(&ctx, &mut config, args, working_dir)
        }
        Some(Commands::Authenticate) => {
            AuthenticateCommand::execute(&ctx, &mut config, working_dir)
        }
        Some(Commands::ChooseScope { subscription_id }) => {
            ScopeCommand::execute(&ctx, &mut config, subscription_id.as_deref(), working_dir)
        }
        Some(Commands::ListServers) => {
            ListCommand::execute_servers(&ctx, &mut config, working_dir)
        }
        Some(Commands::ListDatabases { server_name }) => {
            ListCommand::execute_databases(&ctx, &mut config, &server_name, working_dir)
        }
        Some(Commands::RunExport {
            server_name,
            database_name,
            output_file,
            auth,
            username,
            yes,
            no_prompt,
        }) => {
            let args = RunExportArgs {
                server_name,
                database_name,
                output_file,
                auth,
                username,
                yes,
                no_prompt,
            };
            RunExportCommand::execute(&ctx, &mut config, args, working_dir)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
