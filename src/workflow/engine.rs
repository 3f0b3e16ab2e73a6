//! State machine sequencing the export and import flows.
//!
//! Every step is a public method so the discrete subcommands can drive a
//! single step without the full interactive sequence. A listing failure
//! degrades its step to manual entry; only a declined summary, a cancelled
//! prompt or a failed sqlpackage run end the run early.

use super::discovery::{PACKAGE_EXTENSION, discover_packages, suggest_database_name};
use super::state::{AuthMethod, Field, Flow, SelectionState, ServerRef, Target};
use crate::azure::{BrowseResult, ResourceBrowser, ResourceItem, ScopeRef, login_hint};
use crate::config::AppConfig;
use crate::context::Context;
use crate::error::{BacpacError, is_cancelled};
use crate::prerequisites::PrerequisiteChecker;
use crate::secrets::CredentialBroker;
use crate::sqlpackage::{CommandBuilder, CommandSpec, ProcessRunner, RunResult, is_login_failure};
use anyhow::{Result, bail};
use log::{debug, info, warn};
use secrecy::ExposeSecret;
use std::fmt;
use std::path::PathBuf;

pub const NO_SCOPE_MESSAGE: &str =
    "No subscription selected. Please select a subscription first using 'choose-scope'.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStep {
    Start,
    ChoosingAuthMethod,
    ChoosingAccount,
    ChoosingServer,
    ChoosingLocalTarget,
    ChoosingDatabase,
    ResolvingCredential,
    ConfirmingSummary,
    Executing,
    Done,
    Aborted,
}

impl WorkflowStep {
    /// Steps visited by a flow, in order
    pub fn path(flow: Flow) -> &'static [WorkflowStep] {
        use WorkflowStep::*;
        match flow {
            Flow::Export => &[
                Start,
                ChoosingAuthMethod,
                ChoosingAccount,
                ChoosingServer,
                ChoosingDatabase,
                ResolvingCredential,
                ConfirmingSummary,
                Executing,
            ],
            Flow::Import => &[
                Start,
                ChoosingAuthMethod,
                ChoosingLocalTarget,
                ChoosingDatabase,
                ResolvingCredential,
                ConfirmingSummary,
                Executing,
            ],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WorkflowStep::Start => "start",
            WorkflowStep::ChoosingAuthMethod => "authentication method",
            WorkflowStep::ChoosingAccount => "subscription",
            WorkflowStep::ChoosingServer => "server",
            WorkflowStep::ChoosingLocalTarget => "target server",
            WorkflowStep::ChoosingDatabase => "database",
            WorkflowStep::ResolvingCredential => "credentials",
            WorkflowStep::ConfirmingSummary => "confirmation",
            WorkflowStep::Executing => "sqlpackage run",
            WorkflowStep::Done => "done",
            WorkflowStep::Aborted => "aborted",
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    /// Skip the confirmation prompt
    pub assume_yes: bool,
    /// Whether any prompt may be shown
    pub allow_prompt: bool,
    /// Probe PATH for sqlpackage again right before running it
    pub recheck_prerequisites: bool,
    /// Directory packages are searched in and sqlpackage runs in
    pub working_dir: PathBuf,
    /// Fail instead of warning when the chosen subscription cannot be saved
    pub require_saved_scope: bool,
}

impl WorkflowOptions {
    pub fn interactive(working_dir: PathBuf) -> Self {
        Self {
            assume_yes: false,
            allow_prompt: true,
            recheck_prerequisites: true,
            working_dir,
            require_saved_scope: false,
        }
    }
}

/// Values known before the run starts, typically from CLI flags
#[derive(Debug, Clone, Default)]
pub struct WorkflowSeed {
    pub auth_method: Option<AuthMethod>,
    pub server_name: Option<String>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub file_path: Option<PathBuf>,
}

#[derive(Debug)]
pub enum WorkflowOutcome {
    Done(RunResult),
    Aborted {
        /// Last step that completed before the run stopped
        furthest: Option<WorkflowStep>,
        error: anyhow::Error,
    },
}

impl WorkflowOutcome {
    /// Log how the run ended; true when sqlpackage completed
    pub fn finish(self) -> bool {
        match self {
            WorkflowOutcome::Done(result) => {
                debug!("sqlpackage finished with exit code {}", result.exit_code);
                true
            }
            WorkflowOutcome::Aborted { furthest, error } => {
                let furthest = furthest.map_or("start", |step| step.label());
                debug!("Workflow stopped after {}: {:#}", furthest, error);
                false
            }
        }
    }

    #[cfg(test)]
    pub fn is_done(&self) -> bool {
        matches!(self, WorkflowOutcome::Done(_))
    }
}

pub struct WorkflowEngine<'a> {
    ctx: &'a Context,
    config: &'a mut AppConfig,
    options: WorkflowOptions,
    state: SelectionState,
    step: WorkflowStep,
    completed: Option<WorkflowStep>,
    broker: CredentialBroker<'a>,
    username: Option<String>,
    scope_from_config: bool,
    plan: Option<CommandSpec>,
    executed: bool,
}

impl<'a> WorkflowEngine<'a> {
    pub fn new(
        ctx: &'a Context,
        config: &'a mut AppConfig,
        flow: Flow,
        options: WorkflowOptions,
    ) -> Self {
        Self {
            ctx,
            config,
            options,
            state: SelectionState::new(flow),
            step: WorkflowStep::Start,
            completed: None,
            broker: CredentialBroker::new(
                ctx.secrets.as_ref(),
                ctx.input.as_ref(),
                ctx.output.as_ref(),
            ),
            username: None,
            scope_from_config: false,
            plan: None,
            executed: false,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    #[cfg(test)]
    pub fn step(&self) -> WorkflowStep {
        self.step
    }

    /// The command shown at confirmation, once confirmed
    #[cfg(test)]
    pub fn planned_command(&self) -> Option<&CommandSpec> {
        self.plan.as_ref()
    }

    /// Pre-fill the state; seeded fields turn their steps into no-ops
    pub fn seed(&mut self, seed: WorkflowSeed) -> Result<(), BacpacError> {
        if let Some(method) = seed.auth_method {
            self.state.set_auth_method(method)?;
        }
        if let Some(path) = seed.file_path {
            self.state.set_file_path(path)?;
        }
        if let Some(name) = non_empty(seed.server_name) {
            let (server, target) = match self.state.flow() {
                Flow::Export => (
                    ServerRef::typed(&name, self.config.subscription_id.clone()),
                    Target::Remote,
                ),
                Flow::Import => (ServerRef::local(&name), Target::Local),
            };
            self.state.set_server(server, target)?;
        }
        if let Some(database) = non_empty(seed.database) {
            self.state.set_database(database)?;
        }
        self.username = non_empty(seed.username);
        Ok(())
    }

    /// Run every step of the flow, reporting the outcome
    pub fn run(&mut self) -> WorkflowOutcome {
        let flow = self.state.flow();
        info!("Starting {} workflow", flow);

        for &step in WorkflowStep::path(flow) {
            self.step = step;
            debug!("Entering step: {}", step);

            match self.run_step(step) {
                Ok(Some(result)) => {
                    self.completed = Some(step);
                    self.step = WorkflowStep::Done;
                    return WorkflowOutcome::Done(result);
                }
                Ok(None) => self.completed = Some(step),
                Err(error) => {
                    self.report_abort(&error);
                    self.step = WorkflowStep::Aborted;
                    return WorkflowOutcome::Aborted {
                        furthest: self.completed,
                        error,
                    };
                }
            }
        }

        let error = anyhow::Error::new(BacpacError::IncompleteState("sqlpackage run"));
        self.report_abort(&error);
        self.step = WorkflowStep::Aborted;
        WorkflowOutcome::Aborted {
            furthest: self.completed,
            error,
        }
    }

    fn run_step(&mut self, step: WorkflowStep) -> Result<Option<RunResult>> {
        match step {
            WorkflowStep::Start => self.start()?,
            WorkflowStep::ChoosingAuthMethod => self.choose_auth_method()?,
            WorkflowStep::ChoosingAccount => self.choose_account()?,
            WorkflowStep::ChoosingServer => self.choose_server()?,
            WorkflowStep::ChoosingLocalTarget => self.choose_local_target()?,
            WorkflowStep::ChoosingDatabase => self.choose_database()?,
            WorkflowStep::ResolvingCredential => self.resolve_credential()?,
            WorkflowStep::ConfirmingSummary => self.confirm_summary()?,
            WorkflowStep::Executing => return self.execute().map(Some),
            WorkflowStep::Done | WorkflowStep::Aborted => {}
        }
        Ok(None)
    }

    /// Import: pick the package to import from the working directory
    pub fn start(&mut self) -> Result<()> {
        if self.state.flow() != Flow::Import {
            return Ok(());
        }
        let ctx = self.ctx;

        if let Some(path) = self.state.file_path() {
            if !ctx.fs.is_file(&self.options.working_dir.join(path)) {
                bail!("Input file not found: {}", path.display());
            }
            return Ok(());
        }

        let packages = discover_packages(ctx.fs.as_ref(), &self.options.working_dir)?;
        let names: Vec<String> = packages
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();

        let chosen = match names.as_slice() {
            [] => bail!(
                "No .{} files found in {}",
                PACKAGE_EXTENSION,
                self.options.working_dir.display()
            ),
            [single] => {
                ctx.output
                    .success(&format!("Found '{}'. Using this file for the import.", single));
                single.clone()
            }
            _ => self.ask_select(
                "Multiple .bacpac files found. Please select one:",
                names.clone(),
                "--input-file",
            )?,
        };

        self.state.set_file_path(chosen)?;
        Ok(())
    }

    pub fn choose_auth_method(&mut self) -> Result<()> {
        if self.state.is_set(Field::AuthMethod) {
            return Ok(());
        }

        let (prompt, choices) = match self.state.flow() {
            Flow::Export => (
                "How would you like to authenticate to the database?",
                [
                    (AuthMethod::ActiveDirectory, "Azure Active Directory"),
                    (AuthMethod::SqlAuth, "SQL Server authentication"),
                ],
            ),
            Flow::Import => (
                "How would you like to authenticate to the target server?",
                [
                    (AuthMethod::WindowsAuth, "Windows authentication (default)"),
                    (AuthMethod::SqlAuth, "SQL Server authentication"),
                ],
            ),
        };

        let method = if self.options.allow_prompt {
            let labels = choices.iter().map(|(_, label)| label.to_string()).collect();
            let answer = self.ctx.input.select(prompt, labels)?;
            choices
                .iter()
                .find(|(_, label)| *label == answer)
                .map_or(choices[0].0, |(method, _)| *method)
        } else {
            choices[0].0
        };

        debug!("Authentication method: {:?}", method);
        self.state.set_auth_method(method)?;
        Ok(())
    }

    /// Use the saved subscription, or list and pick one
    pub fn choose_account(&mut self) -> Result<()> {
        if self.state.is_set(Field::AccountScope) || self.state.is_set(Field::Server) {
            return Ok(());
        }

        if let Some(id) = self.config.subscription_id.clone() {
            let output = self.ctx.output.as_ref();
            output.info(&format!("Using saved subscription {}", id));
            output.command_suggestion(
                "To use a different subscription, run:",
                "bacpacman choose-scope",
            );
            self.state.set_account_scope(ScopeRef::new(id))?;
            self.scope_from_config = true;
            return Ok(());
        }

        self.pick_account()
    }

    /// List subscriptions and pick one, ignoring any saved choice
    pub fn pick_account(&mut self) -> Result<()> {
        let ctx = self.ctx;

        match self.browse(|browser| browser.list_accounts()) {
            Ok(accounts) => {
                let labels = accounts.iter().map(|a| a.label.clone()).collect();
                let answer = self.ask_select(
                    "Select your Azure subscription:",
                    labels,
                    "--subscription-id",
                )?;
                let account = accounts
                    .into_iter()
                    .find(|a| a.label == answer)
                    .ok_or(BacpacError::IncompleteState("subscription"))?;
                self.select_scope(ScopeRef {
                    id: account.id,
                    display_name: Some(account.name),
                })
            }
            Err(err) if err.degrades_to_manual() => {
                self.degrade("subscriptions", &err);
                let id = if self.options.allow_prompt {
                    ctx.input
                        .text("Enter the subscription id (leave empty to skip):", None)?
                        .trim()
                        .to_string()
                } else {
                    String::new()
                };

                if id.is_empty() {
                    ctx.output.info(
                        "Continuing without a subscription; the server will be entered manually.",
                    );
                    return Ok(());
                }
                self.select_scope(ScopeRef::new(id))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Record and persist a subscription
    pub fn select_scope(&mut self, scope: ScopeRef) -> Result<()> {
        let ctx = self.ctx;
        if let Err(e) = self.config.persist_scope(ctx.fs.as_ref(), &scope.id) {
            if self.options.require_saved_scope {
                return Err(e);
            }
            warn!("Failed to persist subscription: {:#}", e);
            ctx.output
                .warning(&format!("Could not save the subscription: {:#}", e));
        }

        ctx.output
            .info(&format!("Selected subscription: {}", scope.label()));
        self.state.set_account_scope(scope)?;
        Ok(())
    }

    pub fn choose_server(&mut self) -> Result<()> {
        if self.state.is_set(Field::Server) {
            return Ok(());
        }
        let Some(scope) = self.state.account_scope().cloned() else {
            return self.enter_server_manually();
        };
        let ctx = self.ctx;

        match self.browse(|browser| browser.list_servers(&scope)) {
            Ok(servers) => {
                let labels = servers.iter().map(|s| s.label.clone()).collect();
                let answer = self.ask_select("Select the SQL server:", labels, "--server-name")?;
                let item = servers
                    .into_iter()
                    .find(|s| s.label == answer)
                    .ok_or(BacpacError::IncompleteState("server"))?;

                let host = item
                    .host
                    .unwrap_or_else(|| ServerRef::typed(&item.name, None).host);
                let server = ServerRef {
                    name: item.name,
                    host,
                    resource_group: item.resource_group,
                    subscription_id: Some(scope.id.clone()),
                };
                self.state.set_server(server, Target::Remote)?;
                Ok(())
            }
            Err(BacpacError::Empty) if self.scope_from_config && self.options.allow_prompt => {
                ctx.output.warning(&format!(
                    "No SQL servers found in the saved subscription {}.",
                    scope.id
                ));
                if ctx.input.confirm("Choose a different subscription?", true)? {
                    self.state.restart_step(Field::AccountScope)?;
                    self.scope_from_config = false;
                    self.pick_account()?;
                    return self.choose_server();
                }
                self.enter_server_manually()
            }
            Err(err) if err.degrades_to_manual() => {
                self.degrade("SQL servers", &err);
                self.enter_server_manually()
            }
            Err(err) => Err(err.into()),
        }
    }

    fn enter_server_manually(&mut self) -> Result<()> {
        let name = self.ask_text("Enter the server name:", None, "--server-name")?;
        if name.is_empty() {
            bail!("A server name is required");
        }

        let subscription = self.state.account_scope().map(|s| s.id.clone());
        self.state
            .set_server(ServerRef::typed(&name, subscription), Target::Remote)?;
        Ok(())
    }

    /// Import: the server the package goes into
    pub fn choose_local_target(&mut self) -> Result<()> {
        if self.state.is_set(Field::Server) {
            return Ok(());
        }

        let default = self.config.local_server.clone();
        let answer =
            self.ask_text("Enter the target server name:", Some(&default), "--server-name")?;
        let name = if answer.is_empty() { default } else { answer };

        self.state
            .set_server(ServerRef::local(&name), Target::Local)?;
        Ok(())
    }

    pub fn choose_database(&mut self) -> Result<()> {
        if !self.state.is_set(Field::Database) {
            let database = match self.state.flow() {
                Flow::Export => self.pick_remote_database()?,
                Flow::Import => self.name_import_database()?,
            };
            self.state.set_database(database)?;
        }

        if self.state.flow() == Flow::Export && !self.state.is_set(Field::FilePath) {
            let file = self
                .state
                .database()
                .map(|db| format!("{}.{}", db, PACKAGE_EXTENSION));
            if let Some(file) = file {
                self.state.set_file_path(file)?;
            }
        }
        Ok(())
    }

    fn pick_remote_database(&mut self) -> Result<String> {
        let server = self
            .state
            .server()
            .cloned()
            .ok_or(BacpacError::IncompleteState("server"))?;

        // Without a subscription there is nothing to list from
        if server.subscription_id.is_some() {
            match self.browse(|browser| browser.list_databases(&server)) {
                Ok(databases) => {
                    let names = databases.into_iter().map(|db| db.label).collect();
                    return self.ask_select("Select the database:", names, "--database-name");
                }
                Err(err) if err.degrades_to_manual() => self.degrade("databases", &err),
                Err(err) => return Err(err.into()),
            }
        }

        let name = self.ask_text("Enter the database name:", None, "--database-name")?;
        if name.is_empty() {
            bail!("A database name is required");
        }
        Ok(name)
    }

    fn name_import_database(&mut self) -> Result<String> {
        let suggested = self.state.file_path().and_then(suggest_database_name);
        let name = self.ask_text(
            "Enter the target database name:",
            suggested.as_deref(),
            "--database-name",
        )?;
        if name.is_empty() {
            bail!("A database name is required");
        }
        Ok(name)
    }

    /// SQL authentication only: username, then the stored or prompted password
    pub fn resolve_credential(&mut self) -> Result<()> {
        let needs_password = self
            .state
            .auth_method()
            .is_some_and(|method| method.needs_password());
        if !needs_password || self.state.is_set(Field::Credential) {
            return Ok(());
        }

        let scope = self
            .state
            .secret_scope()
            .ok_or(BacpacError::IncompleteState("server"))?;

        let username = match self.username.clone() {
            Some(username) => username,
            None if self.options.allow_prompt => {
                let prompt = format!("Enter your SQL Server username for '{}':", scope.host);
                self.ctx.input.text(&prompt, None)?.trim().to_string()
            }
            None => String::new(),
        };
        if username.is_empty() {
            return Err(BacpacError::CredentialUnavailable(
                "a username is required for SQL Server authentication".to_string(),
            )
            .into());
        }

        let handle = self
            .broker
            .resolve(&scope, &username, self.options.allow_prompt)?;
        self.state.set_credential(handle)?;
        Ok(())
    }

    /// Show the plan and freeze it once confirmed
    pub fn confirm_summary(&mut self) -> Result<()> {
        let ctx = self.ctx;
        let output = ctx.output.as_ref();
        let flow = self.state.flow();

        let spec = CommandBuilder::new(&self.config.sqlpackage, &self.config.password_env)
            .build(&self.state)?;

        output.section("Summary");
        for (key, value) in self.state.summary() {
            output.key_value(key, &value);
        }
        output.key_value("Command", &spec.to_string());

        let default = match flow {
            Flow::Import => {
                output.warning(
                    "If a database with this name already exists on the target server, it may be overwritten.",
                );
                false
            }
            Flow::Export => {
                if let Some(path) = self.state.file_path() {
                    if ctx.fs.exists(&self.options.working_dir.join(path)) {
                        output.warning(&format!(
                            "{} already exists and will be overwritten.",
                            path.display()
                        ));
                    }
                }
                true
            }
        };

        let proceed = if self.options.assume_yes {
            true
        } else if self.options.allow_prompt {
            let prompt = format!("Proceed with the {}?", flow.to_string().to_lowercase());
            ctx.input.confirm(&prompt, default)?
        } else {
            bail!("Confirmation is required; pass --yes to run without prompting");
        };

        if !proceed {
            return Err(BacpacError::Cancelled.into());
        }

        self.state.freeze();
        self.plan = Some(spec);
        Ok(())
    }

    /// Run the confirmed command exactly once
    pub fn execute(&mut self) -> Result<RunResult> {
        if self.executed {
            bail!("sqlpackage has already been run for this selection");
        }
        let spec = self
            .plan
            .clone()
            .ok_or(BacpacError::IncompleteState("confirmed summary"))?;
        self.executed = true;

        let ctx = self.ctx;
        let output = ctx.output.as_ref();

        if self.options.recheck_prerequisites {
            PrerequisiteChecker::from_env(ctx.fs.as_ref())
                .ensure(output, &[spec.program.as_str()])?;
        }

        let secret = if spec.needs_secret() {
            let handle = self
                .state
                .credential()
                .cloned()
                .ok_or(BacpacError::IncompleteState("credential"))?;
            Some(self.broker.take_secret(&handle)?)
        } else {
            None
        };

        let database = self.state.database().unwrap_or_default();
        let file = self
            .state
            .file_path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        match self.state.flow() {
            Flow::Export => output.info(&format!("Exporting {} to {}...", database, file)),
            Flow::Import => output.info(&format!("Importing {} into {}...", file, database)),
        }

        let runner = ProcessRunner::new(ctx.command.as_ref(), &self.options.working_dir);
        match runner.run(&spec, secret).and_then(RunResult::check) {
            Ok(result) => {
                let done = match self.state.flow() {
                    Flow::Export => format!("Successfully exported {} to {}", database, file),
                    Flow::Import => format!("Successfully imported {} into {}", file, database),
                };
                output.success(&done);
                output.tool_output(&result.stdout);
                Ok(result)
            }
            Err(err) => {
                output.error("The sqlpackage command failed.");
                output.key_value("Command executed", &spec.to_string());
                if is_login_failure(&err) {
                    self.replace_rejected_password();
                }
                Err(err.into())
            }
        }
    }

    /// The server refused a stored password: offer to store a new one for the
    /// next run. Nothing is retried here.
    fn replace_rejected_password(&mut self) {
        let Some(handle) = self.state.credential().cloned() else {
            return;
        };
        if !handle.is_persisted() {
            return;
        }
        let ctx = self.ctx;
        let output = ctx.output.as_ref();

        output.warning(&format!(
            "The server rejected the stored password for {} on {}.",
            handle.username, handle.scope.host
        ));
        if !self.options.allow_prompt {
            output.dimmed("Run again without --no-prompt to replace it.");
            return;
        }

        match ctx.input.confirm("Enter a new password to store for the next run?", true) {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                debug!("Password replacement skipped: {:#}", e);
                return;
            }
        }

        let prompt = format!("Enter password for {} on {}:", handle.username, handle.scope.host);
        let secret = match ctx.input.password(&prompt) {
            Ok(secret) if !secret.expose_secret().is_empty() => secret,
            Ok(_) => {
                output.warning("An empty password was entered; the stored password was kept.");
                return;
            }
            Err(e) => {
                debug!("Password replacement skipped: {:#}", e);
                return;
            }
        };

        match self.broker.store(&handle.scope, &handle.username, &secret) {
            Ok(()) => output.success("Stored the new password. Run the command again to retry."),
            Err(e) => {
                warn!("Could not replace password for {}: {:#}", handle.username, e);
                output.warning(&format!("Could not store the new password: {:#}", e));
            }
        }
    }

    /// Subscriptions for `authenticate`
    pub fn list_accounts(&self) -> BrowseResult<Vec<ResourceItem>> {
        self.browse(|browser| browser.list_accounts())
    }

    /// Servers in the saved subscription, for `list-servers`
    pub fn list_servers(&self) -> Result<Vec<ResourceItem>> {
        let Some(id) = self.config.subscription_id.as_deref() else {
            bail!(NO_SCOPE_MESSAGE);
        };
        let scope = ScopeRef::new(id);
        empty_as_none(self.browse(|browser| browser.list_servers(&scope)))
    }

    /// Databases on a server in the saved subscription, for `list-databases`
    pub fn list_databases(&self, server_name: &str) -> Result<Vec<ResourceItem>> {
        let Some(id) = self.config.subscription_id.clone() else {
            bail!(NO_SCOPE_MESSAGE);
        };
        let server = ServerRef::typed(server_name, Some(id));
        empty_as_none(self.browse(|browser| browser.list_databases(&server)))
    }

    /// One listing call, re-authenticating once on `AuthExpired`
    fn browse<T>(
        &self,
        call: impl Fn(&dyn ResourceBrowser) -> BrowseResult<T>,
    ) -> BrowseResult<T> {
        let ctx = self.ctx;
        let browser = ctx.browser.as_ref();

        match call(browser) {
            Err(BacpacError::AuthExpired) if self.options.allow_prompt => {
                ctx.output
                    .warning("Your Azure login has expired; signing in again.");
                if let Err(e) = browser.reauthenticate() {
                    warn!("Re-authentication failed: {:#}", e);
                    ctx.output
                        .warning(&format!("Re-authentication failed: {:#}", e));
                    return Err(BacpacError::AuthExpired);
                }

                let retried = call(browser);
                match &retried {
                    Ok(_) => ctx.output.success("Signed in to Azure again"),
                    Err(e) => warn!("Listing still failing after re-authentication: {}", e),
                }
                retried
            }
            other => other,
        }
    }

    fn degrade(&self, what: &str, err: &BacpacError) {
        warn!("Listing {} failed: {}", what, err);
        let output = self.ctx.output.as_ref();

        match err {
            BacpacError::Empty => {
                output.warning(&format!("No {} found; switching to manual entry.", what))
            }
            BacpacError::AuthExpired => {
                output.warning(&format!(
                    "Could not list {}: {}; switching to manual entry.",
                    what, err
                ));
                output.command_suggestion("To sign in again, run:", &login_hint());
            }
            _ => output.warning(&format!(
                "Could not list {} ({}); switching to manual entry.",
                what, err
            )),
        }
    }

    fn ask_select(&self, prompt: &str, options: Vec<String>, flag: &str) -> Result<String> {
        if !self.options.allow_prompt {
            if let [only] = options.as_slice() {
                return Ok(only.clone());
            }
            bail!("{} must be given when prompting is disabled", flag);
        }
        self.ctx.input.select(prompt, options)
    }

    fn ask_text(&self, prompt: &str, default: Option<&str>, flag: &str) -> Result<String> {
        if !self.options.allow_prompt {
            return default.map(str::to_string).ok_or_else(|| {
                anyhow::anyhow!("{} must be given when prompting is disabled", flag)
            });
        }
        Ok(self.ctx.input.text(prompt, default)?.trim().to_string())
    }

    fn report_abort(&self, error: &anyhow::Error) {
        let output = self.ctx.output.as_ref();
        debug!("Stopped during step: {}", self.step);

        if is_cancelled(error) {
            output.warning(&format!("{} cancelled.", self.state.flow()));
        } else {
            output.error(&format!("{:#}", error));
        }

        let furthest = self.completed.map_or("none", |step| step.label());
        output.key_value("Last completed step", furthest);

        if let Some(id) = &self.config.subscription_id {
            output.dimmed(&format!(
                "The saved subscription {} will be reused on the next run.",
                id
            ));
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn empty_as_none(result: BrowseResult<Vec<ResourceItem>>) -> Result<Vec<ResourceItem>> {
    match result {
        Ok(items) => Ok(items),
        Err(BacpacError::Empty) => Ok(Vec::new()),
        Err(err) => Err(err.into()),
    }
}
