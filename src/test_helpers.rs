//! Test helpers for wiring a Context out of scripted mocks
//!
//! Each mock stays reachable through the harness so tests can assert on
//! prompts shown, output written, commands run and secrets stored.

#![cfg(test)]

use crate::azure::{MockResourceBrowser, ResourceItem};
use crate::context::Context;
use crate::secrets::MockSecretStore;
use crate::traits::command::RecordedCall;
use crate::traits::{
    MockCommandExecutor, MockCommandResult, MockFileSystem, MockOutput, MockResponse,
    MockUserInput,
};
use std::sync::Arc;

/// Builder for a context whose every dependency is a mock
pub struct TestHarness {
    pub fs: Arc<MockFileSystem>,
    pub input: Arc<MockUserInput>,
    pub output: Arc<MockOutput>,
    pub command: Arc<MockCommandExecutor>,
    pub secrets: Arc<MockSecretStore>,
    pub browser: Arc<MockResourceBrowser>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            fs: Arc::new(MockFileSystem::new()),
            input: Arc::new(MockUserInput::new()),
            output: Arc::new(MockOutput::new()),
            command: Arc::new(MockCommandExecutor::new()),
            secrets: Arc::new(MockSecretStore::new()),
            browser: Arc::new(MockResourceBrowser::new()),
        }
    }

    pub fn files(mut self, fs: MockFileSystem) -> Self {
        self.fs = Arc::new(fs);
        self
    }

    /// Scripted answers, consumed in prompt order
    pub fn answers(mut self, responses: Vec<MockResponse>) -> Self {
        self.input = Arc::new(MockUserInput::with_responses(responses));
        self
    }

    pub fn commands(mut self, outputs: Vec<MockCommandResult>) -> Self {
        self.command = Arc::new(MockCommandExecutor::with_outputs(outputs));
        self
    }

    pub fn secrets(mut self, store: MockSecretStore) -> Self {
        self.secrets = Arc::new(store);
        self
    }

    pub fn browser(mut self, browser: MockResourceBrowser) -> Self {
        self.browser = Arc::new(browser);
        self
    }

    pub fn context(&self) -> Context {
        Context::test_with(
            self.fs.clone(),
            self.input.clone(),
            self.output.clone(),
            self.command.clone(),
            self.secrets.clone(),
            self.browser.clone(),
        )
    }

    /// sqlpackage invocations only
    pub fn sqlpackage_calls(&self) -> Vec<RecordedCall> {
        self.command
            .calls()
            .into_iter()
            .filter(|call| call.command == "sqlpackage")
            .collect()
    }
}

/// Listing results named after `names`
pub fn items(names: &[&str]) -> Vec<ResourceItem> {
    names.iter().map(|name| ResourceItem::named(*name)).collect()
}

/// Subscription as listed by `az account list`
pub fn subscription(id: &str, name: &str) -> ResourceItem {
    ResourceItem {
        id: id.to_string(),
        name: name.to_string(),
        label: format!("{} ({})", name, id),
        resource_group: None,
        host: None,
    }
}
