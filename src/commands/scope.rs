use crate::azure::ScopeRef;
use crate::config::AppConfig;
use crate::context::Context;
use crate::workflow::{Flow, WorkflowEngine, WorkflowOptions};
use anyhow::Result;
use std::path::PathBuf;

/// Handles the 'choose-scope' command - saves the subscription later runs use
pub struct ScopeCommand;

impl ScopeCommand {
    pub fn execute(
        ctx: &Context,
        config: &mut AppConfig,
        subscription_id: Option<&str>,
        working_dir: PathBuf,
    ) -> Result<bool> {
        let options = WorkflowOptions {
            require_saved_scope: true,
            ..WorkflowOptions::interactive(working_dir)
        };
        let mut engine = WorkflowEngine::new(ctx, config, Flow::Export, options);

        match subscription_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => engine.select_scope(ScopeRef::new(id))?,
            None => engine.pick_account()?,
        }

        if engine.state().account_scope().is_none() {
            ctx.output.warning("No subscription was selected.");
            return Ok(false);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::MockResourceBrowser;
    use crate::error::BacpacError;
    use crate::test_helpers::{TestHarness, subscription};
    use crate::traits::{MockFileSystem, MockResponse};
    use std::path::Path;

    fn config(harness: &TestHarness) -> AppConfig {
        AppConfig::load(harness.fs.as_ref(), Path::new("/cfg/config.yaml")).unwrap()
    }

    #[test]
    fn test_given_id_is_persisted_without_listing() {
        let harness = TestHarness::new();
        let ctx = harness.context();
        let mut config = config(&harness);

        assert!(
            ScopeCommand::execute(&ctx, &mut config, Some("1111-2222"), PathBuf::from(".")).unwrap()
        );
        assert!(harness.browser.calls().is_empty());
        assert!(
            harness
                .fs
                .get_file_contents(Path::new("/cfg/config.yaml"))
                .unwrap()
                .contains("1111-2222")
        );
    }

    #[test]
    fn test_listed_subscription_is_chosen() {
        let harness = TestHarness::new()
            .browser(MockResourceBrowser::new().accounts(Ok(vec![
                subscription("a", "Dev"),
                subscription("b", "Prod"),
            ])))
            .answers(vec![MockResponse::Select("Prod (b)".to_string())]);
        let ctx = harness.context();
        let mut config = config(&harness);

        assert!(ScopeCommand::execute(&ctx, &mut config, None, PathBuf::from(".")).unwrap());
        assert_eq!(config.subscription_id.as_deref(), Some("b"));
    }

    #[test]
    fn test_unsaved_subscription_is_an_error() {
        let harness = TestHarness::new().files(MockFileSystem::new().read_only());
        let ctx = harness.context();
        let mut config = config(&harness);

        let err = ScopeCommand::execute(&ctx, &mut config, Some("1111-2222"), PathBuf::from("."))
            .unwrap_err();

        assert!(format!("{:#}", err).contains("Failed to save subscription"));
        assert!(!harness.output.to_text().contains("Selected subscription"));
        assert_eq!(config.subscription_id, None);
        assert!(harness.fs.get_file_contents(Path::new("/cfg/config.yaml")).is_none());
    }

    #[test]
    fn test_unsaved_listed_subscription_is_an_error() {
        let harness = TestHarness::new()
            .files(MockFileSystem::new().read_only())
            .browser(MockResourceBrowser::new().accounts(Ok(vec![subscription("a", "Dev")])))
            .answers(vec![MockResponse::Select("Dev (a)".to_string())]);
        let ctx = harness.context();
        let mut config = config(&harness);

        assert!(ScopeCommand::execute(&ctx, &mut config, None, PathBuf::from(".")).is_err());
    }

    #[test]
    fn test_skipped_manual_entry_selects_nothing() {
        let harness = TestHarness::new()
            .browser(
                MockResourceBrowser::new()
                    .accounts(Err(BacpacError::Unreachable("offline".to_string()))),
            )
            .answers(vec![MockResponse::Text(String::new())]);
        let ctx = harness.context();
        let mut config = config(&harness);

        assert!(!ScopeCommand::execute(&ctx, &mut config, None, PathBuf::from(".")).unwrap());
        assert_eq!(config.subscription_id, None);
    }
}
