//! Azure resource discovery (subscriptions, SQL servers, databases).

mod az_cli;
mod browser;

pub use az_cli::{AzCliBrowser, login_hint};
pub use browser::{BrowseResult, ResourceBrowser, ResourceItem, ScopeRef};

#[cfg(test)]
pub use browser::MockResourceBrowser;
