//! User configuration loaded once at startup.
//!
//! The only piece of workflow state written back is the chosen subscription;
//! every other key is user-edited.

use crate::traits::FileSystem;
use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_DIR_NAME: &str = "bacpacman";
pub const CONFIG_FILE_NAME: &str = "config.yaml";

fn default_local_server() -> String {
    "localhost".to_string()
}

fn default_sqlpackage() -> String {
    "sqlpackage".to_string()
}

fn default_password_env() -> String {
    "SQLCMDPASSWORD".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Azure subscription chosen by the last `choose-scope` or export run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,

    /// Server used by `import` when `--server-name` is not given
    #[serde(default = "default_local_server")]
    pub local_server: String,

    /// sqlpackage program name or absolute path
    #[serde(default = "default_sqlpackage")]
    pub sqlpackage: String,

    /// Child environment variable that carries the SQL auth password.
    ///
    /// sqlpackage itself does not read `SQLCMDPASSWORD` (that is sqlcmd's
    /// variable). `sqlpackage` must point at a wrapper that passes the value
    /// on, e.g. as `/SourcePassword` or `/TargetPassword`.
    #[serde(default = "default_password_env")]
    pub password_env: String,

    #[serde(skip)]
    path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            subscription_id: None,
            local_server: default_local_server(),
            sqlpackage: default_sqlpackage(),
            password_env: default_password_env(),
            path: PathBuf::from(CONFIG_FILE_NAME),
        }
    }
}

impl AppConfig {
    /// `<config dir>/bacpacman/config.yaml`
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to determine the config directory")?;
        Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load the configuration, falling back to defaults when the file is absent
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        debug!("Loading config from: {:?}", path);

        if !fs.exists(path) {
            info!("Config file {:?} doesn't exist, using defaults", path);
            return Ok(Self {
                path: path.to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs.read_to_string(path)?;
        let mut config: AppConfig = if content.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        };
        config.path = path.to_path_buf();

        Ok(config)
    }

    pub fn save(&self, fs: &dyn FileSystem) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        fs.write(&self.path, &content)?;
        debug!("Saved config to: {:?}", self.path);
        Ok(())
    }

    /// Remember the chosen subscription for later runs
    pub fn persist_scope(&mut self, fs: &dyn FileSystem, subscription_id: &str) -> Result<()> {
        if self.subscription_id.as_deref() == Some(subscription_id) {
            return Ok(());
        }
        let previous = self.subscription_id.replace(subscription_id.to_string());
        if let Err(e) = self.save(fs) {
            self.subscription_id = previous;
            return Err(e)
                .with_context(|| format!("Failed to save subscription to {:?}", self.path));
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
