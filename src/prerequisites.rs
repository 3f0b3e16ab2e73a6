//! Checks that the external tools bacpacman drives are installed.
//!
//! A missing tool is not an error of the checker itself; callers decide
//! whether to stop, and print [`PrerequisiteResult::remediation`] when they do.

use crate::error::BacpacError;
use crate::traits::{FileSystem, Output};
use log::debug;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const SQLPACKAGE: &str = "sqlpackage";
pub const AZURE_CLI: &str = "az";

const SQLPACKAGE_DOWNLOAD: &str =
    "https://learn.microsoft.com/en-us/sql/tools/sqlpackage/sqlpackage-download";
const AZURE_CLI_DOWNLOAD: &str = "https://learn.microsoft.com/en-us/cli/azure/install-azure-cli";

/// Host operating system family, used to pick install instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl HostOs {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "linux" => HostOs::Linux,
            "macos" => HostOs::MacOs,
            "windows" => HostOs::Windows,
            _ => HostOs::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrerequisiteResult {
    pub tool_name: String,
    pub found: bool,
    pub resolved_path: Option<PathBuf>,
    /// Install instructions for the host OS; shown only when `found` is false
    pub remediation: String,
}

pub struct PrerequisiteChecker<'a> {
    fs: &'a dyn FileSystem,
    search_path: Vec<PathBuf>,
    extensions: Vec<String>,
    host: HostOs,
}

impl<'a> PrerequisiteChecker<'a> {
    pub fn new(fs: &'a dyn FileSystem, search_path: Vec<PathBuf>, host: HostOs) -> Self {
        let extensions = if host == HostOs::Windows {
            vec![".exe".to_string(), ".cmd".to_string(), ".bat".to_string()]
        } else {
            Vec::new()
        };

        Self {
            fs,
            search_path,
            extensions,
            host,
        }
    }

    /// Checker for the current process' PATH (and PATHEXT on Windows)
    pub fn from_env(fs: &'a dyn FileSystem) -> Self {
        let search_path = std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).collect())
            .unwrap_or_default();

        let mut checker = Self::new(fs, search_path, HostOs::current());
        if checker.host == HostOs::Windows {
            if let Some(pathext) = std::env::var_os("PATHEXT") {
                checker.extensions = pathext
                    .to_string_lossy()
                    .split(';')
                    .filter(|ext| !ext.is_empty())
                    .map(|ext| ext.to_ascii_lowercase())
                    .collect();
            }
        }
        checker
    }

    /// Resolve every tool against the search path
    pub fn check(&self, tools: &[&str]) -> BTreeMap<String, PrerequisiteResult> {
        tools
            .iter()
            .map(|tool| {
                let resolved_path = self.resolve(tool);
                debug!("Prerequisite {} resolved to {:?}", tool, resolved_path);
                let result = PrerequisiteResult {
                    tool_name: tool.to_string(),
                    found: resolved_path.is_some(),
                    resolved_path,
                    remediation: remediation(tool, self.host),
                };
                (tool.to_string(), result)
            })
            .collect()
    }

    /// Check and report; fails with `PrerequisiteMissing` naming every absent tool
    pub fn ensure(&self, output: &dyn Output, tools: &[&str]) -> Result<(), BacpacError> {
        let results = self.check(tools);
        let missing: Vec<&PrerequisiteResult> = results.values().filter(|r| !r.found).collect();

        if missing.is_empty() {
            return Ok(());
        }

        for result in &missing {
            output.status_check(&result.tool_name, false);
            output.blank();
            for line in result.remediation.lines() {
                output.dimmed(line);
            }
            output.blank();
        }

        Err(BacpacError::PrerequisiteMissing {
            tools: missing.iter().map(|r| r.tool_name.clone()).collect(),
        })
    }

    fn resolve(&self, tool: &str) -> Option<PathBuf> {
        let direct = Path::new(tool);
        if direct.components().count() > 1 {
            return self.first_file(direct);
        }

        self.search_path
            .iter()
            .find_map(|dir| self.first_file(&dir.join(tool)))
    }

    fn first_file(&self, candidate: &Path) -> Option<PathBuf> {
        if self.fs.is_file(candidate) {
            return Some(candidate.to_path_buf());
        }

        self.extensions.iter().find_map(|ext| {
            let mut with_ext = candidate.as_os_str().to_os_string();
            with_ext.push(ext);
            let with_ext = PathBuf::from(with_ext);
            self.fs.is_file(&with_ext).then_some(with_ext)
        })
    }
}

/// Install instructions for a tool on the given host
pub fn remediation(tool: &str, host: HostOs) -> String {
    let name = Path::new(tool)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_else(|| tool.to_string());

    match name.as_str() {
        SQLPACKAGE => sqlpackage_remediation(host),
        AZURE_CLI => azure_cli_remediation(host),
        _ => format!(
            "The '{}' command is not installed or not in your PATH.",
            tool
        ),
    }
}

fn sqlpackage_remediation(host: HostOs) -> String {
    let header = format!(
        "The 'sqlpackage' command-line utility is not installed or not in your PATH.\n\
         The download page is here: {}",
        SQLPACKAGE_DOWNLOAD
    );

    let hint = match host {
        HostOs::MacOs => "To install it on macOS, use the .NET tool (requires the .NET SDK):\n  \
             Install the .NET SDK from: https://dotnet.microsoft.com/en-us/download\n  \
             Then run: dotnet tool install -g microsoft.sqlpackage"
            .to_string(),
        HostOs::Linux => format!(
            "To install it on Linux, download the zip file from:\n  {}#linux\n  \
             or, with the .NET SDK installed, run: dotnet tool install -g microsoft.sqlpackage",
            SQLPACKAGE_DOWNLOAD
        ),
        HostOs::Windows => format!(
            "To install it on Windows, download the DacFramework.msi installer from:\n  {}#windows",
            SQLPACKAGE_DOWNLOAD
        ),
        HostOs::Other => "Install the .NET SDK and run: dotnet tool install -g microsoft.sqlpackage"
            .to_string(),
    };

    format!("{}\n{}", header, hint)
}

fn azure_cli_remediation(host: HostOs) -> String {
    let header = format!(
        "The 'az' command-line utility is not installed or not in your PATH.\n\
         The download page is here: {}",
        AZURE_CLI_DOWNLOAD
    );

    let hint = match host {
        HostOs::MacOs => "To install it on macOS, run: brew update && brew install azure-cli",
        HostOs::Linux => {
            "To install it on Debian/Ubuntu, run: curl -sL https://aka.ms/InstallAzureCLIDeb | sudo bash\n  \
             Other distributions are covered on the download page."
        }
        HostOs::Windows => {
            "To install it on Windows, run: winget install -e --id Microsoft.AzureCLI\n  \
             or download the MSI installer from the download page."
        }
        HostOs::Other => "Follow the instructions on the download page for your platform.",
    };

    format!("{}\n{}", header, hint)
}
