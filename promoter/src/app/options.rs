//! Application configuration options

use std::path::PathBuf;

use crate::authn::CredentialOptions;
use crate::deploy::fsm::DeploySettings;
use crate::git::Author;

pub const DEFAULT_AUTHOR_NAME: &str = "gitops-promoter";
pub const DEFAULT_AUTHOR_EMAIL: &str = "gitops-promoter@users.noreply.github.com";
pub const DEFAULT_SERVER_URL: &str = "https://github.com";
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Prefix of the per-deployment clone directory
pub const CLONE_DIR_PREFIX: &str = "gitops-promoter";

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Path to the global document
    pub global_config: Option<PathBuf>,

    /// Path to the app document
    pub app_config: Option<PathBuf>,

    /// App name override
    pub app_name: Option<String>,

    /// Value injected into every target file
    pub value: String,

    /// Credential material
    pub credentials: CredentialOptions,

    /// Commit author
    pub author: Author,

    /// Pull request title override
    pub pr_title: Option<String>,

    /// Pull request body override
    pub pr_body: Option<String>,

    /// Base URL used to build clone URLs
    pub server_url: String,

    /// REST API base URL
    pub api_url: String,

    /// Deploy state machine settings
    pub deploy: DeploySettings,

    /// Parent of the per-deployment clone directories; the system temp dir
    /// when unset
    pub work_dir: Option<PathBuf>,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            global_config: None,
            app_config: None,
            app_name: None,
            value: String::new(),
            credentials: CredentialOptions::default(),
            author: Author {
                name: DEFAULT_AUTHOR_NAME.to_string(),
                email: DEFAULT_AUTHOR_EMAIL.to_string(),
            },
            pr_title: None,
            pr_body: None,
            server_url: DEFAULT_SERVER_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            deploy: DeploySettings::default(),
            work_dir: None,
        }
    }
}

impl AppOptions {
    /// Pull request title for `branch`
    pub fn pr_title(&self, branch: &str) -> String {
        match self.pr_title.as_deref().filter(|t| !t.is_empty()) {
            Some(title) => title.to_string(),
            None => format!("[CI] Automated PR to update {}", branch),
        }
    }

    /// Pull request body for `branch`
    pub fn pr_body(&self, branch: &str) -> String {
        match self.pr_body.as_deref().filter(|b| !b.is_empty()) {
            Some(body) => body.to_string(),
            None => format!("Automated PR to {} with the new value", branch),
        }
    }

    /// Commit message for the promoted value
    pub fn commit_message(&self) -> String {
        format!("automated commit to update tag to {}", self.value)
    }
}
