//! Command-line front end

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::app::options::{
    AppOptions, DEFAULT_API_URL, DEFAULT_AUTHOR_EMAIL, DEFAULT_AUTHOR_NAME, DEFAULT_SERVER_URL,
};
use crate::authn::CredentialOptions;
use crate::errors::PromoterError;
use crate::git::Author;
use crate::logs::{LogLevel, LogOptions};

/// Promote a value into a GitOps configuration repository
#[derive(Debug, Parser)]
#[command(name = "gitops-promoter", disable_version_flag = true)]
pub struct Cli {
    /// Path to the global config document
    #[arg(long, env = "GLOBAL_CONFIG")]
    pub global_config: Option<PathBuf>,

    /// Path to the app config document
    #[arg(long, env = "APP_CONFIG")]
    pub app_config: Option<PathBuf>,

    /// App name, required if the app config is not provided
    #[arg(long, env = "APP_NAME")]
    pub app_name: Option<String>,

    /// Value injected into the target files
    #[arg(long, env = "VALUE", required_unless_present = "version")]
    pub value: Option<String>,

    /// Static API token
    #[arg(long, env = "GH_TOKEN", hide_env_values = true)]
    pub gh_token: Option<String>,

    /// Path to the application private key (PEM)
    #[arg(long, env = "GH_APP_KEY")]
    pub gh_app_key: Option<PathBuf>,

    /// Application id
    #[arg(long, env = "GH_APP_ID")]
    pub gh_app_id: Option<u64>,

    /// Installation id
    #[arg(long, env = "GH_APP_INSTALLATION_ID")]
    pub gh_app_installation_id: Option<u64>,

    #[arg(long, env = "GIT_COMMIT_AUTHOR_NAME", default_value = DEFAULT_AUTHOR_NAME)]
    pub git_commit_author_name: String,

    #[arg(long, env = "GIT_COMMIT_AUTHOR_EMAIL", default_value = DEFAULT_AUTHOR_EMAIL)]
    pub git_commit_author_email: String,

    /// Pull request title override
    #[arg(long, env = "PR_TITLE")]
    pub pr_title: Option<String>,

    /// Pull request body override
    #[arg(long, env = "PR_BODY")]
    pub pr_body: Option<String>,

    /// Base URL used to build clone URLs
    #[arg(long, env = "GITHUB_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub github_url: String,

    /// REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub github_api_url: String,

    /// Log level, `RUST_LOG` takes precedence
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Emit JSON logs
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,

    /// Disable colored plain logs
    #[arg(long)]
    pub no_color: bool,

    /// Print version information and exit
    #[arg(short = 'v', long, action = ArgAction::SetTrue)]
    pub version: bool,
}

impl Cli {
    /// Logging options for this invocation; colors only reach a terminal
    pub fn log_options(&self) -> LogOptions {
        self.log_options_for(std::io::stdout().is_terminal())
    }

    fn log_options_for(&self, terminal: bool) -> LogOptions {
        LogOptions {
            log_level: self.log_level,
            json_format: self.log_json,
            ansi: terminal && !self.log_json && !self.no_color,
        }
    }

    /// Convert the parsed arguments into run options
    pub fn into_options(self) -> Result<AppOptions, PromoterError> {
        let app_config = self.app_config.filter(|p| !p.as_os_str().is_empty());
        let app_name = self.app_name.filter(|n| !n.is_empty());
        if app_config.is_none() && app_name.is_none() {
            return Err(PromoterError::ConfigError(
                "app name is required if app config is not provided".to_string(),
            ));
        }

        let value = self
            .value
            .ok_or_else(|| PromoterError::ConfigError("value is required".to_string()))?;

        Ok(AppOptions {
            global_config: self.global_config,
            app_config,
            app_name,
            value,
            credentials: CredentialOptions {
                token: self.gh_token,
                app_key_path: self.gh_app_key,
                app_id: self.gh_app_id,
                installation_id: self.gh_app_installation_id,
            },
            author: Author {
                name: self.git_commit_author_name,
                email: self.git_commit_author_email,
            },
            pr_title: self.pr_title,
            pr_body: self.pr_body,
            server_url: self.github_url,
            api_url: self.github_api_url,
            ..Default::default()
        })
    }
}
