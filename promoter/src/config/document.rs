//! Configuration document model

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::PromoterError;

/// A gitops configuration document (global or app level)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitOpsConfig {
    /// Carried through, not interpreted
    #[serde(default)]
    pub api_version: String,

    /// Carried through, not interpreted
    #[serde(default)]
    pub kind: String,

    #[serde(default)]
    pub spec: GitOpsSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitOpsSpec {
    #[serde(default)]
    pub config_repo: ConfigRepo,

    /// Mutations applied, in order, to every deployment's checkout
    #[serde(default)]
    pub target_files: Vec<TargetFile>,

    /// One entry per target stack
    #[serde(default)]
    pub deployments: Vec<Deployment>,
}

/// The configuration repository and this app's place in it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigRepo {
    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub repo: String,

    #[serde(default)]
    pub app_path_prefix: String,

    #[serde(default)]
    pub app: String,
}

/// A file mutation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetFile {
    /// Path relative to the stack directory
    #[serde(default)]
    pub path: String,

    /// Strategy name: `regex` or `yaml`
    #[serde(default)]
    pub replacer: String,

    /// Key assigned by the `yaml` strategy
    #[serde(default)]
    pub key: String,

    /// Parameters of the `regex` strategy
    #[serde(default)]
    pub regex: RegexParams,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexParams {
    #[serde(default)]
    pub pattern: String,

    /// Replacement prefix; the promoted value is appended to it
    #[serde(default)]
    pub tmpl: String,
}

/// A target stack to promote into
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    /// Branch the pull request merges into
    #[serde(default)]
    pub source_branch: String,

    #[serde(default)]
    pub target_stack: String,

    /// Wait for checks and merge once the pull request is open
    #[serde(default)]
    pub auto_deploy: bool,
}

impl GitOpsConfig {
    /// Reject documents missing required fields
    pub fn validate(&self) -> Result<(), PromoterError> {
        let repo = &self.spec.config_repo;
        let required = [
            (repo.owner.as_str(), "configRepo.owner"),
            (repo.repo.as_str(), "configRepo.repo"),
            (repo.app_path_prefix.as_str(), "configRepo.appPathPrefix"),
            (repo.app.as_str(), "configRepo.app"),
        ];
        for (value, field) in required {
            if value.is_empty() {
                return Err(PromoterError::ValidationError(format!("{} is required", field)));
            }
        }
        if self.spec.target_files.is_empty() {
            return Err(PromoterError::ValidationError(
                "targetFiles is required".to_string(),
            ));
        }
        if self.spec.deployments.is_empty() {
            return Err(PromoterError::ValidationError(
                "deployments is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Clone URL of the configuration repository
    pub fn repo_url(&self, server_url: &str) -> String {
        format!(
            "{}/{}/{}",
            server_url.trim_end_matches('/'),
            self.spec.config_repo.owner,
            self.spec.config_repo.repo
        )
    }

    /// Working branch for a deployment: `{app}/{targetStack}`
    pub fn branch_name(&self, deployment: &Deployment) -> String {
        format!("{}/{}", self.spec.config_repo.app, deployment.target_stack)
    }

    /// Stack directory inside a checkout: `{root}/{appPathPrefix}/{app}/{targetStack}`
    pub fn app_path(&self, root: &Path, deployment: &Deployment) -> PathBuf {
        root.join(&self.spec.config_repo.app_path_prefix)
            .join(&self.spec.config_repo.app)
            .join(&deployment.target_stack)
    }
}
