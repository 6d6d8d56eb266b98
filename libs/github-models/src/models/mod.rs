//! API models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account that owns a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,
}

/// Repository summary embedded in other payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: Owner,
}

/// One side (head or base) of a pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub repo: Option<Repository>,
}

/// Pull request as returned by the pulls endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub title: String,
    pub head: PullRequestRef,
    pub base: PullRequestRef,
}

/// Pull request creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPullRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
}

/// Integration that reported a check suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckApp {
    #[serde(default)]
    pub slug: Option<String>,
}

/// Aggregate CI result for a ref
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSuite {
    pub id: u64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub app: Option<CheckApp>,
}

impl CheckSuite {
    /// Slug of the reporting integration, empty when unknown
    pub fn app_slug(&self) -> &str {
        self.app
            .as_ref()
            .and_then(|app| app.slug.as_deref())
            .unwrap_or("")
    }

    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or("")
    }

    pub fn conclusion(&self) -> &str {
        self.conclusion.as_deref().unwrap_or("")
    }
}

/// Check suites listing for a ref
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckSuiteList {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub check_suites: Vec<CheckSuite>,
}

/// Merge strategy accepted by the merge endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMethod {
    Merge,
    Squash,
    Rebase,
}

/// Merge request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergePullRequest {
    pub merge_method: MergeMethod,
}

/// Merge response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeResult {
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub message: String,
}

/// A single rate limit bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rate {
    pub limit: u64,
    pub remaining: u64,
    /// Reset time as epoch seconds
    pub reset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitResources {
    pub core: Rate,
}

/// Rate limit response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitResponse {
    pub resources: RateLimitResources,
}

/// Installation access token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Validation detail attached to an error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Error response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
    #[serde(default)]
    pub documentation_url: Option<String>,
}

impl ErrorResponse {
    /// Flatten the top-level message and every detail message into one line
    pub fn describe(&self) -> String {
        let details: Vec<&str> = self
            .errors
            .iter()
            .filter_map(|e| e.message.as_deref())
            .collect();
        if details.is_empty() {
            self.message.clone()
        } else {
            format!("{}: {}", self.message, details.join("; "))
        }
    }
}
