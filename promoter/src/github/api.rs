//! Pull request operations used by the orchestrator and the deploy machine

use async_trait::async_trait;
use github_models::{CheckSuiteList, PullRequest};

use crate::errors::GitHubError;

/// An open pull request in a known repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestHandle {
    pub owner: String,
    pub repo: String,
    pub pull: PullRequest,
}

impl PullRequestHandle {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, pull: PullRequest) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            pull,
        }
    }

    pub fn number(&self) -> u64 {
        self.pull.number
    }

    pub fn head_branch(&self) -> &str {
        &self.pull.head.ref_name
    }

    pub fn base_branch(&self) -> &str {
        &self.pull.base.ref_name
    }

    pub fn html_url(&self) -> &str {
        &self.pull.html_url
    }

    /// Ref the hosting provider attaches check suites to
    pub fn check_ref(&self) -> String {
        format!("refs/pull/{}/head", self.pull.number)
    }
}

/// Pull request lifecycle seam
#[async_trait]
pub trait PullRequestApi: Send + Sync {
    /// Open a pull request from `head` into `base`.
    ///
    /// Fails with `GitHubError::AlreadyExists` when one is already open.
    async fn create_pr(
        &self,
        owner: &str,
        repo: &str,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequestHandle, GitHubError>;

    /// Find the open pull request whose head is `head_branch`
    async fn get_pr(
        &self,
        owner: &str,
        repo: &str,
        head_branch: &str,
    ) -> Result<PullRequestHandle, GitHubError>;

    /// Check suites reported for the pull request head
    async fn list_check_suites(&self, pr: &PullRequestHandle)
        -> Result<CheckSuiteList, GitHubError>;

    /// Squash-merge the pull request
    async fn merge_pr(&self, pr: &PullRequestHandle) -> Result<(), GitHubError>;
}
