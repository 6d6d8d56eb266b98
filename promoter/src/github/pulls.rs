//! Pull request endpoints

use async_trait::async_trait;
use github_models::{
    CheckSuiteList, MergeMethod, MergePullRequest, MergeResult, NewPullRequest, PullRequest,
};
use tracing::info;

use crate::errors::GitHubError;
use crate::github::api::{PullRequestApi, PullRequestHandle};
use crate::github::client::GitHubClient;

#[async_trait]
impl PullRequestApi for GitHubClient {
    async fn create_pr(
        &self,
        owner: &str,
        repo: &str,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequestHandle, GitHubError> {
        let path = format!("/repos/{}/{}/pulls", owner, repo);
        let request = NewPullRequest {
            title: title.to_string(),
            head: head.to_string(),
            base: base.to_string(),
            body: body.to_string(),
        };
        let pull: PullRequest = self.post(&path, &request).await?;
        Ok(PullRequestHandle::new(owner, repo, pull))
    }

    async fn get_pr(
        &self,
        owner: &str,
        repo: &str,
        head_branch: &str,
    ) -> Result<PullRequestHandle, GitHubError> {
        let path = format!("/repos/{}/{}/pulls", owner, repo);
        let head = format!("{}:{}", owner, head_branch);
        let pulls: Vec<PullRequest> = self
            .get_with_query(&path, &[("head", head.as_str()), ("state", "open")])
            .await?;
        pulls
            .into_iter()
            .next()
            .map(|pull| PullRequestHandle::new(owner, repo, pull))
            .ok_or_else(|| GitHubError::NotFound(format!("no PR found for branch {}", head_branch)))
    }

    async fn list_check_suites(
        &self,
        pr: &PullRequestHandle,
    ) -> Result<CheckSuiteList, GitHubError> {
        let path = format!(
            "/repos/{}/{}/commits/{}/check-suites",
            pr.owner,
            pr.repo,
            pr.check_ref()
        );
        self.get(&path).await
    }

    async fn merge_pr(&self, pr: &PullRequestHandle) -> Result<(), GitHubError> {
        let path = format!("/repos/{}/{}/pulls/{}/merge", pr.owner, pr.repo, pr.number());
        let request = MergePullRequest {
            merge_method: MergeMethod::Squash,
        };
        let result: MergeResult = self.put(&path, &request).await?;
        if !result.merged {
            return Err(GitHubError::Api {
                status: 200,
                message: format!("PR #{} was not merged: {}", pr.number(), result.message),
            });
        }
        info!("merged PR #{} ({})", pr.number(), result.sha.unwrap_or_default());
        Ok(())
    }
}
