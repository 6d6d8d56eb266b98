//! Rate limit check

use chrono::{DateTime, Utc};
use github_models::RateLimitResponse;
use tracing::info;

use crate::errors::GitHubError;
use crate::github::client::GitHubClient;

impl GitHubClient {
    /// Log the core rate limit. A 404 from the endpoint is reported as
    /// `GitHubError::Unsupported`.
    pub async fn check_rate_limit(&self) -> Result<(), GitHubError> {
        let limits: RateLimitResponse = match self.get("/rate_limit").await {
            Ok(limits) => limits,
            Err(GitHubError::NotFound(message)) => {
                info!("rate limit endpoint not available, skipping");
                return Err(GitHubError::Unsupported(message));
            }
            Err(e) => return Err(e),
        };

        let core = limits.resources.core;
        let resets_in = DateTime::<Utc>::from_timestamp(core.reset, 0)
            .map(|reset| (reset - Utc::now()).num_seconds().max(0))
            .unwrap_or(0);
        info!(
            "GitHub API rate limit: {}, remaining: {}, resets in: {}s",
            core.limit, core.remaining, resets_in
        );
        Ok(())
    }
}
