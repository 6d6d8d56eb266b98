//! Drives the deploy state machine for one pull request

use tracing::{info, warn};

use crate::deploy::checks::{evaluate_check_suites, CheckError};
use crate::deploy::fsm::{DeployEvent, DeployFsm, DeploySettings, DeployState};
use crate::deploy::retry::{retry_fixed, SleepFn};
use crate::errors::{GitHubError, PromoterError};
use crate::github::{PullRequestApi, PullRequestHandle};

/// Waits for the checks of a pull request and squash-merges it
pub struct DeployExecutor<'a, A: PullRequestApi + ?Sized> {
    api: &'a A,
    settings: &'a DeploySettings,
    sleep: SleepFn,
    fsm: DeployFsm,
}

impl<'a, A: PullRequestApi + ?Sized> DeployExecutor<'a, A> {
    /// Create a new executor
    pub fn new(api: &'a A, settings: &'a DeploySettings, sleep: SleepFn) -> Self {
        Self {
            api,
            settings,
            sleep,
            fsm: DeployFsm::new(),
        }
    }

    /// Get the current deployment state
    pub fn state(&self) -> &DeployState {
        self.fsm.state()
    }

    /// Error recorded by the last failed phase
    pub fn error(&self) -> Option<&str> {
        self.fsm.error()
    }

    /// Run both phases. Runs at most once per executor.
    pub async fn deploy(&mut self, pr: &PullRequestHandle) -> Result<(), PromoterError> {
        self.transition(DeployEvent::WaitForChecks)?;
        match self.wait_for_checks(pr).await {
            Ok(polls) => {
                info!("checks passed for PR #{} after {} poll(s)", pr.number(), polls);
                self.transition(DeployEvent::ChecksPassed)?;
            }
            Err(e) => {
                self.transition(DeployEvent::ChecksExhausted(e.to_string()))?;
                return Err(PromoterError::DeployError(format!(
                    "checks for PR #{} did not pass after {} attempts: {}",
                    pr.number(),
                    self.settings.check_attempts,
                    e
                )));
            }
        }

        self.transition(DeployEvent::Merge)?;
        match self.merge(pr).await {
            Ok(()) => {
                self.transition(DeployEvent::Merged)?;
                info!("PR deployed: {}", pr.html_url());
                Ok(())
            }
            Err(e) => {
                self.transition(DeployEvent::MergeExhausted(e.to_string()))?;
                Err(PromoterError::DeployError(format!(
                    "failed to merge PR #{} after {} attempts: {}",
                    pr.number(),
                    self.settings.merge_attempts,
                    e
                )))
            }
        }
    }

    /// Poll check suites until they pass; returns the number of polls made
    pub async fn wait_for_checks(&self, pr: &PullRequestHandle) -> Result<u32, CheckError> {
        (self.sleep)(self.settings.initial_delay).await;

        let api = self.api;
        let settings = self.settings;
        retry_fixed(
            settings.check_attempts,
            settings.check_delay,
            &self.sleep,
            |attempt| async move {
                let checks = api.list_check_suites(pr).await?;
                evaluate_check_suites(&checks, settings)?;
                Ok::<u32, CheckError>(attempt)
            },
            |_, err| match err {
                CheckError::NoChecksFound => info!(
                    "No checks found for PR. The provider may not have reported them yet. retrying..."
                ),
                CheckError::CheckNotCompleted => {
                    info!("One or more checks have not completed yet. retrying...")
                }
                CheckError::CheckFailed => info!("One or more checks failed. retrying..."),
                CheckError::Fetch(e) => warn!("waiting for checks to pass: {}", e),
            },
        )
        .await
    }

    /// Attempt the squash-merge until it succeeds or the budget runs out
    pub async fn merge(&self, pr: &PullRequestHandle) -> Result<(), GitHubError> {
        let api = self.api;
        retry_fixed(
            self.settings.merge_attempts,
            self.settings.merge_delay,
            &self.sleep,
            |_| async move { api.merge_pr(pr).await },
            |attempt, err| info!("attempt: {} to merge PR: {}", attempt, err),
        )
        .await
    }

    fn transition(&mut self, event: DeployEvent) -> Result<(), PromoterError> {
        self.fsm.process(event).map_err(PromoterError::DeployError)
    }
}
