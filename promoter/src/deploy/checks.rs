//! Check suite classification

use github_models::CheckSuiteList;
use thiserror::Error;
use tracing::debug;

use crate::deploy::fsm::DeploySettings;
use crate::errors::GitHubError;

/// Why a check poll did not pass. Every variant is retried until the
/// poll budget runs out.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("NoChecksFound")]
    NoChecksFound,

    #[error("CheckNotCompleted")]
    CheckNotCompleted,

    #[error("CheckFailed")]
    CheckFailed,

    #[error("failed to fetch check suites: {0}")]
    Fetch(#[from] GitHubError),
}

/// Classify the suites reported for a pull request head.
///
/// Suites from integrations other than `settings.ci_app_slug` are ignored;
/// the first evaluated suite that is not completed or has a failed
/// conclusion decides the result.
pub fn evaluate_check_suites(
    checks: &CheckSuiteList,
    settings: &DeploySettings,
) -> Result<(), CheckError> {
    if checks.check_suites.is_empty() {
        return Err(CheckError::NoChecksFound);
    }

    for suite in &checks.check_suites {
        debug!(
            "Check: {}, app: {}, status: {}, conclusion: {}",
            suite.id,
            suite.app_slug(),
            suite.status(),
            suite.conclusion()
        );
        if suite.app_slug() != settings.ci_app_slug {
            debug!("Skipping check from {:?}", suite.app_slug());
            continue;
        }
        if suite.status() != "completed" {
            return Err(CheckError::CheckNotCompleted);
        }
        if settings
            .failed_conclusions
            .iter()
            .any(|c| c == suite.conclusion())
        {
            return Err(CheckError::CheckFailed);
        }
    }

    Ok(())
}
