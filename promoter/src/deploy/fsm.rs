//! Finite State Machine for pull request deployment

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Deploy settings
#[derive(Debug, Clone)]
pub struct DeploySettings {
    /// Delay before the first check poll, letting the provider register suites
    pub initial_delay: Duration,

    /// Check polls before giving up
    pub check_attempts: u32,

    /// Delay between check polls
    pub check_delay: Duration,

    /// Merge attempts before giving up
    pub merge_attempts: u32,

    /// Delay between merge attempts
    pub merge_delay: Duration,

    /// Only suites reported by this integration are evaluated
    pub ci_app_slug: String,

    /// Conclusions counted as a failed check
    pub failed_conclusions: Vec<String>,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            check_attempts: 60,
            check_delay: Duration::from_secs(5),
            merge_attempts: 24,
            merge_delay: Duration::from_secs(5),
            ci_app_slug: "github-actions".to_string(),
            failed_conclusions: vec![
                "failure".to_string(),
                "cancelled".to_string(),
                "timed_out".to_string(),
            ],
        }
    }
}

/// Deployment state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployState {
    /// Pull request opened or found, nothing polled yet
    Created,

    /// Polling check suites
    WaitingForChecks,

    /// Every evaluated suite completed without failure
    ChecksPassed,

    /// Attempting the squash-merge
    Merging,

    /// Pull request merged
    Merged,

    /// Check budget exhausted
    ChecksExhausted,

    /// Merge budget exhausted
    MergeExhausted,
}

/// Deployment event
#[derive(Debug, Clone)]
pub enum DeployEvent {
    /// Start polling checks
    WaitForChecks,

    /// Checks succeeded
    ChecksPassed,

    /// Check polls ran out
    ChecksExhausted(String),

    /// Start merging
    Merge,

    /// Merge succeeded
    Merged,

    /// Merge attempts ran out
    MergeExhausted(String),
}

/// Deploy FSM
#[derive(Debug, Clone)]
pub struct DeployFsm {
    state: DeployState,
    error: Option<String>,
}

impl DeployFsm {
    /// Create a new FSM in created state
    pub fn new() -> Self {
        Self {
            state: DeployState::Created,
            error: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> &DeployState {
        &self.state
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            DeployState::Merged | DeployState::ChecksExhausted | DeployState::MergeExhausted
        )
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: DeployEvent) -> Result<(), String> {
        let new_state = match (&self.state, &event) {
            (DeployState::Created, DeployEvent::WaitForChecks) => DeployState::WaitingForChecks,

            (DeployState::WaitingForChecks, DeployEvent::ChecksPassed) => DeployState::ChecksPassed,
            (DeployState::WaitingForChecks, DeployEvent::ChecksExhausted(err)) => {
                self.error = Some(err.clone());
                DeployState::ChecksExhausted
            }

            (DeployState::ChecksPassed, DeployEvent::Merge) => DeployState::Merging,

            (DeployState::Merging, DeployEvent::Merged) => DeployState::Merged,
            (DeployState::Merging, DeployEvent::MergeExhausted(err)) => {
                self.error = Some(err.clone());
                DeployState::MergeExhausted
            }

            // Invalid transitions
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }
}

impl Default for DeployFsm {
    fn default() -> Self {
        Self::new()
    }
}
