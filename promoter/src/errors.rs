//! Error types for the gitops promoter

use thiserror::Error;

/// Main error type for the promoter
#[derive(Error, Debug)]
pub enum PromoterError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Mutation error: {0}")]
    MutationError(String),

    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("GitHub error: {0}")]
    GitHub(#[from] GitHubError),

    #[error("Deployment error: {0}")]
    DeployError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Git failures, classified from the underlying library error
#[derive(Error, Debug)]
pub enum GitError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("network failure: {0}")]
    Network(String),

    #[error("checkout failed: {0}")]
    Checkout(String),

    /// The remote already holds the pushed content
    #[error("already up-to-date")]
    UpToDate,

    #[error("push rejected for {reference}: {message}")]
    Rejected { reference: String, message: String },

    #[error("{0}")]
    Other(String),
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        use git2::{ErrorClass, ErrorCode};

        let message = err.message().to_string();
        let lowered = message.to_lowercase();
        if lowered.contains("up to date") || lowered.contains("up-to-date") {
            return GitError::UpToDate;
        }
        match (err.code(), err.class()) {
            (ErrorCode::Auth, _) | (_, ErrorClass::Ssh) => GitError::Auth(message),
            (ErrorCode::Conflict, _) | (ErrorCode::MergeConflict, _) | (_, ErrorClass::Checkout) => {
                GitError::Checkout(message)
            }
            (_, ErrorClass::Net) | (_, ErrorClass::Http) | (_, ErrorClass::Ssl) => {
                GitError::Network(message)
            }
            _ => GitError::Other(message),
        }
    }
}

/// Hosting API failures
#[derive(Error, Debug)]
pub enum GitHubError {
    /// An open pull request already exists for the head/base pair
    #[error("pull request already exists: {0}")]
    AlreadyExists(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The endpoint is not available on this server
    #[error("endpoint not supported: {0}")]
    Unsupported(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl GitHubError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, GitHubError::AlreadyExists(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GitHubError::NotFound(_))
    }
}
