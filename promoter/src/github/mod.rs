//! Hosting API access

pub mod api;
pub mod client;
pub mod pulls;
pub mod rate_limit;

pub use api::{PullRequestApi, PullRequestHandle};
pub use client::GitHubClient;
