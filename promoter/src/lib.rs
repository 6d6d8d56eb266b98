//! GitOps Promoter Library
//!
//! Promotes a value (typically an image tag) into a GitOps configuration
//! repository: one branch and pull request per target stack, with optional
//! wait-for-checks and squash-merge.

pub mod app;
pub mod authn;
pub mod config;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod git;
pub mod github;
pub mod logs;
pub mod mutate;
pub mod utils;
