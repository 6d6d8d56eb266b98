//! Deployment configuration

pub mod document;
pub mod resolve;

pub use document::{ConfigRepo, Deployment, GitOpsConfig, GitOpsSpec, RegexParams, TargetFile};
pub use resolve::{finalize_config, get_config, read_config};
