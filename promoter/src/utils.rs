//! Utility functions

use serde::{Deserialize, Serialize};

use crate::errors::PromoterError;

/// Version information for the promoter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Version information rendered as pretty JSON
pub fn version_json() -> Result<String, PromoterError> {
    Ok(serde_json::to_string_pretty(&version_info())?)
}
