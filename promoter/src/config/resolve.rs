//! Loads and overlays the global and app documents

use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, warn};

use crate::config::document::GitOpsConfig;
use crate::errors::PromoterError;
use crate::filesys::file::File;

/// Read a configuration document.
///
/// An empty path or a missing file yields `Ok(None)`; every other read or
/// parse failure is a configuration error.
pub async fn read_config(path: Option<&Path>) -> Result<Option<GitOpsConfig>, PromoterError> {
    let path = match path {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => return Ok(None),
    };

    let file = File::new(path);
    let contents = match file.read_string().await {
        Ok(contents) => contents,
        Err(PromoterError::IoError(e)) if e.kind() == ErrorKind::NotFound => {
            warn!("config file {} not found", path.display());
            return Ok(None);
        }
        Err(e) => {
            return Err(PromoterError::ConfigError(format!(
                "error reading config {}: {}",
                path.display(),
                e
            )))
        }
    };

    // An empty document deserializes to the all-default shell
    if contents.trim().is_empty() {
        return Ok(Some(GitOpsConfig::default()));
    }

    let config = serde_yaml::from_str(&contents).map_err(|e| {
        PromoterError::ConfigError(format!("error parsing config {}: {}", path.display(), e))
    })?;
    Ok(Some(config))
}

/// Overlay the app document onto the global one and validate the result.
///
/// Precedence for the app name is global, then `app_name`, then the app
/// document. Non-empty sequences in the app document replace the global ones
/// wholesale.
pub fn finalize_config(
    global: Option<GitOpsConfig>,
    app: Option<GitOpsConfig>,
    app_name: Option<&str>,
) -> Result<GitOpsConfig, PromoterError> {
    let mut config = global.unwrap_or_default();

    if let Some(name) = app_name.filter(|n| !n.is_empty()) {
        config.spec.config_repo.app = name.to_string();
    }

    if let Some(app) = app {
        let repo = app.spec.config_repo;
        overlay(&mut config.spec.config_repo.owner, repo.owner);
        overlay(&mut config.spec.config_repo.repo, repo.repo);
        overlay(&mut config.spec.config_repo.app_path_prefix, repo.app_path_prefix);
        overlay(&mut config.spec.config_repo.app, repo.app);
        overlay(&mut config.api_version, app.api_version);
        overlay(&mut config.kind, app.kind);

        if !app.spec.target_files.is_empty() {
            config.spec.target_files = app.spec.target_files;
        }
        if !app.spec.deployments.is_empty() {
            config.spec.deployments = app.spec.deployments;
        }
    }

    config.validate()?;
    Ok(config)
}

fn overlay(target: &mut String, value: String) {
    if !value.is_empty() {
        *target = value;
    }
}

/// Resolve the deployment config for a run
pub async fn get_config(
    global_path: Option<&Path>,
    app_path: Option<&Path>,
    app_name: Option<&str>,
) -> Result<GitOpsConfig, PromoterError> {
    debug!(
        "merging configs: global={:?}, app={:?}",
        global_path, app_path
    );
    let global = read_config(global_path).await?;
    let app = read_config(app_path).await?;
    finalize_config(global, app, app_name)
}
