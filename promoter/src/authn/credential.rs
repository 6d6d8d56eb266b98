//! Static token or installation credential behind one interface

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::authn::installation::InstallationAuth;
use crate::errors::PromoterError;
use crate::filesys::file::File;

/// Username paired with the credential on git HTTP transports
pub const GIT_USERNAME: &str = "x-access-token";

/// Raw credential material, as supplied on the command line
#[derive(Clone, Default)]
pub struct CredentialOptions {
    pub token: Option<String>,
    pub app_key_path: Option<PathBuf>,
    pub app_id: Option<u64>,
    pub installation_id: Option<u64>,
}

impl fmt::Debug for CredentialOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialOptions")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("app_key_path", &self.app_key_path)
            .field("app_id", &self.app_id)
            .field("installation_id", &self.installation_id)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialMode {
    Token,
    Installation,
}

/// The live credential of a client
pub enum Credential {
    Token(SecretString),
    Installation(Box<InstallationAuth>),
}

impl Credential {
    /// Static token credential
    pub fn token(token: impl Into<String>) -> Self {
        Credential::Token(SecretString::from(token.into()))
    }

    /// Select the mode from the supplied material: a non-empty token wins,
    /// otherwise key path, app id and installation id are all required.
    pub async fn from_options(
        options: &CredentialOptions,
        api_url: &str,
    ) -> Result<Self, PromoterError> {
        if let Some(token) = options.token.as_deref().filter(|t| !t.is_empty()) {
            debug!("using token credential");
            return Ok(Credential::token(token));
        }

        let (key_path, app_id, installation_id) = match (
            options.app_key_path.as_ref(),
            options.app_id,
            options.installation_id,
        ) {
            (Some(path), Some(app_id), Some(installation_id)) => (path, app_id, installation_id),
            _ => {
                return Err(PromoterError::AuthError(
                    "either a token or an app key, app id and installation id are required"
                        .to_string(),
                ))
            }
        };

        let pem = File::new(key_path).read_string().await.map_err(|e| {
            PromoterError::AuthError(format!(
                "unable to read app key {}: {}",
                key_path.display(),
                e
            ))
        })?;
        debug!(
            "using installation credential (app {}, installation {})",
            app_id, installation_id
        );
        let auth = InstallationAuth::new(app_id, installation_id, pem.as_bytes(), api_url)?;
        Ok(Credential::Installation(Box::new(auth)))
    }

    pub fn mode(&self) -> CredentialMode {
        match self {
            Credential::Token(_) => CredentialMode::Token,
            Credential::Installation(_) => CredentialMode::Installation,
        }
    }

    /// No-op for a static token; mints a new installation token otherwise
    pub async fn refresh(&mut self) -> Result<(), PromoterError> {
        match self {
            Credential::Token(_) => Ok(()),
            Credential::Installation(auth) => auth.mint().await.map(|_| ()),
        }
    }

    /// Refresh only when no token is held or it expires within `threshold`
    pub async fn ensure_fresh(&mut self, threshold: Duration) -> Result<(), PromoterError> {
        let stale = match self {
            Credential::Token(_) => false,
            Credential::Installation(auth) => auth
                .token()
                .map(|t| t.expires_within(threshold))
                .unwrap_or(true),
        };
        if stale {
            self.refresh().await?;
        }
        Ok(())
    }

    /// The live credential value
    pub fn current(&self) -> Result<&SecretString, PromoterError> {
        match self {
            Credential::Token(secret) => Ok(secret),
            Credential::Installation(auth) => auth.token().map(|t| &t.secret).ok_or_else(|| {
                PromoterError::AuthError("installation token has not been minted".to_string())
            }),
        }
    }

    /// The live credential value as a plain string
    pub fn expose(&self) -> Result<String, PromoterError> {
        Ok(self.current()?.expose_secret().to_string())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Token(_) => f.write_str("Credential::Token(<redacted>)"),
            Credential::Installation(auth) => f
                .debug_struct("Credential::Installation")
                .field("app_id", &auth.app_id())
                .field("installation_id", &auth.installation_id())
                .finish(),
        }
    }
}
