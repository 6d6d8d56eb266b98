//! Installation access tokens minted from an application key

use std::time::Duration;

use chrono::{DateTime, Utc};
use github_models::{ErrorResponse, InstallationToken};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{header, Client};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::errors::PromoterError;
use crate::github::client::{GITHUB_ACCEPT, USER_AGENT};

/// Claims of the application JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct AppClaims {
    /// Issued at, backdated to absorb clock skew
    pub iat: i64,
    /// Expiration, at most ten minutes out
    pub exp: i64,
    /// Application id
    pub iss: String,
}

/// A minted installation token
pub struct AccessToken {
    pub secret: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Check if the token expires within the given duration
    pub fn expires_within(&self, threshold: Duration) -> bool {
        let threshold =
            chrono::Duration::from_std(threshold).unwrap_or_else(|_| chrono::Duration::days(365));
        self.expires_at < Utc::now() + threshold
    }
}

/// Key material and endpoint for minting installation tokens
pub struct InstallationAuth {
    app_id: u64,
    installation_id: u64,
    key: EncodingKey,
    api_url: String,
    client: Client,
    token: Option<AccessToken>,
}

impl InstallationAuth {
    /// Create from a PEM encoded RSA private key
    pub fn new(
        app_id: u64,
        installation_id: u64,
        private_key_pem: &[u8],
        api_url: &str,
    ) -> Result<Self, PromoterError> {
        let key = EncodingKey::from_rsa_pem(private_key_pem)
            .map_err(|e| PromoterError::AuthError(format!("invalid app key: {}", e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PromoterError::AuthError(e.to_string()))?;

        Ok(Self {
            app_id,
            installation_id,
            key,
            api_url: api_url.trim_end_matches('/').to_string(),
            client,
            token: None,
        })
    }

    pub fn app_id(&self) -> u64 {
        self.app_id
    }

    pub fn installation_id(&self) -> u64 {
        self.installation_id
    }

    /// The current token, if one was minted
    pub fn token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    /// Sign a short-lived application JWT
    pub fn app_jwt(&self) -> Result<String, PromoterError> {
        let now = Utc::now().timestamp();
        let claims = AppClaims {
            iat: now - 60,
            exp: now + 10 * 60,
            iss: self.app_id.to_string(),
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| PromoterError::AuthError(format!("failed to sign app JWT: {}", e)))
    }

    /// Exchange the application JWT for a fresh installation token
    pub async fn mint(&mut self) -> Result<&AccessToken, PromoterError> {
        let jwt = self.app_jwt()?;
        let url = format!(
            "{}/app/installations/{}/access_tokens",
            self.api_url, self.installation_id
        );
        debug!("POST {} (installation token)", url);

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", jwt))
            .header(header::ACCEPT, GITHUB_ACCEPT)
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| PromoterError::AuthError(format!("installation token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.describe())
                .unwrap_or(body);
            error!("Installation token request failed: {} - {}", status, message);
            return Err(PromoterError::AuthError(format!(
                "installation token request failed: {} - {}",
                status, message
            )));
        }

        let minted: InstallationToken = response
            .json()
            .await
            .map_err(|e| PromoterError::AuthError(format!("invalid installation token response: {}", e)))?;
        info!("Installation token minted, expires at: {}", minted.expires_at);

        let token = self.token.insert(AccessToken {
            secret: SecretString::from(minted.token),
            expires_at: minted.expires_at,
        });
        Ok(&*token)
    }
}
