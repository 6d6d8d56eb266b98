//! GitHub REST client

use std::time::Duration;

use github_models::ErrorResponse;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::authn::Credential;
use crate::errors::{GitHubError, PromoterError};

pub const USER_AGENT: &str = "gitops-promoter";
pub const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// Installation tokens are re-minted when they expire within this window
const TOKEN_REFRESH_THRESHOLD: Duration = Duration::from_secs(60);

/// HTTP client for the hosting API
pub struct GitHubClient {
    client: Client,
    api_url: String,
    credential: Mutex<Credential>,
}

impl GitHubClient {
    /// Create the client and check the rate limit endpoint.
    ///
    /// A server without the rate limit endpoint is accepted; any other
    /// failure is fatal.
    pub async fn new(api_url: &str, credential: Credential) -> Result<Self, PromoterError> {
        let client = Self::without_rate_limit_check(api_url, credential)?;
        match client.check_rate_limit().await {
            Ok(()) | Err(GitHubError::Unsupported(_)) => Ok(client),
            Err(e) => Err(e.into()),
        }
    }

    /// Create the client without contacting the server
    pub fn without_rate_limit_check(api_url: &str, credential: Credential) -> Result<Self, PromoterError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(GitHubError::from)?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            credential: Mutex::new(credential),
        })
    }

    async fn bearer(&self) -> Result<String, GitHubError> {
        let mut credential = self.credential.lock().await;
        credential
            .ensure_fresh(TOKEN_REFRESH_THRESHOLD)
            .await
            .map_err(|e| GitHubError::Auth(e.to_string()))?;
        let secret = credential
            .current()
            .map_err(|e| GitHubError::Auth(e.to_string()))?;
        Ok(secret.expose_secret().to_string())
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GitHubError> {
        let token = self.bearer().await?;
        let response = request
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::ACCEPT, GITHUB_ACCEPT)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("GitHub request failed: {} - {}", status, body);
            return Err(classify(status, &body));
        }

        Ok(response.json().await?)
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GitHubError> {
        let url = format!("{}{}", self.api_url, path);
        debug!("GET {}", url);
        self.send(self.client.get(&url)).await
    }

    /// Make a GET request with query parameters
    pub async fn get_with_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, GitHubError> {
        let url = format!("{}{}", self.api_url, path);
        debug!("GET {}", url);
        self.send(self.client.get(&url).query(query)).await
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GitHubError> {
        let url = format!("{}{}", self.api_url, path);
        debug!("POST {}", url);
        self.send(self.client.post(&url).json(body)).await
    }

    /// Make a PUT request
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GitHubError> {
        let url = format!("{}{}", self.api_url, path);
        debug!("PUT {}", url);
        self.send(self.client.put(&url).json(body)).await
    }
}

/// Map a failed response onto the error classification
pub fn classify(status: StatusCode, body: &str) -> GitHubError {
    let parsed: ErrorResponse = serde_json::from_str(body).unwrap_or_default();
    let message = if parsed.message.is_empty() {
        body.to_string()
    } else {
        parsed.describe()
    };

    match status {
        StatusCode::NOT_FOUND => GitHubError::NotFound(message),
        StatusCode::UNAUTHORIZED => GitHubError::Auth(message),
        StatusCode::UNPROCESSABLE_ENTITY if mentions_existing_pull(&parsed) => {
            GitHubError::AlreadyExists(message)
        }
        _ => GitHubError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

fn mentions_existing_pull(response: &ErrorResponse) -> bool {
    response
        .errors
        .iter()
        .filter_map(|e| e.message.as_deref())
        .chain(std::iter::once(response.message.as_str()))
        .any(|m| m.to_lowercase().contains("pull request already exists"))
}
