//! HTTP transport for the remote sync endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{PullPayload, PushBatch, SyncTransport, TransportError};
use crate::error::{Result, SemdiffError};
use crate::storage::traits::StorageEngine;
use crate::storage::types::{settings_keys, DEFAULT_API_BASE};

/// Request timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
}

/// reqwest-based [`SyncTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    api_base: String,
    token: Option<String>,
}

impl HttpTransport {
    pub fn new(api_base: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SemdiffError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Build a transport from the `api_base` and `token` settings.
    pub fn from_settings<S: StorageEngine + ?Sized>(store: &S, timeout: Duration) -> Result<Self> {
        let api_base = store
            .get_setting(settings_keys::API_BASE)?
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let token = store.get_setting(settings_keys::TOKEN)?;
        Self::new(api_base, token, timeout)
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Exchange credentials for an access token.
    ///
    /// The token is returned, not stored; see [`login_and_store`].
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let url = format!("{}/auth/login", self.api_base);
        let response = self
            .client
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(|e| SemdiffError::Transport(format!("Login request failed: {}", e)))?;

        let response = check_status(response).await?;
        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| SemdiffError::Transport(format!("Invalid login response: {}", e)))?;
        Ok(body.access_token)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Log in against the configured endpoint and store the token in settings.
pub async fn login_and_store<S: StorageEngine + ?Sized>(
    store: &S,
    username: &str,
    password: &str,
    timeout: Duration,
) -> Result<String> {
    let transport = HttpTransport::from_settings(store, timeout)?;
    let token = transport.login(username, password).await?;
    store.set_setting(settings_keys::TOKEN, &token)?;
    Ok(token)
}

async fn check_status(response: Response) -> std::result::Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = match response.text().await {
        Ok(text) => text,
        Err(_) => "failed to read response body".to_string(),
    };
    Err(TransportError::status(status.as_u16(), body))
}

fn network_error(e: reqwest::Error) -> TransportError {
    TransportError::network(format!("Request failed: {}", e))
}

#[async_trait]
impl SyncTransport for HttpTransport {
    async fn push(&self, batch: &PushBatch) -> std::result::Result<(), TransportError> {
        let url = format!("{}/sync", self.api_base);
        debug!(url = %url, changes = batch.len(), "POST sync");
        let response = self
            .authorized(self.client.post(&url))
            .json(batch)
            .send()
            .await
            .map_err(network_error)?;
        check_status(response).await?;
        Ok(())
    }

    async fn pull(&self, since: i64) -> std::result::Result<PullPayload, TransportError> {
        let url = format!("{}/sync", self.api_base);
        debug!(url = %url, since, "GET sync");
        let response = self
            .authorized(self.client.get(&url))
            .query(&[("since", since)])
            .send()
            .await
            .map_err(network_error)?;
        let response = check_status(response).await?;
        response
            .json::<PullPayload>()
            .await
            .map_err(|e| TransportError::decode(format!("Malformed sync payload: {}", e)))
    }
}
