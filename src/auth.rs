//! OAuth2 client credentials authentication for IFS Cloud.

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::config::{ConnectionConfig, OAuth2Credentials};
use crate::error::AuthError;

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// OAuth2 token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default, deserialize_with = "whole_seconds")]
    expires_in: Option<i64>,
}

/// Accept any JSON number for `expires_in`, truncated to whole seconds.
fn whole_seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.map(|secs| secs.trunc() as i64))
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Cached token with expiration tracking.
#[derive(Clone)]
pub struct AccessToken {
    pub value: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn from_response(response: TokenResponse, issued_at: DateTime<Utc>) -> Self {
        let expires_in = response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        // Lifetimes past chrono's range never expire in practice.
        let expires_at = Duration::try_seconds(expires_in)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            value: response.access_token,
            token_type: response.token_type,
            expires_at,
        }
    }

    /// Check if token is expired (with buffer).
    fn is_expired(&self, buffer: Duration) -> bool {
        Utc::now() + buffer >= self.expires_at
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Process-local cache of one client-credentials token.
///
/// Refreshes are single-flight: callers that find the cache stale queue on
/// `refresh_lock` and re-check the cache once they hold it, so a burst of
/// requests against an expired token produces one token request.
#[derive(Clone)]
pub struct TokenCache {
    http_client: Client,
    token_cache: Arc<RwLock<Option<AccessToken>>>,
    refresh_lock: Arc<Mutex<()>>,
}

impl TokenCache {
    pub fn new(http_client: Client) -> Self {
        Self {
            http_client,
            token_cache: Arc::new(RwLock::new(None)),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Get a valid access token, refreshing if necessary.
    pub async fn get_token(&self, connection: &ConnectionConfig) -> Result<String, AuthError> {
        if let Some(token) = self.cached(connection.token_buffer).await {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(token) = self.cached(connection.token_buffer).await {
            return Ok(token);
        }

        let fetch = self.fetch_token(&connection.credentials);
        let token = tokio::time::timeout(connection.timeout, fetch)
            .await
            .map_err(|_| AuthError::Timeout {
                timeout_ms: connection.timeout_ms(),
            })??;

        let value = token.value.clone();
        *self.token_cache.write().await = Some(token);
        Ok(value)
    }

    /// Discard the cached token; the next `get_token` always hits the endpoint.
    pub async fn clear(&self) {
        let mut cache = self.token_cache.write().await;
        if cache.take().is_some() {
            tracing::debug!("Cleared cached access token");
        }
    }

    async fn cached(&self, buffer: Duration) -> Option<String> {
        let cache = self.token_cache.read().await;
        cache
            .as_ref()
            .filter(|t| !t.is_expired(buffer))
            .map(|t| t.value.clone())
    }

    /// Fetch a new token from the OAuth2 token endpoint.
    async fn fetch_token(&self, credentials: &OAuth2Credentials) -> Result<AccessToken, AuthError> {
        tracing::debug!(token_url = %credentials.token_url, "Fetching OAuth2 token");

        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ];
        if let Some(ref scope) = credentials.scope {
            form.push(("scope", scope.as_str()));
        }

        let issued_at = Utc::now();
        let response = self
            .http_client
            .post(&credentials.token_url)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "OAuth2 token request rejected");
            return Err(AuthError::TokenRequestFailed { status, body });
        }

        let token_response: TokenResponse = response.json().await.map_err(|e| {
            AuthError::TokenParse(format!("Failed to parse token response: {}", e))
        })?;

        if token_response.access_token.is_empty() {
            return Err(AuthError::TokenParse(
                "Token endpoint returned an empty access_token".to_string(),
            ));
        }

        let token = AccessToken::from_response(token_response, issued_at);
        tracing::debug!(
            expires_at = %token.expires_at.format("%Y-%m-%d %H:%M:%S UTC"),
            "Token acquired"
        );
        Ok(token)
    }

    #[cfg(test)]
    async fn snapshot(&self) -> Option<AccessToken> {
        self.token_cache.read().await.clone()
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache").finish_non_exhaustive()
    }
}
