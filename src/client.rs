//! Authenticated request dispatcher for the IFS projection service.
//!
//! Every tool funnels through [`IfsClient::request`]: resolve the connection,
//! attach a bearer token, send, and on a 401/403 clear the token cache and
//! send once more with a fresh token.

use std::sync::{Arc, OnceLock};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, IF_MATCH};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::auth::TokenCache;
use crate::config::ConnectionConfig;
use crate::error::ApiError;
use crate::gateway::{HttpGateway, RequestDescriptor};
use crate::odata::{ODataCollection, ODataQuery};

/// Progress of one logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    AuthRetry,
}

/// IFS Cloud client shared by all tool adapters.
#[derive(Clone)]
pub struct IfsClient {
    gateway: HttpGateway,
    tokens: TokenCache,
    connection: Arc<OnceLock<ConnectionConfig>>,
}

impl IfsClient {
    /// Create an unconfigured client.
    ///
    /// # Errors
    /// Returns `ApiError::HttpClientInit` if the HTTP client cannot be created.
    pub fn new() -> Result<Self, ApiError> {
        let http_client = HttpGateway::build_client()?;
        Ok(Self {
            gateway: HttpGateway::new(http_client.clone()),
            tokens: TokenCache::new(http_client),
            connection: Arc::new(OnceLock::new()),
        })
    }

    /// Create a client and configure it in one step.
    pub fn connect(connection: ConnectionConfig) -> Result<Self, ApiError> {
        let client = Self::new()?;
        client.configure(connection)?;
        Ok(client)
    }

    /// Set the connection. Succeeds once; the connection is never rotated.
    pub fn configure(&self, connection: ConnectionConfig) -> Result<(), ApiError> {
        tracing::debug!(base_url = %connection.base_url, "Configuring IFS connection");
        self.connection
            .set(connection)
            .map_err(|_| ApiError::AlreadyConfigured)
    }

    /// The active connection.
    pub fn connection(&self) -> Result<&ConnectionConfig, ApiError> {
        self.connection.get().ok_or(ApiError::NotConfigured)
    }

    /// Send one logical request, re-authenticating at most once.
    pub async fn request(&self, request: RequestDescriptor) -> Result<Value, ApiError> {
        let connection = self.connection()?;
        let mut attempt = Attempt::First;

        loop {
            let token = self.tokens.get_token(connection).await?;
            let headers = merge_headers(&token, &request.extra_headers)?;

            match self
                .gateway
                .send(&connection.base_url, &request, headers, connection.timeout)
                .await
            {
                Err(e)
                    if e.is_auth_rejection()
                        && request.retry_auth
                        && attempt == Attempt::First =>
                {
                    tracing::warn!(
                        method = %request.method,
                        path = %request.path,
                        status = ?e.status(),
                        "IFS rejected token, re-authenticating"
                    );
                    self.tokens.clear().await;
                    attempt = Attempt::AuthRetry;
                }
                Ok(response) => {
                    tracing::debug!(
                        method = %request.method,
                        path = %request.path,
                        status = %response.status,
                        "IFS request succeeded"
                    );
                    return Ok(response.body);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// GET an endpoint with an optional query.
    pub async fn get(&self, endpoint: &str, query: Option<&ODataQuery>) -> Result<Value, ApiError> {
        let path = format!(
            "{}{}",
            endpoint,
            query.map(|q| q.to_query_string()).unwrap_or_default()
        );
        self.request(RequestDescriptor::new(Method::GET, path)).await
    }

    /// GET a collection and unwrap the OData envelope.
    pub async fn fetch_collection<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &ODataQuery,
    ) -> Result<ODataCollection<T>, ApiError> {
        let body = self.get(endpoint, Some(query)).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// POST create entity.
    pub async fn create_record<B: Serialize>(&self, endpoint: &str, body: &B) -> Result<Value, ApiError> {
        let request = RequestDescriptor::new(Method::POST, endpoint).body(serde_json::to_value(body)?);
        self.request(request).await
    }

    /// PATCH an entity, guarded by `If-Match` when a concurrency token is given.
    #[allow(dead_code)]
    pub async fn update_record<B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
        etag: Option<&str>,
    ) -> Result<Value, ApiError> {
        let request = RequestDescriptor::new(Method::PATCH, endpoint)
            .body(serde_json::to_value(body)?)
            .headers(if_match(etag)?);
        self.request(request).await
    }

    /// POST a bound action (e.g. a state transition) with an empty body.
    pub async fn invoke_action(&self, endpoint: &str, etag: Option<&str>) -> Result<Value, ApiError> {
        let request = RequestDescriptor::new(Method::POST, endpoint)
            .body(json!({}))
            .headers(if_match(etag)?);
        self.request(request).await
    }
}

impl std::fmt::Debug for IfsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IfsClient")
            .field("base_url", &self.connection.get().map(|c| c.base_url.as_str()))
            .finish_non_exhaustive()
    }
}

/// Default JSON headers plus bearer token; caller headers win on collision.
fn merge_headers(token: &str, extra: &HeaderMap) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| ApiError::InvalidHeader(format!("bearer token: {}", e)))?;
    headers.insert(AUTHORIZATION, bearer);

    let mut last: Option<HeaderName> = None;
    for (name, value) in extra.iter() {
        // `iter` yields `name` once per value; replace on first sight, append the rest.
        if last.as_ref() != Some(name) {
            headers.insert(name.clone(), value.clone());
            last = Some(name.clone());
        } else {
            headers.append(name.clone(), value.clone());
        }
    }
    Ok(headers)
}

fn if_match(etag: Option<&str>) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    if let Some(etag) = etag {
        let value = HeaderValue::from_str(etag)
            .map_err(|e| ApiError::InvalidHeader(format!("concurrency token: {}", e)))?;
        headers.insert(IF_MATCH, value);
    }
    Ok(headers)
}
