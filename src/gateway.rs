//! Single HTTP exchange against the IFS projection service.

use std::time::Duration;

use reqwest::header::{HeaderMap, CONTENT_TYPE, ETAG};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::odata::ETAG_FIELD;

/// Error bodies are cut to this many characters.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// One outgoing request, built fresh per call.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Path relative to the base URL, including any query string.
    pub path: String,
    pub body: Option<Value>,
    pub extra_headers: HeaderMap,
    pub retry_auth: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            extra_headers: HeaderMap::new(),
            retry_auth: true,
        }
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.extra_headers = headers;
        self
    }
}

/// Successful response. The `etag` header, if any, is already in `body`.
#[derive(Debug)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Sends one request with a wall-clock timeout and decodes the reply.
#[derive(Clone)]
pub struct HttpGateway {
    http_client: Client,
}

impl HttpGateway {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }

    /// Build an HTTP client for the gateway and token cache to share.
    pub fn build_client() -> Result<Client, ApiError> {
        Client::builder()
            .user_agent(concat!("ifs-cloud-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::HttpClientInit(e.to_string()))
    }

    /// Send `request` to `base_url` with the given headers.
    ///
    /// The future is dropped if `timeout` elapses first, which tears down the
    /// connection; no partial result is returned. Non-2xx statuses come back
    /// as `ApiError::Http`, including 401/403, which the dispatcher inspects.
    pub async fn send(
        &self,
        base_url: &str,
        request: &RequestDescriptor,
        headers: HeaderMap,
        timeout: Duration,
    ) -> Result<GatewayResponse, ApiError> {
        let url = format!("{}{}", base_url, request.path);
        tracing::debug!(method = %request.method, url = %url, "IFS request");

        let exchange = self.exchange(&url, request, headers);
        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(method = %request.method, path = %request.path, "IFS request timed out");
                Err(ApiError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    async fn exchange(
        &self,
        url: &str,
        request: &RequestDescriptor,
        headers: HeaderMap,
    ) -> Result<GatewayResponse, ApiError> {
        let mut builder = self
            .http_client
            .request(request.method.clone(), url)
            .headers(headers);
        if let Some(ref body) = request.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(%status, path = %request.path, "IFS error response");
            return Err(ApiError::Http {
                method: request.method.clone(),
                endpoint: request.path.clone(),
                status,
                body: truncate_chars(&body, MAX_ERROR_BODY_CHARS),
            });
        }

        let text = response.text().await?;
        let body = decode_body(&headers, &text)?;
        Ok(GatewayResponse { status, body })
    }
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway").finish_non_exhaustive()
    }
}

/// Parse a 2xx body. Non-JSON content types and empty bodies decode to `{}`;
/// an `etag` header is copied into object bodies under [`ETAG_FIELD`].
fn decode_body(headers: &HeaderMap, text: &str) -> Result<Value, ApiError> {
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));

    if !is_json || text.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    let mut body: Value = serde_json::from_str(text)?;
    let etag = headers.get(ETAG).and_then(|v| v.to_str().ok());
    if let (Some(etag), Value::Object(map)) = (etag, &mut body) {
        map.insert(ETAG_FIELD.to_string(), Value::String(etag.to_string()));
    }
    Ok(body)
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn json_headers(etag: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json; odata.metadata=minimal"));
        if let Some(etag) = etag {
            headers.insert(ETAG, HeaderValue::from_str(etag).unwrap());
        }
        headers
    }

    #[test]
    fn test_etag_attached_to_object_body() {
        let body = decode_body(&json_headers(Some("W/123")), r#"{"WoNo":5}"#).unwrap();
        assert_eq!(body["WoNo"], 5);
        assert_eq!(body[ETAG_FIELD], "W/123");
    }

    #[test]
    fn test_etag_not_attached_to_array_body() {
        let body = decode_body(&json_headers(Some("W/123")), "[1,2]").unwrap();
        assert_eq!(body, json!([1, 2]));
    }

    #[test]
    fn test_non_json_content_type_is_empty_object() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert_eq!(decode_body(&headers, "done").unwrap(), json!({}));
        assert_eq!(decode_body(&HeaderMap::new(), "").unwrap(), json!({}));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let err = decode_body(&json_headers(None), "{not json").unwrap_err();
        assert!(matches!(err, ApiError::JsonParse(_)));
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate_chars("abc", 5), "abc");
        assert_eq!(truncate_chars("ääää", 2), "ää");
        assert_eq!(truncate_chars(&"x".repeat(600), 500).len(), 500);
    }

    #[tokio::test]
    async fn test_send_serializes_body_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Set"))
            .and(header("if-match", "W/\"7\""))
            .and(body_json(json!({"Description": "Check pump"})))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("etag", "W/\"8\"")
                    .set_body_json(json!({"TaskSeq": 12})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("If-Match", HeaderValue::from_static("W/\"7\""));

        let request = RequestDescriptor::new(Method::POST, "/Set")
            .body(json!({"Description": "Check pump"}));
        let gateway = HttpGateway::new(Client::new());
        let response = gateway
            .send(&server.uri(), &request, headers, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.body["TaskSeq"], 12);
        assert_eq!(response.body[ETAG_FIELD], "W/\"8\"");
    }

    #[tokio::test]
    async fn test_error_body_is_truncated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Set"))
            .respond_with(ResponseTemplate::new(500).set_body_string("e".repeat(2000)))
            .mount(&server)
            .await;

        let gateway = HttpGateway::new(Client::new());
        let request = RequestDescriptor::new(Method::GET, "/Set");
        let err = gateway
            .send(&server.uri(), &request, HeaderMap::new(), Duration::from_secs(5))
            .await
            .unwrap_err();

        match err {
            ApiError::Http {
                method,
                endpoint,
                status,
                body,
            } => {
                assert_eq!(method, Method::GET);
                assert_eq!(endpoint, "/Set");
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body.chars().count(), 500);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_names_configured_duration() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"value": []}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let gateway = HttpGateway::new(Client::new());
        let request = RequestDescriptor::new(Method::GET, "/slow");
        let err = gateway
            .send(&server.uri(), &request, HeaderMap::new(), Duration::from_millis(100))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Timeout { timeout_ms: 100 }));
        assert!(err.to_string().contains("100ms"));
    }
}
