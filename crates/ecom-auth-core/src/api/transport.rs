//! HTTP transport for the E-Com Plus store API.
//!
//! `HttpTransport` turns an `ApiRequest` into a `reqwest` call, maps
//! non-success statuses through `ApiError::from_status` and parses the body
//! as JSON. There is no retry policy; failures go straight back to the caller.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::{header, Client, Method};
use serde_json::Value;
use tracing::debug;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL for the store API
pub const API_BASE_URL: &str = "https://api.e-com.plus/v1";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const STORE_ID_HEADER: &str = "x-store-id";
const MY_ID_HEADER: &str = "x-my-id";
const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// Anything that can carry an `ApiRequest` to the remote API.
///
/// Implementations resolve with the parsed JSON body, or fail with an
/// `ApiError` that callers receive verbatim.
pub trait Transport: Send + Sync {
    fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<Value, ApiError>>;
}

/// Authentication id and access token taken from a logged-in session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCredentials {
    pub my_id: String,
    pub access_token: String,
}

/// Per-call overrides of the transport configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// A single call against the store API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the base URL, e.g. `stores/me.json`
    pub path: String,
    pub data: Option<Value>,
    pub store_id: Option<u32>,
    pub credentials: Option<AccessCredentials>,
    pub options: RequestOptions,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            data: None,
            store_id: None,
            credentials: None,
            options: RequestOptions::default(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn with_data(mut self, data: Option<Value>) -> Self {
        self.data = data;
        self
    }

    pub fn with_store_id(mut self, store_id: u32) -> Self {
        self.store_id = Some(store_id);
        self
    }

    pub fn with_credentials(mut self, credentials: Option<AccessCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

/// `reqwest`-backed transport.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new() -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: API_BASE_URL.to_string(),
        })
    }

    /// Point the transport at a different API root (sandbox, proxy, ...)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url_for(&self, request: &ApiRequest) -> String {
        let base = request
            .options
            .base_url
            .as_deref()
            .unwrap_or(&self.base_url);
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            request.path.trim_start_matches('/')
        )
    }

    fn headers_for(request: &ApiRequest) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        if let Some(store_id) = request.store_id {
            headers.insert(STORE_ID_HEADER, header::HeaderValue::from(store_id));
        }
        if let Some(ref credentials) = request.credentials {
            headers.insert(MY_ID_HEADER, Self::header_value(&credentials.my_id)?);
            headers.insert(
                ACCESS_TOKEN_HEADER,
                Self::header_value(&credentials.access_token)?,
            );
        }
        for (name, value) in &request.options.headers {
            let name = header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::InvalidRequest(format!("header {}: {}", name, e)))?;
            headers.insert(name, Self::header_value(value)?);
        }
        Ok(headers)
    }

    fn header_value(value: &str) -> Result<header::HeaderValue, ApiError> {
        header::HeaderValue::from_str(value)
            .map_err(|e| ApiError::InvalidRequest(format!("header value: {}", e)))
    }

    /// Build the `reqwest` request without sending it
    pub(crate) fn build_request(&self, request: &ApiRequest) -> Result<reqwest::Request, ApiError> {
        let mut builder = self
            .client
            .request(request.method.clone(), self.url_for(request))
            .headers(Self::headers_for(request)?);

        if !request.options.query.is_empty() {
            builder = builder.query(&request.options.query);
        }
        if let Some(timeout) = request.options.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(ref data) = request.data {
            builder = builder.json(data);
        }

        Ok(builder.build()?)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    pub(crate) fn parse_body(text: &str) -> Result<Value, ApiError> {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON body: {}", e)))
    }

    async fn execute(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let http_request = self.build_request(&request)?;
        debug!(method = %request.method, url = %http_request.url(), "Sending API request");

        let response = self.client.execute(http_request).await?;
        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        Self::parse_body(&text)
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<Value, ApiError>> {
        Box::pin(self.execute(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transport() -> HttpTransport {
        HttpTransport::new().expect("Failed to build HTTP client")
    }

    #[test]
    fn test_url_joins_base_and_path() {
        let t = transport();
        let req = t.build_request(&ApiRequest::get("/stores/me.json")).unwrap();
        assert_eq!(req.url().as_str(), "https://api.e-com.plus/v1/stores/me.json");

        let t = transport().with_base_url("https://sandbox.e-com.plus/v1/");
        let req = t.build_request(&ApiRequest::get("products.json")).unwrap();
        assert_eq!(req.url().as_str(), "https://sandbox.e-com.plus/v1/products.json");
    }

    #[test]
    fn test_auth_headers_are_attached() {
        let request = ApiRequest::get("orders.json")
            .with_store_id(1011)
            .with_credentials(Some(AccessCredentials {
                my_id: "5d7a".into(),
                access_token: "tok".into(),
            }));
        let req = transport().build_request(&request).unwrap();

        assert_eq!(req.headers().get("x-store-id").unwrap(), "1011");
        assert_eq!(req.headers().get("x-my-id").unwrap(), "5d7a");
        assert_eq!(req.headers().get("x-access-token").unwrap(), "tok");
    }

    #[test]
    fn test_anonymous_request_has_no_credentials() {
        let req = transport()
            .build_request(&ApiRequest::get("stores/me.json").with_store_id(1011))
            .unwrap();
        assert!(req.headers().get("x-my-id").is_none());
        assert!(req.headers().get("x-access-token").is_none());
    }

    #[test]
    fn test_options_override_transport_config() {
        let options = RequestOptions::default()
            .base_url("http://localhost:3000")
            .header("X-Debug", "1")
            .query("limit", "5")
            .timeout(Duration::from_secs(2));
        let request = ApiRequest::new(Method::PATCH, "products/1.json")
            .with_data(Some(json!({"price": 10})))
            .with_options(options);
        let req = transport().build_request(&request).unwrap();

        assert_eq!(req.method(), &Method::PATCH);
        assert_eq!(req.url().as_str(), "http://localhost:3000/products/1.json?limit=5");
        assert_eq!(req.headers().get("x-debug").unwrap(), "1");
        assert_eq!(req.timeout(), Some(&Duration::from_secs(2)));
        let body = req.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(serde_json::from_slice::<Value>(body).unwrap(), json!({"price": 10}));
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let request = ApiRequest::get("x.json")
            .with_options(RequestOptions::default().header("bad header", "v"));
        assert!(matches!(
            transport().build_request(&request),
            Err(ApiError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(HttpTransport::parse_body("").unwrap(), Value::Null);
        assert_eq!(HttpTransport::parse_body("  \n").unwrap(), Value::Null);
        assert_eq!(HttpTransport::parse_body(r#"{"a":1}"#).unwrap(), json!({"a": 1}));
        assert!(matches!(
            HttpTransport::parse_body("<html>"),
            Err(ApiError::InvalidResponse(_))
        ));
    }
}
