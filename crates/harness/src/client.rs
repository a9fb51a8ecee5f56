//! HTTP client for the service under test.
//!
//! [`HttpClient`] wraps a `reqwest` client bound to a base URL. It never
//! turns HTTP status codes into errors: every response, 2xx or not, comes back
//! as an [`HttpResponse`] tagged with a [`StatusOutcome`] computed against the
//! request's tolerated set. Only transport failures produce a [`ClientError`].

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::HarnessConfig;
use crate::error::ClientError;
use crate::path;
use crate::report::ResponseSnapshot;
use crate::status::{StatusOutcome, StatusSet};
use crate::types::Credential;

/// HTTP methods used by scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// HEAD
    Head,
}

impl HttpMethod {
    /// Returns the method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete request, with every template already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// The HTTP method.
    pub method: HttpMethod,
    /// Path relative to the base URL; may carry an inline query string.
    pub path: String,
    /// Additional query pairs, repeated keys allowed.
    pub query: Vec<(String, String)>,
    /// Request headers.
    pub headers: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<Value>,
    /// Statuses this request tolerates.
    pub tolerated: StatusSet,
}

impl HttpRequest {
    /// Creates a request with no query, headers or body.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            tolerated: StatusSet::success(),
        }
    }

    /// Shorthand for a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// Shorthand for a POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// Shorthand for a PUT request.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    /// Shorthand for a DELETE request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Appends a query pair.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Appends a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds an `Authorization: Bearer` header.
    pub fn bearer(self, credential: &Credential) -> Self {
        self.header("Authorization", credential.bearer())
    }

    /// Sets the JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the tolerated statuses.
    pub fn tolerate(mut self, statuses: StatusSet) -> Self {
        self.tolerated = statuses;
        self
    }
}

/// A response from the service under test.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// The method of the request that produced this response.
    pub method: HttpMethod,
    /// The absolute request URL.
    pub url: String,
    /// The HTTP status code.
    pub status: u16,
    /// Response headers keyed by lowercase name; repeated headers are joined with `, `.
    pub headers: BTreeMap<String, String>,
    /// Parsed JSON body; non-JSON bodies are a string, empty bodies are `null`.
    pub body: Value,
    /// Status classified against the request's tolerated set.
    pub outcome: StatusOutcome,
    /// Time from send to fully-read body.
    pub elapsed: Duration,
}

impl HttpResponse {
    /// Looks up a header case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Looks up a value in the body by path.
    pub fn property(&self, property: &str) -> Option<&Value> {
        path::get(&self.body, property)
    }

    /// Captures this response for failure reports.
    pub fn snapshot(&self) -> ResponseSnapshot {
        ResponseSnapshot {
            method: self.method,
            url: self.url.clone(),
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

/// HTTP client bound to the base URL of the service under test.
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: Url,
    inner: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    /// Creates a client for the given base URL and request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url).map_err(|source| ClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;

        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("apiflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            base_url: parsed,
            inner,
            timeout,
        })
    }

    /// Creates a client from harness configuration.
    pub fn from_config(config: &HarnessConfig) -> Result<Self, ClientError> {
        Self::new(&config.base_url, config.timeout())
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the absolute URL for a path and extra query pairs.
    ///
    /// The path is appended to the base URL's path, so a base of
    /// `http://host/api` and a path of `/posts` yield `http://host/api/posts`.
    pub fn url_for(&self, path: &str, query: &[(String, String)]) -> Result<Url, ClientError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let joined = if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        };

        let mut url = Url::parse(&joined).map_err(|source| ClientError::InvalidPath {
            path: path.to_string(),
            source,
        })?;

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Sends a request and returns the response whatever its status.
    ///
    /// # Errors
    ///
    /// * `ClientError::InvalidPath` / `InvalidHeader` - the request is malformed
    /// * `ClientError::Timeout` - no response within the configured timeout
    /// * `ClientError::Transport` - connection or body transfer failed
    pub async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ClientError> {
        let url = self.url_for(&request.path, &request.query)?;
        let mut builder = self.inner.request(request.method.to_reqwest(), url.clone());

        for (name, value) in &request.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| ClientError::InvalidHeader {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| ClientError::InvalidHeader {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
            builder = builder.header(header_name, header_value);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let started = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|source| transport_error(request.method, &url, source))?;

        let status = response.status().as_u16();
        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in response.headers() {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| transport_error(request.method, &url, source))?;
        let elapsed = started.elapsed();
        let outcome = request.tolerated.evaluate(status);

        debug!(
            method = %request.method,
            url = %url,
            status,
            accepted = outcome.is_accepted(),
            elapsed_ms = elapsed.as_millis() as u64,
            "HTTP exchange"
        );

        Ok(HttpResponse {
            method: request.method,
            url: url.to_string(),
            status,
            headers,
            body: decode_body(&bytes),
            outcome,
            elapsed,
        })
    }
}

fn transport_error(method: HttpMethod, url: &Url, source: reqwest::Error) -> ClientError {
    if source.is_timeout() {
        ClientError::Timeout {
            method: method.to_string(),
            url: url.to_string(),
        }
    } else {
        ClientError::Transport {
            method: method.to_string(),
            url: url.to_string(),
            source,
        }
    }
}

/// Decodes a response body: JSON when it parses, a string otherwise.
fn decode_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base: &str) -> HttpClient {
        HttpClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_url_for_plain_path() {
        let url = client("http://localhost:3000").url_for("/posts", &[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/posts");
    }

    #[test]
    fn test_url_for_keeps_base_path() {
        let url = client("http://localhost:3000/api/").url_for("/posts/7", &[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/posts/7");
    }

    #[test]
    fn test_url_for_repeated_query_keys() {
        let query = vec![
            ("id".to_string(), "55".to_string()),
            ("id".to_string(), "60".to_string()),
        ];
        let url = client("http://localhost:3000").url_for("posts", &query).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/posts?id=55&id=60");
    }

    #[test]
    fn test_url_for_inline_query() {
        let url = client("http://localhost:3000")
            .url_for("/posts?limit=10", &[])
            .unwrap();
        assert_eq!(url.query(), Some("limit=10"));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpClient::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ClientError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(b""), Value::Null);
        assert_eq!(decode_body(b"  \n"), Value::Null);
        assert_eq!(decode_body(br#"{"a":1}"#), json!({"a": 1}));
        assert_eq!(decode_body(b"Unauthorized"), json!("Unauthorized"));
    }

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::post("/664/posts")
            .bearer(&Credential::new("abc"))
            .json(json!({"title": "t"}))
            .tolerate(StatusSet::exactly(201));
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(
            request.headers,
            vec![("Authorization".to_string(), "Bearer abc".to_string())]
        );
        assert!(request.tolerated.accepts(201));
        assert!(!request.tolerated.accepts(200));
    }

    #[test]
    fn test_method_serde() {
        assert_eq!(serde_json::to_string(&HttpMethod::Delete).unwrap(), "\"DELETE\"");
        let method: HttpMethod = serde_json::from_str("\"PUT\"").unwrap();
        assert_eq!(method, HttpMethod::Put);
    }
}
