use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Path prefix the gateway proxies.
pub const API_PREFIX: &str = "/api";

/// Budget used when no (or a zero) timeout is given.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Normalized outcome of a call. Never an `Err`: failures are described by
/// `status` and `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn failure(status: u16, error: &str) -> Self {
        Self {
            ok: false,
            status,
            data: None,
            error: Some(error.to_string()),
        }
    }
}

/// Request payload.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// Serialized as JSON unless the caller set a non-JSON content type,
    /// in which case a string value is sent as-is.
    Json(Value),
    /// Sent verbatim; content type is left to the caller.
    Binary(Vec<u8>),
}

/// Options for a single call.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub query: Vec<(String, Option<String>)>,
    pub body: Option<RequestBody>,
    pub timeout: Option<Duration>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
            timeout: None,
        }
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Add a header. Pairs that are not valid HTTP headers are ignored.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), Some(value.to_string())));
        self
    }

    /// Add a query parameter that is skipped when `value` is `None`.
    pub fn query_opt<V: ToString>(mut self, key: &str, value: Option<V>) -> Self {
        self.query.push((key.to_string(), value.map(|v| v.to_string())));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn binary(mut self, body: Vec<u8>) -> Self {
        self.body = Some(RequestBody::Binary(body));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn effective_timeout(&self) -> Duration {
        self.timeout
            .filter(|t| !t.is_zero())
            .unwrap_or(DEFAULT_TIMEOUT)
    }
}

/// Methods the client will send.
pub fn is_allowed_method(method: &Method) -> bool {
    [Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE].contains(method)
}

/// Encode query pairs as `?k=v&...`, skipping absent values.
///
/// Returns an empty string when nothing remains.
pub fn build_query(query: &[(String, Option<String>)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (key, value) in query {
        if let Some(value) = value {
            serializer.append_pair(key, value);
            any = true;
        }
    }
    if any {
        format!("?{}", serializer.finish())
    } else {
        String::new()
    }
}

/// Client for the gateway's API prefix.
pub struct ApiClient {
    client: Client,
    origin: String,
}

impl ApiClient {
    /// `origin` is the gateway's scheme and authority, e.g. `http://localhost:8788`.
    pub fn new(origin: &str) -> Self {
        Self {
            client: Client::new(),
            origin: origin.trim_end_matches('/').to_string(),
        }
    }

    /// URL the call for `path` goes to.
    pub fn url_for(&self, path: &str, query: &[(String, Option<String>)]) -> String {
        format!("{}{}{}{}", self.origin, API_PREFIX, path, build_query(query))
    }

    /// Issue one call through the gateway.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> ApiResponse<T> {
        if !path.starts_with('/') {
            return ApiResponse::failure(400, "Invalid path");
        }
        if !is_allowed_method(&options.method) {
            return ApiResponse::failure(405, "Unsupported method");
        }

        let timeout = options.effective_timeout();
        let url = self.url_for(path, &options.query);
        let mut headers = options.headers;

        let mut request = self.client.request(options.method.clone(), url);
        if options.method != Method::GET {
            if let Some(body) = options.body {
                request = match body {
                    RequestBody::Binary(bytes) => request.body(bytes),
                    RequestBody::Json(value) => {
                        let content_type = headers
                            .entry(CONTENT_TYPE)
                            .or_insert(HeaderValue::from_static(JSON_CONTENT_TYPE))
                            .to_str()
                            .unwrap_or_default()
                            .to_string();
                        request.body(encode_json_body(&content_type, value))
                    }
                };
            }
        }
        let request = request.headers(headers);

        let response = match tokio::time::timeout(timeout, request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) if e.is_timeout() => return ApiResponse::failure(408, "Request timeout"),
            Ok(Err(_)) => return ApiResponse::failure(500, "Network error"),
            Err(_) => return ApiResponse::failure(408, "Request timeout"),
        };

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));

        let data = if is_json {
            match response.json::<T>().await {
                Ok(data) => data,
                Err(_) => return ApiResponse::failure(500, "Network error"),
            }
        } else {
            let text = match response.text().await {
                Ok(text) => text,
                Err(_) => return ApiResponse::failure(500, "Network error"),
            };
            match serde_json::from_value::<T>(Value::String(text)) {
                Ok(data) => data,
                Err(_) => {
                    return ApiResponse {
                        ok: status.is_success(),
                        status: status.as_u16(),
                        data: None,
                        error: Some("Invalid response body".to_string()),
                    }
                }
            }
        };

        ApiResponse {
            ok: status.is_success(),
            status: status.as_u16(),
            data: Some(data),
            error: None,
        }
    }
}

fn encode_json_body(content_type: &str, value: Value) -> String {
    if content_type.contains("application/json") {
        return value.to_string();
    }
    match value {
        Value::String(raw) => raw,
        other => other.to_string(),
    }
}
