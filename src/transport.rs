use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, header};
use serde_json::Value;
use uuid::Uuid;

use crate::{config::ClientConfig, error::ClientError};

/// Header used to correlate a client call with the server's logs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// ApiRequest
///
/// One outbound call as the gateway sees it. `path` is relative to the API
/// base URL (`/auth/login`, `/profile/password`, ...).
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    /// Access token to send as `Authorization: Bearer <token>`.
    pub bearer: Option<String>,
    /// Set once the call has been replayed after a refresh; a second 401 is final.
    pub retried: bool,
    pub request_id: Uuid,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            bearer: None,
            retried: false,
            request_id: Uuid::new_v4(),
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }
}

/// ApiResponse
///
/// Status plus the decoded JSON body (`Value::Null` for an empty body).
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

// 1. HttpTransport Contract
/// HttpTransport
///
/// The network seam under the gateway. Any HTTP status is a successful
/// `send`; only a call that produced no response at all is an `Err`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// # Errors
    /// `ClientError::Network` when no response was received, or
    /// `ClientError::Decode` when a 2xx body is not JSON.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError>;
}

/// TransportState
///
/// The shared handle the gateway and the refresh coordinator use.
pub type TransportState = Arc<dyn HttpTransport>;

// 2. The Real Implementation (reqwest)
/// ReqwestTransport
///
/// Sends requests to the configured API base URL with JSON bodies, the
/// configured timeout, bearer credentials and a per-call request id.
#[derive(Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// # Errors
    /// Returns `ClientError::Config` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let url = self.url_for(&request.path);

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .header(REQUEST_ID_HEADER, request.request_id.to_string());

        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            match serde_json::from_slice(&bytes) {
                Ok(value) => value,
                Err(err) if (200..300).contains(&status) => {
                    return Err(ClientError::Decode(err.to_string()));
                }
                // Error pages (proxies, HTML 502s) carry no usable message.
                Err(_) => Value::Null,
            }
        };

        Ok(ApiResponse { status, body })
    }
}
