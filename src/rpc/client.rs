//! RPC client for calling a running server over HTTP.
//!
//! Sends JSON-RPC 2.0 envelopes either to the body-addressed endpoint or, with the
//! method name in the URL, to the path-addressed endpoint.

use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::protocol::{Request, Response, RpcError};

/// RPC client for communicating with the server.
pub struct RpcClient {
    http: reqwest::Client,
    body_url: String,
    path_url: String,
    next_id: AtomicU64,
}

/// Error returned by RPC client operations.
#[derive(Debug)]
pub enum ClientError {
    /// Failed to send the request or read the response
    Http(reqwest::Error),
    /// Server rejected the request before a codec was selected
    Status(StatusCode, String),
    /// Failed to serialize request
    Serialize(serde_json::Error),
    /// Failed to parse response
    Parse(serde_json::Error),
    /// Server returned an error
    Rpc(RpcError),
    /// Response carried neither result nor error
    MissingResult,
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Http(e) => write!(f, "HTTP error: {}", e),
            ClientError::Status(status, body) => write!(f, "Server returned {}: {}", status, body),
            ClientError::Serialize(e) => write!(f, "Failed to serialize request: {}", e),
            ClientError::Parse(e) => write!(f, "Failed to parse response: {}", e),
            ClientError::Rpc(e) => write!(f, "RPC error {}: {}", e.code, e.message),
            ClientError::MissingResult => write!(f, "Response has no result"),
        }
    }
}

impl std::error::Error for ClientError {}

impl RpcClient {
    /// Create a client for a server rooted at `base_url` (e.g. "http://127.0.0.1:8080/jsonrpc").
    ///
    /// Body-addressed calls go to `<base>/v2`, path-addressed calls to `<base>/v1/<method>`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base = base_url.into();
        let base = base.trim_end_matches('/');
        Self {
            http: reqwest::Client::new(),
            body_url: format!("{}/v2", base),
            path_url: format!("{}/v1", base),
            next_id: AtomicU64::new(1),
        }
    }

    /// Call `method` ("Service.Method") with the name carried in the request body.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<T, ClientError> {
        self.send(&self.body_url, method, params).await
    }

    /// Call `method` with its name as the last URL path segment.
    pub async fn call_path<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<T, ClientError> {
        let url = format!("{}/{}", self.path_url, method);
        self.send(&url, method, params).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        url: &str,
        method: &str,
        params: Option<Value>,
    ) -> Result<T, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = Request::new(method, params, Value::from(id));
        let body = serde_json::to_vec(&request).map_err(ClientError::Serialize)?;

        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(ClientError::Http)?;

        let status = response.status();
        let plain_text = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/plain"));
        let bytes = response.bytes().await.map_err(ClientError::Http)?;

        if plain_text {
            return Err(ClientError::Status(
                status,
                String::from_utf8_lossy(&bytes).into_owned(),
            ));
        }

        let response: Response = serde_json::from_slice(&bytes).map_err(ClientError::Parse)?;

        if let Some(error) = response.error {
            return Err(ClientError::Rpc(error));
        }

        let result = response.result.ok_or(ClientError::MissingResult)?;
        serde_json::from_value(result).map_err(ClientError::Parse)
    }
}
