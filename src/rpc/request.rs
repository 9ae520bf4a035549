//! Inbound request as seen by the dispatcher and codecs.

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, Uri, header};

/// The HTTP request metadata passed to every invoked method.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

/// A fully buffered HTTP request.
#[derive(Debug, Clone)]
pub struct RpcRequest {
    pub context: RequestContext,
    pub body: Bytes,
    path_method: Option<String>,
}

impl RpcRequest {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            context: RequestContext {
                method,
                uri,
                headers,
            },
            body: body.into(),
            path_method: None,
        }
    }

    /// Use an already decoded method segment instead of the raw final path segment.
    pub fn with_path_method(mut self, segment: impl Into<String>) -> Self {
        self.path_method = Some(segment.into());
        self
    }

    /// Raw `Content-Type` header, if present and valid UTF-8.
    pub fn content_type(&self) -> Option<&str> {
        self.context
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Final segment of the URL path, used as the method name in path-addressed mode.
    ///
    /// Without a decoded segment from the router the raw segment is returned as is.
    pub fn path_method(&self) -> &str {
        if let Some(segment) = &self.path_method {
            return segment;
        }
        let path = self.context.uri.path();
        match path.rfind('/') {
            Some(idx) => &path[idx + 1..],
            None => path,
        }
    }
}
