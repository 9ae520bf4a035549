//! Wire-format codecs and content-type negotiation.
//!
//! A [`Codec`] is registered under a media type. For each request the dispatcher
//! selects one via [`CodecRegistry::select`] and asks it for a [`CodecRequest`], which
//! owns the parsed body and writes the response in the codec's wire format.

pub mod json2;
pub mod plain;

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

use super::error::{CodecError, DispatchError};
use super::request::RpcRequest;

pub use json2::JsonRpcCodec;
pub use plain::PlainJsonCodec;

/// Produces a [`CodecRequest`] per inbound request.
pub trait Codec: Send + Sync {
    fn new_request(&self, request: &RpcRequest) -> Box<dyn CodecRequest>;
}

/// A request body parsed by one codec.
///
/// Both writers consume the request: a response can be written once.
pub trait CodecRequest: Send {
    /// Envelope parse failure, if any.
    fn error(&self) -> Option<CodecError>;

    /// Method name carried in the envelope.
    fn method(&self) -> Result<String, CodecError>;

    /// Raw arguments, to be decoded into the method's argument type.
    fn read_request(&mut self) -> Result<Value, CodecError>;

    fn write_response(self: Box<Self>, reply: Value) -> Response;

    /// Write `err`. `status` is a hint; the wire format may mandate its own status.
    fn write_error(self: Box<Self>, status: StatusCode, err: &DispatchError) -> Response;
}

/// Codecs keyed by lower-cased media type.
#[derive(Default, Clone)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn Codec>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `codec` for `content_type`, replacing any previous registration.
    pub fn register(&mut self, codec: Arc<dyn Codec>, content_type: &str) {
        self.codecs.insert(content_type.to_lowercase(), codec);
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    /// Pick the codec for a `Content-Type` header value.
    ///
    /// Parameters such as `charset` are ignored and the media type is matched
    /// case-insensitively. A missing or empty type selects the only registered codec,
    /// and fails when there are several.
    pub fn select(&self, content_type: Option<&str>) -> Result<Arc<dyn Codec>, DispatchError> {
        let raw = content_type.unwrap_or("");
        let media_type = raw.split(';').next().unwrap_or("").trim();

        if media_type.is_empty() && self.codecs.len() == 1 {
            if let Some(codec) = self.codecs.values().next() {
                return Ok(Arc::clone(codec));
            }
        }

        self.codecs
            .get(&media_type.to_lowercase())
            .cloned()
            .ok_or_else(|| DispatchError::UnsupportedMediaType(media_type.to_string()))
    }
}

/// Serialize `body` as a JSON response with the given status.
pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => (
            status,
            [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response body");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
