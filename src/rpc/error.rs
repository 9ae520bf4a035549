//! Error types for registration and request dispatch.

use axum::http::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;

/// Raised when a receiver exposes nothing callable.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("rpc: {receiver} has no exported methods of suitable type")]
    NoEligibleMethods {
        /// Type name of the receiver that was inspected.
        receiver: &'static str,
    },
}

/// Returned by registry lookups for a name that was never registered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("rpc: can't find method \"{0}\"")]
pub struct NotFoundError(pub String);

/// Failure reported by an invoked method. The message is sent to the client verbatim.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ServiceError {
    pub message: String,
    /// Wire-level error code, for codecs that carry one.
    pub code: Option<i32>,
    pub data: Option<Value>,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            data: None,
        }
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Errors raised by a codec while reading the request envelope.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The body is not well-formed in the codec's wire format.
    #[error("rpc: parse error: {0}")]
    Parse(String),
    /// The body parsed but does not form a valid request envelope.
    #[error("rpc: invalid request: {0}")]
    InvalidRequest(String),
    /// The wire format has nowhere to carry a method name.
    #[error("rpc: method name is not carried in the request body")]
    MethodUnavailable,
}

/// Everything that can end a single request early.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("rpc: POST method required, received {0}")]
    MethodNotAllowed(Method),
    #[error("rpc: unrecognized Content-Type: {0}")]
    UnsupportedMediaType(String),
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("rpc: invalid params: {0}")]
    Decode(#[source] serde_json::Error),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("rpc: failed to encode reply: {0}")]
    Encode(#[source] serde_json::Error),
}

impl DispatchError {
    /// Status used when the error is written as plain HTTP, or as the hint handed to a codec.
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            DispatchError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            DispatchError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DispatchError::NotFound(_)
            | DispatchError::Codec(_)
            | DispatchError::Decode(_)
            | DispatchError::Service(_) => StatusCode::BAD_REQUEST,
        }
    }
}
