//! Request dispatch.
//!
//! A [`Dispatcher`] takes one buffered HTTP request through codec negotiation,
//! method resolution, argument decoding and invocation, and produces exactly one
//! response. It is immutable once built and is shared across requests as
//! `Arc<Dispatcher>`.

use std::sync::Arc;

use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use super::codec::{Codec, CodecRegistry};
use super::error::{DispatchError, NotFoundError};
use super::registry::{MethodSpec, ServiceRegistry};
use super::request::RpcRequest;

/// Where the target method name comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    /// Last URL path segment, resolved before the body is read.
    Path,
    /// Method name inside the codec's request envelope.
    #[default]
    Body,
}

/// Serves one registered service using the registered codecs.
pub struct Dispatcher {
    codecs: CodecRegistry,
    service: ServiceRegistry,
    resolution: Resolution,
}

/// Builds a [`Dispatcher`]. Codecs can only be added here, before serving.
pub struct DispatcherBuilder {
    codecs: CodecRegistry,
    service: ServiceRegistry,
    resolution: Resolution,
}

impl DispatcherBuilder {
    /// Register `codec` for `content_type`. The last registration for a type wins.
    pub fn codec(mut self, codec: impl Codec + 'static, content_type: &str) -> Self {
        self.codecs.register(Arc::new(codec), content_type);
        self
    }

    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            codecs: self.codecs,
            service: self.service,
            resolution: self.resolution,
        }
    }
}

impl Dispatcher {
    pub fn builder(service: ServiceRegistry) -> DispatcherBuilder {
        DispatcherBuilder {
            codecs: CodecRegistry::new(),
            service,
            resolution: Resolution::default(),
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn service(&self) -> &ServiceRegistry {
        &self.service
    }

    /// True if `method` (e.g. "Arith.Multiply") is registered.
    pub fn has_method(&self, method: &str) -> bool {
        self.service.has_method(method)
    }

    /// Handle one request.
    pub fn dispatch(&self, request: RpcRequest) -> Response {
        if request.context.method != Method::POST {
            let err = DispatchError::MethodNotAllowed(request.context.method.clone());
            return plain_error(&err);
        }

        let codec = match self.codecs.select(request.content_type()) {
            Ok(codec) => codec,
            Err(err) => return plain_error(&err),
        };

        let path_spec = match self.resolution {
            Resolution::Path => match self.resolve_path(&request) {
                Ok(spec) => Some(spec),
                Err(err) => {
                    let err = DispatchError::NotFound(err);
                    warn!(error = %err, "Unknown method in path");
                    return plain_text(StatusCode::NOT_FOUND, &err.to_string());
                }
            },
            Resolution::Body => None,
        };

        let mut codec_req = codec.new_request(&request);
        if let Some(err) = codec_req.error() {
            let err = DispatchError::Codec(err);
            warn!(error = %err, "Malformed request envelope");
            return codec_req.write_error(StatusCode::BAD_REQUEST, &err);
        }

        let spec = match path_spec {
            Some(spec) => spec,
            None => {
                let resolved = codec_req
                    .method()
                    .map_err(DispatchError::from)
                    .and_then(|name| self.service.get(&name).map_err(DispatchError::from));
                match resolved {
                    Ok(spec) => spec,
                    Err(err) => {
                        warn!(error = %err, "Unresolved method");
                        return codec_req.write_error(StatusCode::BAD_REQUEST, &err);
                    }
                }
            }
        };

        let raw_args = match codec_req.read_request() {
            Ok(args) => args,
            Err(err) => {
                let err = DispatchError::Codec(err);
                warn!(method = spec.name(), error = %err, "Failed to read request");
                return codec_req.write_error(StatusCode::BAD_REQUEST, &err);
            }
        };

        debug!(method = spec.name(), "Invoking method");
        match spec.invoke(&request.context, raw_args) {
            Ok(reply) => codec_req.write_response(reply),
            Err(err) => {
                debug!(method = spec.name(), error = %err, "Method failed");
                codec_req.write_error(err.status(), &err)
            }
        }
    }

    fn resolve_path(&self, request: &RpcRequest) -> Result<Arc<MethodSpec>, NotFoundError> {
        let name = self.service.qualify(request.path_method());
        self.service.get(&name)
    }
}

fn plain_error(err: &DispatchError) -> Response {
    warn!(error = %err, "Rejected request");
    plain_text(err.status(), &err.to_string())
}

/// Plain text response for failures that happen before a codec is in charge.
pub fn plain_text(status: StatusCode, message: &str) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        message.to_string(),
    )
        .into_response()
}
