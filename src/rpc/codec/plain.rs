//! Plain JSON codec: the body is the argument value and the reply is written as-is.
//!
//! There is no envelope, so the method name must come from the URL path.

use axum::http::StatusCode;
use axum::response::Response;
use serde::Serialize;
use serde_json::Value;

use super::{Codec, CodecRequest, json_response};
use crate::rpc::error::{CodecError, DispatchError};
use crate::rpc::request::RpcRequest;

#[derive(Debug, Default, Clone, Copy)]
pub struct PlainJsonCodec;

impl PlainJsonCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for PlainJsonCodec {
    fn new_request(&self, request: &RpcRequest) -> Box<dyn CodecRequest> {
        let args = if request.body.iter().all(u8::is_ascii_whitespace) {
            Ok(Value::Null)
        } else {
            serde_json::from_slice(&request.body).map_err(|e| CodecError::Parse(e.to_string()))
        };
        Box::new(PlainJsonRequest { args })
    }
}

struct PlainJsonRequest {
    args: Result<Value, CodecError>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl CodecRequest for PlainJsonRequest {
    fn error(&self) -> Option<CodecError> {
        self.args.as_ref().err().cloned()
    }

    fn method(&self) -> Result<String, CodecError> {
        Err(CodecError::MethodUnavailable)
    }

    fn read_request(&mut self) -> Result<Value, CodecError> {
        match &mut self.args {
            Ok(args) => Ok(args.take()),
            Err(e) => Err(e.clone()),
        }
    }

    fn write_response(self: Box<Self>, reply: Value) -> Response {
        json_response(StatusCode::OK, &reply)
    }

    fn write_error(self: Box<Self>, status: StatusCode, err: &DispatchError) -> Response {
        json_response(
            status,
            &ErrorBody {
                error: err.to_string(),
            },
        )
    }
}
