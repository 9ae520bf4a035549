//! JSON-RPC 2.0 codec.
//!
//! The method name travels in the envelope (`"method": "Arith.Multiply"`). Errors are
//! embedded in a `200 OK` response as JSON-RPC error objects, whatever status the
//! dispatcher suggests.

use axum::http::StatusCode;
use axum::response::Response;
use serde_json::Value;

use super::{Codec, CodecRequest, json_response};
use crate::rpc::error::{CodecError, DispatchError};
use crate::rpc::protocol::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR, Request,
    Response as RpcResponse, RpcError, SERVER_ERROR,
};
use crate::rpc::request::RpcRequest;

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRpcCodec;

impl JsonRpcCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for JsonRpcCodec {
    fn new_request(&self, request: &RpcRequest) -> Box<dyn CodecRequest> {
        Box::new(JsonRpcRequest::parse(&request.body))
    }
}

struct JsonRpcRequest {
    id: Value,
    envelope: Result<Request, CodecError>,
}

impl JsonRpcRequest {
    fn parse(body: &[u8]) -> Self {
        let value: Value = match serde_json::from_slice(body) {
            Ok(v) => v,
            Err(e) => {
                return Self {
                    id: Value::Null,
                    envelope: Err(CodecError::Parse(e.to_string())),
                };
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        let envelope = serde_json::from_value::<Request>(value)
            .map_err(|e| CodecError::InvalidRequest(e.to_string()))
            .and_then(|req| {
                req.validate()
                    .map_err(|msg| CodecError::InvalidRequest(msg.to_string()))?;
                Ok(req)
            });

        Self { id, envelope }
    }
}

impl CodecRequest for JsonRpcRequest {
    fn error(&self) -> Option<CodecError> {
        self.envelope.as_ref().err().cloned()
    }

    fn method(&self) -> Result<String, CodecError> {
        self.envelope
            .as_ref()
            .map(|req| req.method.clone())
            .map_err(Clone::clone)
    }

    fn read_request(&mut self) -> Result<Value, CodecError> {
        match &mut self.envelope {
            Ok(req) => Ok(req.params.take().unwrap_or(Value::Null)),
            Err(e) => Err(e.clone()),
        }
    }

    fn write_response(self: Box<Self>, reply: Value) -> Response {
        json_response(StatusCode::OK, &RpcResponse::success(self.id, reply))
    }

    fn write_error(self: Box<Self>, _status: StatusCode, err: &DispatchError) -> Response {
        json_response(StatusCode::OK, &RpcResponse::error(self.id, rpc_error(err)))
    }
}

fn rpc_error(err: &DispatchError) -> RpcError {
    let code = match err {
        DispatchError::Service(e) => {
            return RpcError {
                code: e.code.unwrap_or(SERVER_ERROR),
                message: e.message.clone(),
                data: e.data.clone(),
            };
        }
        DispatchError::Codec(CodecError::Parse(_)) => PARSE_ERROR,
        DispatchError::Codec(_) => INVALID_REQUEST,
        DispatchError::NotFound(_) => METHOD_NOT_FOUND,
        DispatchError::Decode(_) => INVALID_PARAMS,
        _ => INTERNAL_ERROR,
    };
    RpcError::new(code, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::error::{NotFoundError, ServiceError};
    use axum::body::to_bytes;
    use axum::http::{HeaderMap, Method};
    use serde_json::json;

    fn codec_request(body: &str) -> Box<dyn CodecRequest> {
        let request = RpcRequest::new(
            Method::POST,
            "/jsonrpc/v2".parse().unwrap(),
            HeaderMap::new(),
            body.to_string(),
        );
        JsonRpcCodec::new().new_request(&request)
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn parses_envelope() {
        let mut req = codec_request(
            r#"{"jsonrpc":"2.0","method":"Arith.Multiply","params":{"A":6,"B":7},"id":9}"#,
        );

        assert!(req.error().is_none());
        assert_eq!(req.method().unwrap(), "Arith.Multiply");
        assert_eq!(req.read_request().unwrap(), json!({"A": 6, "B": 7}));
    }

    #[test]
    fn missing_params_read_as_null() {
        let mut req = codec_request(r#"{"jsonrpc":"2.0","method":"Arith.Multiply","id":1}"#);
        assert_eq!(req.read_request().unwrap(), Value::Null);
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let req = codec_request("{not json");
        assert!(matches!(req.error(), Some(CodecError::Parse(_))));
        assert!(req.method().is_err());
    }

    #[test]
    fn wrong_version_is_invalid_request() {
        let req = codec_request(r#"{"jsonrpc":"1.0","method":"Arith.Multiply","id":1}"#);
        assert!(matches!(req.error(), Some(CodecError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn response_echoes_id() {
        let req = codec_request(r#"{"jsonrpc":"2.0","method":"Arith.Multiply","id":"abc"}"#);
        let resp = req.write_response(json!(42));

        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body, json!({"jsonrpc": "2.0", "result": 42, "id": "abc"}));
    }

    #[tokio::test]
    async fn errors_are_embedded_with_ok_status() {
        let req = codec_request(r#"{"jsonrpc":"2.0","method":"Arith.Add","id":3}"#);
        let err = DispatchError::from(NotFoundError("Arith.Add".into()));
        let resp = req.write_error(StatusCode::BAD_REQUEST, &err);

        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(body["id"], 3);
        assert!(body.get("result").is_none());
    }

    #[tokio::test]
    async fn service_error_keeps_message_and_code() {
        let req = codec_request(r#"{"jsonrpc":"2.0","method":"Arith.Divide","id":1}"#);
        let err = DispatchError::from(ServiceError::new("divide by zero"));
        let body = body_json(req.write_error(StatusCode::BAD_REQUEST, &err)).await;
        assert_eq!(body["error"]["code"], SERVER_ERROR);
        assert_eq!(body["error"]["message"], "divide by zero");

        let req = codec_request(r#"{"jsonrpc":"2.0","method":"Arith.Divide","id":1}"#);
        let err = DispatchError::from(
            ServiceError::new("custom")
                .with_code(-32050)
                .with_data(json!({"hint": "retry"})),
        );
        let body = body_json(req.write_error(StatusCode::BAD_REQUEST, &err)).await;
        assert_eq!(body["error"]["code"], -32050);
        assert_eq!(body["error"]["data"]["hint"], "retry");
    }

    #[tokio::test]
    async fn parse_error_has_null_id() {
        let req = codec_request("[");
        let err = DispatchError::from(req.error().unwrap());
        let body = body_json(req.write_error(StatusCode::BAD_REQUEST, &err)).await;

        assert_eq!(body["error"]["code"], PARSE_ERROR);
        assert_eq!(body["id"], Value::Null);
    }
}
