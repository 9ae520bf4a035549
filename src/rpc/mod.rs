//! RPC dispatch over HTTP.
//!
//! Exposes the methods of one registered service object, decoding requests and
//! encoding responses with a codec chosen per request from its `Content-Type`.
//!
//! ## Architecture
//!
//! - `registry`: method discovery and lookup-by-name for a receiver
//! - `codec`: codec contract, content-type negotiation, JSON-RPC 2.0 and plain JSON codecs
//! - `dispatcher`: per-request state machine from HTTP request to response
//! - `protocol`: JSON-RPC 2.0 request/response types
//! - `client`: HTTP client for calling a running server
//!
//! ## Method resolution
//!
//! A dispatcher runs in one of two modes:
//! - Path: the last URL segment names the method (`POST /jsonrpc/v1/Multiply`)
//! - Body: the codec envelope names it (`{"method": "Arith.Multiply", ...}`)

pub mod client;
pub mod codec;
pub mod dispatcher;
mod error;
pub mod protocol;
pub mod registry;
mod request;

pub use client::{ClientError, RpcClient};
pub use codec::{Codec, CodecRegistry, CodecRequest, JsonRpcCodec, PlainJsonCodec};
pub use dispatcher::{Dispatcher, DispatcherBuilder, Resolution};
pub use error::{CodecError, DispatchError, NotFoundError, RegistrationError, ServiceError};
pub use protocol::{Request, Response, RpcError};
pub use registry::{MethodSpec, Registrar, RpcService, ServiceRegistry};
pub use request::{RequestContext, RpcRequest};
