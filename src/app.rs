//! Wires the `Arith` service into the standard pair of endpoints.

use std::sync::Arc;

use axum::Router;

use crate::arith::Arith;
use crate::config::AppConfig;
use crate::rpc::{
    Dispatcher, JsonRpcCodec, PlainJsonCodec, RegistrationError, Resolution, ServiceRegistry,
};
use crate::web::{Endpoint, build_router};

/// Media type under which the path-addressed endpoint accepts bare JSON arguments.
pub const PLAIN_JSON_CONTENT_TYPE: &str = "application/x-json-args";

/// Build the router serving one `Arith` receiver:
///
/// - `<base>/v1/{method}`: path-addressed, JSON-RPC (`application/json`) or bare
///   arguments ([`PLAIN_JSON_CONTENT_TYPE`])
/// - `<base>/v2`: body-addressed, JSON-RPC only
pub fn build_app(config: &AppConfig) -> Result<Router, RegistrationError> {
    let arith = Arc::new(Arith);
    let base = config.normalized_base_path();

    let path_dispatcher =
        Dispatcher::builder(ServiceRegistry::new(arith.clone(), &config.service_name)?)
            .codec(JsonRpcCodec::new(), "application/json")
            .codec(PlainJsonCodec::new(), PLAIN_JSON_CONTENT_TYPE)
            .resolution(Resolution::Path)
            .build();

    let body_dispatcher = Dispatcher::builder(ServiceRegistry::new(arith, &config.service_name)?)
        .codec(JsonRpcCodec::new(), "application/json")
        .resolution(Resolution::Body)
        .build();

    tracing::info!(
        methods = ?body_dispatcher.service().method_names(),
        "Registered service"
    );

    Ok(build_router(
        vec![
            Endpoint::new(format!("{}/v1", base), path_dispatcher),
            Endpoint::new(format!("{}/v2", base), body_dispatcher),
        ],
        config.max_body_bytes,
    ))
}
