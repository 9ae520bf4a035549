//! HTTP layer.
//!
//! Mounts dispatchers on URL prefixes and serves them with axum.
//!
//! ## Endpoints
//!
//! - `POST <prefix>/{method}` - path-addressed dispatcher
//! - `POST <prefix>` - body-addressed dispatcher
//! - `GET /health` - liveness probe
//!
//! RPC routes accept every HTTP verb so that the dispatcher, not the router, answers
//! non-POST requests.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, FromRequest, FromRequestParts, Path, Request, State};
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::Instrument;
use uuid::Uuid;

use crate::rpc::{Dispatcher, Resolution, RpcRequest};

/// A dispatcher mounted under a URL prefix.
pub struct Endpoint {
    pub prefix: String,
    pub dispatcher: Arc<Dispatcher>,
}

impl Endpoint {
    pub fn new(prefix: impl Into<String>, dispatcher: Dispatcher) -> Self {
        Self {
            prefix: prefix.into(),
            dispatcher: Arc::new(dispatcher),
        }
    }

    fn route(&self) -> String {
        let prefix = self.prefix.trim_end_matches('/');
        match self.dispatcher.resolution() {
            Resolution::Path => format!("{}/{{method}}", prefix),
            Resolution::Body if prefix.is_empty() => "/".to_string(),
            Resolution::Body => prefix.to_string(),
        }
    }
}

/// Build the router for `endpoints`, limiting request bodies to `max_body_bytes`.
pub fn build_router(endpoints: Vec<Endpoint>, max_body_bytes: usize) -> Router {
    let mut router = Router::new().route("/health", get(handle_health));

    for endpoint in endpoints {
        let route = endpoint.route();
        tracing::debug!(route = %route, mode = ?endpoint.dispatcher.resolution(), "Mounting dispatcher");
        router = router.merge(
            Router::new()
                .route(&route, any(handle_rpc))
                .with_state(endpoint.dispatcher),
        );
    }

    router.layer(DefaultBodyLimit::max(max_body_bytes))
}

async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn handle_rpc(State(dispatcher): State<Arc<Dispatcher>>, request: Request) -> Response {
    let span = tracing::info_span!(
        "rpc_request",
        request_id = %Uuid::now_v7(),
        path = %request.uri().path()
    );

    async move {
        let (mut parts, body) = request.into_parts();

        // Route parameters arrive percent-decoded; body-addressed routes have none.
        let segment = Path::<String>::from_request_parts(&mut parts, &())
            .await
            .ok()
            .map(|Path(segment)| segment);
        let method = parts.method.clone();
        let uri = parts.uri.clone();
        let headers = parts.headers.clone();

        // Only POST bodies are buffered; the dispatcher answers everything else with 405.
        let body = if method == Method::POST {
            match Bytes::from_request(Request::from_parts(parts, body), &()).await {
                Ok(body) => body,
                Err(rejection) => {
                    tracing::warn!(error = %rejection, "Failed to read request body");
                    return rejection.into_response();
                }
            }
        } else {
            Bytes::new()
        };

        let mut rpc_request = RpcRequest::new(method, uri, headers, body);
        if let Some(segment) = segment {
            rpc_request = rpc_request.with_path_method(segment);
        }

        let response = dispatcher.dispatch(rpc_request);
        tracing::debug!(status = response.status().as_u16(), "Request handled");
        response
    }
    .instrument(span)
    .await
}

/// HTTP server for the RPC endpoints.
pub struct WebServer {
    bind_addr: SocketAddr,
    router: Router,
    shutdown_tx: watch::Sender<bool>,
}

impl WebServer {
    pub fn new(router: Router, bind_addr: SocketAddr) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            bind_addr,
            router,
            shutdown_tx,
        }
    }

    /// Bind and serve. Runs until shutdown() is called.
    pub async fn start(&self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener. Runs until shutdown() is called.
    pub async fn serve(&self, listener: TcpListener) -> anyhow::Result<()> {
        tracing::info!(addr = %listener.local_addr()?, "RPC server listening");

        // A watch receiver sees a shutdown requested before serving started.
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        axum::serve(listener, self.router.clone())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
            })
            .await?;

        tracing::info!("RPC server stopped");
        Ok(())
    }

    /// Signal the server to shut down gracefully.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arith::Arith;
    use crate::rpc::{JsonRpcCodec, ServiceRegistry};

    fn dispatcher(resolution: Resolution) -> Dispatcher {
        let registry = ServiceRegistry::new(Arc::new(Arith), "Arith").unwrap();
        Dispatcher::builder(registry)
            .codec(JsonRpcCodec::new(), "application/json")
            .resolution(resolution)
            .build()
    }

    #[test]
    fn path_endpoint_route_has_method_segment() {
        let endpoint = Endpoint::new("/jsonrpc/v1/", dispatcher(Resolution::Path));
        assert_eq!(endpoint.route(), "/jsonrpc/v1/{method}");
    }

    #[test]
    fn body_endpoint_route_is_prefix() {
        let endpoint = Endpoint::new("/jsonrpc/v2", dispatcher(Resolution::Body));
        assert_eq!(endpoint.route(), "/jsonrpc/v2");

        let root = Endpoint::new("", dispatcher(Resolution::Body));
        assert_eq!(root.route(), "/");
    }
}
