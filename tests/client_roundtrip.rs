use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use rpcserver::app::build_app;
use rpcserver::arith::Quotient;
use rpcserver::config::AppConfig;
use rpcserver::rpc::{
    ClientError, Dispatcher, JsonRpcCodec, Registrar, RequestContext, RpcClient, RpcService,
    ServiceError, ServiceRegistry,
};
use rpcserver::web::{Endpoint, WebServer, build_router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::time::timeout;

async fn start_server() -> (Arc<WebServer>, String) {
    let config = AppConfig::default();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    let server = Arc::new(WebServer::new(
        build_app(&config).expect("app"),
        config.socket_addr(),
    ));
    let serving = server.clone();
    tokio::spawn(async move { serving.serve(listener).await });

    (server, format!("http://{}/jsonrpc", addr))
}

#[tokio::test]
async fn test_body_addressed_calls() {
    let (server, url) = start_server().await;
    let client = RpcClient::new(url);

    let product: i64 = client
        .call("Arith.Multiply", Some(json!({"A": 6, "B": 7})))
        .await
        .expect("multiply");
    assert_eq!(product, 42);

    let quotient: Quotient = client
        .call("Arith.Divide", Some(json!({"A": 7, "B": 2})))
        .await
        .expect("divide");
    assert_eq!(quotient, Quotient { quo: 3, rem: 1 });

    server.shutdown();
}

#[tokio::test]
async fn test_application_error() {
    let (server, url) = start_server().await;
    let client = RpcClient::new(url);

    let err = client
        .call::<Quotient>("Arith.Divide", Some(json!({"A": 1, "B": 0})))
        .await
        .expect_err("divide by zero");

    match err {
        ClientError::Rpc(e) => assert_eq!(e.message, "divide by zero"),
        other => panic!("expected RPC error, got {other}"),
    }

    server.shutdown();
}

#[tokio::test]
async fn test_path_addressed_calls() {
    let (server, url) = start_server().await;
    let client = RpcClient::new(url);

    let product: i64 = client
        .call_path("Multiply", Some(json!({"A": 6, "B": 7})))
        .await
        .expect("multiply");
    assert_eq!(product, 42);

    let err = client
        .call_path::<i64>("Add", Some(json!({"A": 1, "B": 2})))
        .await
        .expect_err("unknown method");
    match err {
        ClientError::Status(status, body) => {
            assert_eq!(status.as_u16(), 404);
            assert!(body.contains("Arith.Add"));
        }
        other => panic!("expected plain-text status error, got {other}"),
    }

    server.shutdown();
}

#[tokio::test]
async fn test_shutdown_stops_server() {
    let config = AppConfig::default();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let server = Arc::new(WebServer::new(
        build_app(&config).expect("app"),
        config.socket_addr(),
    ));

    let serving = server.clone();
    let handle = tokio::spawn(async move { serving.serve(listener).await });

    server.shutdown();

    let result = timeout(Duration::from_secs(5), handle)
        .await
        .expect("timeout waiting for shutdown")
        .expect("task panicked");
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_shutdown_before_serve_is_not_lost() {
    let config = AppConfig::default();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let server = WebServer::new(build_app(&config).expect("app"), config.socket_addr());

    server.shutdown();

    let result = timeout(Duration::from_secs(5), server.serve(listener))
        .await
        .expect("timeout waiting for shutdown");
    assert!(result.is_ok());
}

#[derive(Default)]
struct Counter {
    value: AtomicI64,
}

impl Counter {
    fn reset(&self, _: &RequestContext, _: &(), _: &mut ()) -> Result<(), ServiceError> {
        self.value.store(0, Ordering::SeqCst);
        Ok(())
    }

    fn add(&self, _: &RequestContext, by: &i64, reply: &mut i64) -> Result<(), ServiceError> {
        *reply = self.value.fetch_add(*by, Ordering::SeqCst) + by;
        Ok(())
    }
}

impl RpcService for Counter {
    fn register(registrar: &mut Registrar<Self>) {
        registrar
            .method("Reset", Counter::reset)
            .method("Add", Counter::add);
    }
}

#[tokio::test]
async fn test_unit_reply_is_null_result() {
    let registry = ServiceRegistry::new(Arc::new(Counter::default()), "Counter").expect("registry");
    let dispatcher = Dispatcher::builder(registry)
        .codec(JsonRpcCodec::new(), "application/json")
        .build();
    let router = build_router(vec![Endpoint::new("/rpc/v2", dispatcher)], 1024);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let server = Arc::new(WebServer::new(router, addr));
    let serving = server.clone();
    tokio::spawn(async move { serving.serve(listener).await });

    let client = RpcClient::new(format!("http://{}/rpc", addr));

    let total: i64 = client.call("Counter.Add", Some(json!(5))).await.expect("add");
    assert_eq!(total, 5);

    client
        .call::<()>("Counter.Reset", None)
        .await
        .expect("unit reply");

    let total: i64 = client.call("Counter.Add", Some(json!(2))).await.expect("add");
    assert_eq!(total, 2);

    server.shutdown();
}
