use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rpcserver::logging::{self, LogConfig};
use rpcserver::rpc::RpcClient;
use rpcserver::{app, config, web::WebServer};
use serde::Serialize;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "rpcserver")]
#[command(about = "RPC dispatch server over HTTP", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the Arith service
    Serve(ServerArgs),
    /// Call a method on a running server
    Call(CallArgs),
}

#[derive(Args, Serialize)]
struct ServerArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    bind_address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    http_port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    base_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    service_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    max_body_bytes: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    verbose: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    log_json: Option<bool>,
}

#[derive(Args)]
struct CallArgs {
    /// Method name, e.g. "Arith.Multiply" (or "Multiply" with --path-addressed)
    method: String,

    /// JSON parameters, e.g. '{"A":6,"B":7}'
    #[arg(long)]
    params: Option<String>,

    /// Server base URL
    #[arg(long, default_value = "http://127.0.0.1:8080/jsonrpc")]
    url: String,

    /// Put the method name in the URL instead of the request body
    #[arg(long)]
    path_addressed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve(args) => {
            let config = config::AppConfig::new(cli.config.as_deref(), Some(args))
                .context("Failed to load configuration")?;
            logging::init(LogConfig {
                json: config.log_json,
                verbose: config.verbose,
            });
            run_server(config).await.context("Failed to run server")?
        }
        Commands::Call(args) => run_call(args).await.context("RPC call failed")?,
    }

    Ok(())
}

async fn run_server(config: config::AppConfig) -> Result<()> {
    let router = app::build_app(&config).context("Failed to register service")?;
    let server = std::sync::Arc::new(WebServer::new(router, config.socket_addr()));

    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, shutting down");
            signal_server.shutdown();
        }
    });

    server.start().await
}

async fn run_call(args: &CallArgs) -> Result<()> {
    let params = args
        .params
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()
        .context("--params is not valid JSON")?;

    let client = RpcClient::new(args.url.as_str());
    let result: Value = if args.path_addressed {
        client.call_path(&args.method, params).await?
    } else {
        client.call(&args.method, params).await?
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
