use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use wsgate_invoke::{InvokeConfig, LambdaInvoker};
use wsgate_server::{RouteTable, ServerConfig};

/// Local WebSocket gateway: relays socket lifecycle events to locally
/// invoked handler functions and pushes their replies back down the socket.
#[derive(Debug, Parser)]
#[command(name = "wsgate", version)]
struct Args {
    /// Port for the shared WebSocket + HTTP listener.
    #[arg(long, env = "WS_PORT", default_value_t = 8080)]
    port: u16,

    /// Base URL of the function invoke endpoint (SAM local by default).
    #[arg(long, env = "LAMBDA_ENDPOINT", default_value = "http://127.0.0.1:3001")]
    lambda_endpoint: String,

    /// Handler invoked on `$connect`.
    #[arg(long, default_value = "on_connect_v2")]
    connect_function: String,

    /// Handler invoked on `sendMessage`.
    #[arg(long, default_value = "on_send_message_v3")]
    message_function: String,

    /// Handler invoked on `$disconnect`.
    #[arg(long, default_value = "on_disconnect_v2")]
    disconnect_function: String,

    /// Upper bound on a single handler invocation, in seconds.
    #[arg(long, default_value_t = 30)]
    invoke_timeout_secs: u64,

    /// Domain name reported in event envelopes.
    #[arg(long, default_value = "localhost")]
    domain_name: String,

    /// Stage reported in event envelopes.
    #[arg(long, default_value = "local")]
    stage: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let invoker = Arc::new(LambdaInvoker::new(InvokeConfig {
        endpoint: args.lambda_endpoint.clone(),
        timeout: Duration::from_secs(args.invoke_timeout_secs),
    }));

    let config = ServerConfig {
        port: args.port,
        routes: RouteTable {
            connect: args.connect_function,
            message: args.message_function,
            disconnect: args.disconnect_function,
        },
        domain_name: args.domain_name,
        stage: args.stage,
        ..Default::default()
    };

    let port = config.port;
    let _handle = wsgate_server::start(config, invoker)
        .await
        .expect("failed to start server");

    tracing::info!(
        port = port,
        endpoint = %args.lambda_endpoint,
        "local WebSocket gateway ready"
    );

    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl+c");

    tracing::info!("shutting down");
}
