use anyhow::Result;
use clap::Parser;
use driftmail::{channel, config::DaemonConfig, rest, AppContext};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "driftmaild",
    about = "Driftmail — disposable-inbox demo daemon",
    version
)]
struct Args {
    /// Realtime channel (WebSocket) port
    #[arg(long, env = "DRIFTMAIL_PORT")]
    port: Option<u16>,

    /// REST API port
    #[arg(long, env = "DRIFTMAIL_REST_PORT")]
    rest_port: Option<u16>,

    /// Data directory for config and the SQLite database
    #[arg(long, env = "DRIFTMAIL_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DRIFTMAIL_LOG")]
    log: Option<String>,

    /// Bind address for both servers (default: 127.0.0.1; use 0.0.0.0 for LAN access)
    #[arg(long, env = "DRIFTMAIL_BIND")]
    bind_address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = DaemonConfig::new(
        args.port,
        args.rest_port,
        args.data_dir,
        args.log,
        args.bind_address,
    );
    init_tracing(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %config.data_dir.display(),
        "driftmaild starting"
    );

    let ctx = Arc::new(AppContext::new(config).await?);

    // REST runs alongside the channel server; the channel server owns the
    // shutdown signal.
    let rest_ctx = ctx.clone();
    tokio::spawn(async move {
        if let Err(e) = rest::start_rest_server(rest_ctx).await {
            error!(err = %e, "REST server exited");
        }
    });

    channel::run(ctx).await
}

fn init_tracing(config: &DaemonConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log));
    match config.log_format.as_str() {
        "json" => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}
