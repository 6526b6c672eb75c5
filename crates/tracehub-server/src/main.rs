use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use tracehub_server::config::DEFAULT_PORT;
use tracehub_server::{Server, ServerConfig};
use tracehub_store::TraceStore;
use tracehub_wire::frame::DEFAULT_MAX_FRAME_BYTES;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Ingestion server for instrumented-process trace events.
#[derive(Parser, Debug)]
#[command(name = "tracehubd", version)]
struct Cli {
    /// TCP port to listen on for instrumented clients
    #[arg(long, default_value_t = DEFAULT_PORT, env = "TRACEHUB_PORT")]
    port: u16,

    /// Address to bind; all interfaces by default
    #[arg(long, default_value = "0.0.0.0", env = "TRACEHUB_BIND")]
    bind: IpAddr,

    /// SQLite database file; created with a fresh schema when absent
    #[arg(long, env = "TRACEHUB_DATABASE")]
    database: PathBuf,

    /// Upper bound in bytes for a single framed message
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_BYTES, env = "TRACEHUB_MAX_FRAME_BYTES")]
    max_frame_bytes: usize,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run(Cli::parse()).await {
        eprintln!("fatal: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let store = TraceStore::open(&cli.database)?;

    let config = ServerConfig {
        bind: cli.bind,
        port: cli.port,
        max_frame_bytes: cli.max_frame_bytes,
    };
    let server = Server::bind(&config, store).await?;
    info!(addr = %server.local_addr(), "listening for trace connections");

    server
        .serve_with_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    info!("shutdown complete");
    Ok(())
}
