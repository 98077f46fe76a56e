use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::info;

use loadin_engine::telemetry::init_tracing;
use loadin_engine::config::ServerConfig;
use loadin_engine::server::handler::AssetServer;

/// Development static file server for the marketing site.
#[derive(Debug, Parser)]
#[command(name = "asset-server", version)]
struct Args {
    /// Directory to serve.
    #[arg(long, default_value = "public")]
    root: PathBuf,

    #[arg(long, default_value_t = loadin_engine::config::DEFAULT_SERVER_PORT)]
    port: u16,

    /// Smallest body, in bytes, that gets compressed.
    #[arg(long, default_value_t = loadin_engine::config::COMPRESSION_MIN_BYTES)]
    compression_min_bytes: u64,

    /// Bytes served for open-ended range requests.
    #[arg(long, default_value_t = loadin_engine::config::DEFAULT_RANGE_WINDOW_BYTES)]
    range_window_bytes: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    if !args.root.is_dir() {
        bail!("root {} is not a directory", args.root.display());
    }

    let config = ServerConfig {
        root: args.root,
        port: args.port,
        compression_min_bytes: args.compression_min_bytes,
        range_window_bytes: args.range_window_bytes,
    };

    let server = AssetServer::start(config).await?;
    info!("serving {}", server.url_for("/"));

    tokio::signal::ctrl_c().await?;
    server.shutdown();
    Ok(())
}
