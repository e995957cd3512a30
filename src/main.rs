//! Service entry point for the QR decode server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use qrdecode_core::Pipeline;
use qrdecode_core::server;
use tokio::net::TcpListener;
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.default_log_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let config = args.pipeline_config();
    info!(
        formats = ?config.codec.formats,
        max_bytes = config.fetch.max_bytes,
        staging = ?config.fetch.staging,
        try_harder = config.hints.try_harder,
        "pipeline configured"
    );
    let pipeline = Pipeline::new(config).context("failed to build decode pipeline")?;

    let addr = SocketAddr::new(args.host, args.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %listener.local_addr()?, "qrdecode listening");

    server::serve(
        listener,
        Arc::new(pipeline),
        server::shutdown_signal(),
        args.shutdown_grace(),
    )
    .await
    .context("server failed")?;

    info!("qrdecode stopped");
    Ok(())
}
