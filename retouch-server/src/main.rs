//! retouch-server - mask-based image editing service
//!
//! Accepts a source image URL, a user-drawn polygon, and a text prompt;
//! clears the polygon region to transparency and submits the result to
//! a remote generative-image service. Also serves plain generation and
//! variation requests against the same service.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use retouch_common::config::{CliOverrides, Config};
use retouch_server::services::generation::OpenAiImagesClient;
use retouch_server::{build_router, AppState};

/// Command-line arguments.
///
/// Every value can also be supplied via environment variable or the
/// TOML config file; the command line wins.
#[derive(Parser, Debug)]
#[command(name = "retouch-server", version, about = "Mask-based image editing service")]
struct Args {
    /// Generation service API key
    #[arg(long)]
    api_key: Option<String>,

    /// HTTP listen port
    #[arg(long)]
    port: Option<u16>,

    /// Working directory for temporary artifacts
    #[arg(long)]
    working_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting retouch-server v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = Config::resolve(CliOverrides {
        api_key: args.api_key,
        port: args.port,
        working_dir: args.working_dir,
    })?;
    config.ensure_working_dir()?;
    info!("Working directory: {}", config.working_dir.display());

    let generator = Arc::new(OpenAiImagesClient::new(config.api_key.clone())?);
    let port = config.port;

    let state = AppState::new(config, generator)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("retouch-server listening on http://127.0.0.1:{}", port);
    info!("Health check: http://127.0.0.1:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
