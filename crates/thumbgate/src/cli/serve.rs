//! The `thumbgate serve` command.

use anyhow::Context;
use clap::Args;
use std::sync::Arc;
use thumbgate_core::{Config, Thumbgate};

use crate::server;

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on (overrides server.bind)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Include error detail in 404 bodies
    #[arg(long)]
    pub debug: bool,

    /// Send every request to the generator, even if the thumbnail exists
    #[arg(long)]
    pub no_static: bool,
}

/// Execute the serve command.
pub async fn execute(args: ServeArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    config.debug |= args.debug;
    config.server.serve_static &= !args.no_static;

    let image_root = config.image_root();
    if !image_root.is_dir() {
        tracing::warn!("Image root {:?} does not exist", image_root);
    }
    let thumb_root = config.thumb_root();
    std::fs::create_dir_all(&thumb_root)
        .with_context(|| format!("Cannot create thumbnail root {:?}", thumb_root))?;

    let bind = config.server.bind.clone();
    let gate = Arc::new(Thumbgate::new(config)?);
    let app = server::router(gate);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Cannot bind {bind}"))?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
