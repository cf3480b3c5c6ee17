use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use minesweeper_server::{
    config::{Args, ServerConfig},
    listener::Listener,
    players::Players,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    info!("Starting Minesweeper server");

    let config = ServerConfig::try_from(Args::parse()).context("invalid configuration")?;
    let board = Arc::new(
        config
            .build_board()
            .await
            .context("failed to build the board")?,
    );
    info!(
        "Board ready: {}x{} with {} bombs, debug mode {}",
        board.width(),
        board.height(),
        board.bombs().await,
        if config.debug { "on" } else { "off" }
    );

    let listener = Listener::bind(config.addr)
        .await
        .with_context(|| format!("failed to listen on {}", config.addr))?;
    info!("Listening on {}", listener.local_addr()?);

    let players = Arc::new(Players::default());
    if let Err(err) = listener.serve(board, players, config.debug).await {
        error!("Listener stopped: {}", err);
        return Err(err).context("listener failed");
    }

    Ok(())
}
