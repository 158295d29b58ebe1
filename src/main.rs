use airwave::config::ServerConfig;
use airwave::signaling::SignalingServer;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .compact()
        .init();

    println!("   Airwave Signaling Server");
    println!("   Binding to {}", config.bind);
    println!("   Press Ctrl+C to stop\n");

    let bind = config.bind.clone();
    let server = SignalingServer::bind(config)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;

    tokio::select! {
        result = server.run() => result.context("Signaling server stopped")?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(())
}
