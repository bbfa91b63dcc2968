//! rat-relay: broadcast relay binary

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rat_relay::{RelayServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting rat-relay");

    let config = ServerConfig::load()?;

    if let Err(e) = RelayServer::run(config).await {
        error!("Relay error: {:#}", e);
        return Err(e);
    }

    Ok(())
}
