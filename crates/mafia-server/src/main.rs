use mafia::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = config::from_env();
    tracing::info!(
        bind_addr = %config.bind_addr,
        mafia = config.quotas.mafia,
        sheriff = config.quotas.sheriff,
        civilian = config.quotas.civilian,
        "starting Mafia server"
    );

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "server stopped");
        std::process::exit(1);
    }
}

async fn run(config: ServerConfig) -> Result<(), MafiaError> {
    let server = MafiaServer::builder().config(config).build().await?;
    server.run().await
}

/// Installs the global subscriber. `RUST_LOG` overrides the `info` default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
