//! mockdesk binary entrypoint

use anyhow::Result;
use mockdesk_config::ConfigLoader;
use mockdesk_server::SimulationServer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ConfigLoader::new().load()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    if config.logging.compact {
        tracing_subscriber::fmt().with_env_filter(filter).compact().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let server = SimulationServer::new(config);

    info!(
        %addr,
        scenario = %server.active_scenario(),
        "mockdesk simulation server listening"
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, server.router()).await?;
    Ok(())
}
