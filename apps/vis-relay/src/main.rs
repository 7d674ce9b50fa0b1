//! vis-relay entry point.

mod app;
mod config;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting vis-relay");

    let path = config::config_path(std::env::args().nth(1), std::env::var("VIS_RELAY_CONFIG").ok());
    let config = config::RelayConfig::load(path.as_deref())?;
    tracing::info!(
        vis_url = %config.vis_url,
        receiver = %config.receiver_url,
        routes = config.routes.len(),
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config))?;

    tracing::info!("relay shut down cleanly");
    Ok(())
}
