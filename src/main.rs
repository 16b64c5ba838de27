use anyhow::Result;
use nse_api::{server, ServerConfig};
use std::env;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(log_level.parse().unwrap_or(Level::INFO.into())),
        )
        .init();

    info!("Starting {}", server::SERVICE_TITLE);

    // ─── 2) config from the platform environment ─────────────────────
    let config = ServerConfig::from_env()?;

    // ─── 3) serve until shutdown ─────────────────────────────────────
    server::serve(config).await
}
