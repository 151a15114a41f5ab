//! Portal Server
//!
//! Serves the portal JSON API and the static frontend.
//!
//! The configuration file is `portal.toml` in the working directory, or the
//! path in `PORTAL_CONFIG`.

use anyhow::Context;
use portal_core::config::PortalConfig;
use portal_core::db;
use portal_server::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config_path = std::env::var_os("PORTAL_CONFIG")
        .map(Into::into)
        .unwrap_or_else(PortalConfig::config_path);
    let config = PortalConfig::load_from(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    if let Some(dir) = config.database.path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating data directory {}", dir.display()))?;
    }
    let pool = db::init_db(&config.database.path)
        .with_context(|| format!("opening database {}", config.database.path.display()))?;

    let bind = config.server.bind.clone();
    let state = AppState::new(pool, config);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding to {bind}"))?;
    tracing::info!("Server running on http://{}", bind);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
