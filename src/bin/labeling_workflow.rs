//! Labeling Workflow Server
//!
//! Serves the multi-team labeling workflow over HTTP. Configuration comes from
//! `config/labeling.toml`, `LABELING__*` variables and the platform's launch
//! variables.

use anyhow::Context;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

use multiteam_labeling::app::LabelingApp;
use multiteam_labeling::config::ConfigLoader;
use multiteam_labeling::logging::init_structured_logging;
use multiteam_labeling::platform::{PlatformClient, PlatformServices};
use multiteam_labeling::web::create_app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();

    let config = ConfigLoader::from_env()
        .load()
        .context("failed to load labeling workflow configuration")?;
    info!(
        teams = config.launch.number_of_teams,
        team_id = config.launch.team_id,
        workspace_id = config.launch.workspace_id,
        "Starting labeling workflow"
    );

    let client = PlatformClient::new(&config.platform).context("failed to build platform client")?;
    let app = Arc::new(LabelingApp::new(
        &config,
        PlatformServices::from_shared(Arc::new(client)),
    ));

    // A stale launch context should not keep the server from starting
    if let Err(error) = app.bootstrap(&config).await {
        warn!(error = %error, "Could not apply launch project/dataset");
    }

    let listener = tokio::net::TcpListener::bind(&config.web.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.web.bind_address))?;
    info!(address = %config.web.bind_address, "Workflow API listening");

    axum::serve(listener, create_app(app.clone()))
        .with_graceful_shutdown(async {
            if let Err(error) = signal::ctrl_c().await {
                warn!(error = %error, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
        })
        .await
        .context("web server failed")?;

    app.shutdown().await;
    info!("Labeling workflow stopped");
    Ok(())
}
