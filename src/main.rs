use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod models;
mod services;
mod surface;

use api::pricefeed::PriceFeedClient;
use services::chart_service::{ChartManager, CHART_HEIGHT, CHART_WIDTH};
use services::poll_service::Poller;
use surface::TermSurface;

const DEFAULT_FEED_URL: &str = "http://127.0.0.1:8888";
const CHART_DIR: &str = "charts";

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("coindeck=debug".parse().unwrap()),
        )
        .with_target(true)
        .init();

    info!("📈 Starting coindeck v{}...", env!("CARGO_PKG_VERSION"));

    let base_url =
        std::env::var("PRICE_FEED_URL").unwrap_or_else(|_| DEFAULT_FEED_URL.to_string());
    info!("Price feed: {}", base_url);
    let client = PriceFeedClient::new(base_url);

    // Probe the feed before the first cycle; a failure here is only
    // informational, the poller retries every cycle anyway.
    match client.get_health().await {
        Ok(health) => info!(
            "Feed is {}: {} tracked coin(s), {} stored record(s)",
            health.status, health.tracked_coins, health.database_records
        ),
        Err(e) => warn!("Feed health check failed: {}", e),
    }

    let chart_dir = PathBuf::from(CHART_DIR);
    if let Err(e) = std::fs::create_dir_all(&chart_dir) {
        error!(
            "Failed to create chart directory {}: {}",
            chart_dir.display(),
            e
        );
        return;
    }

    let surface = Arc::new(Mutex::new(
        TermSurface::new().with_echo().with_chart_dir(chart_dir),
    ));
    let mut poller = Poller::new(
        client,
        surface,
        ChartManager::new(CHART_WIDTH, CHART_HEIGHT),
    );
    poller.start();

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutting down");
}
