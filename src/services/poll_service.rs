//! Poll cycle orchestration
//!
//! A fixed 30 s repeating timer; every firing spawns one cycle,
//! fire-and-forget, so a slow cycle never delays the next firing and
//! cycles may overlap. The shared surface and chart bindings sit behind
//! async mutexes, every write is last-write-wins, and no lock is held
//! across a network await, which keeps overlapping cycles consistent.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::api::pricefeed::PriceFeedClient;
use crate::services::chart_service::ChartManager;
use crate::services::render_service;
use crate::surface::{DisplaySurface, REGION_LAST_UPDATE};

/// Fixed polling interval
pub const POLL_INTERVAL_MS: u64 = 30_000;
/// Banner shown when the price fetch fails
pub const PRICES_ERROR_MESSAGE: &str = "Failed to load prices. Please refresh the page.";

/// Owns the repeating poll timer for the life of the process
pub struct Poller<S: DisplaySurface + 'static> {
    client: Arc<PriceFeedClient>,
    surface: Arc<Mutex<S>>,
    charts: Arc<Mutex<ChartManager>>,
    timer: Option<JoinHandle<()>>,
}

impl<S: DisplaySurface + 'static> Poller<S> {
    pub fn new(client: PriceFeedClient, surface: Arc<Mutex<S>>, charts: ChartManager) -> Self {
        Poller {
            client: Arc::new(client),
            surface,
            charts: Arc::new(Mutex::new(charts)),
            timer: None,
        }
    }

    /// Start the repeating cycle. The first cycle runs immediately;
    /// calling `start` again is a no-op.
    pub fn start(&mut self) {
        if self.timer.is_some() {
            debug!("Poller already started");
            return;
        }
        info!("Polling every {} ms", POLL_INTERVAL_MS);

        let client = Arc::clone(&self.client);
        let surface = Arc::clone(&self.surface);
        let charts = Arc::clone(&self.charts);
        self.timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(POLL_INTERVAL_MS));
            loop {
                ticker.tick().await;
                // Fire and forget: the timer never waits for a cycle.
                tokio::spawn(run_cycle(
                    Arc::clone(&client),
                    Arc::clone(&surface),
                    Arc::clone(&charts),
                ));
            }
        }));
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }
}

/// One full price-refresh-and-chart-update pass
pub async fn run_cycle<S: DisplaySurface>(
    client: Arc<PriceFeedClient>,
    surface: Arc<Mutex<S>>,
    charts: Arc<Mutex<ChartManager>>,
) {
    let records = match client.get_prices().await {
        Ok(records) => records,
        Err(e) => {
            error!("Error loading prices: {}", e);
            let mut surface = surface.lock().await;
            render_service::show_error(&mut *surface, PRICES_ERROR_MESSAGE);
            return;
        }
    };

    let symbols: Vec<String> = records.iter().map(|r| r.symbol.clone()).collect();
    {
        let mut surface = surface.lock().await;
        surface.set_region_text(
            REGION_LAST_UPDATE,
            &format!("Last update: {}", Local::now().format("%H:%M:%S")),
        );
        render_service::render(&mut *surface, &records);
        charts.lock().await.release_missing(&symbols);
    }

    // One symbol at a time keeps the load on the history endpoint flat.
    for record in &records {
        match client.get_history(&record.symbol).await {
            Ok(history) => {
                let mut surface = surface.lock().await;
                let mut charts = charts.lock().await;
                charts.update_chart(&mut *surface, &record.symbol, &history);
            }
            Err(e) => error!("Error loading chart for {}: {}", record.symbol, e),
        }
    }
    debug!("Cycle complete: {} symbol(s)", records.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::TermSurface;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const PRICES_BODY: &str = r#"{"prices":[{"symbol":"BTC","price_usd":65000.5,"24h_change":2.345,"price_change_24h":2.345,"last_updated":"2025-10-07 14:05:00"}],"timestamp":"2025-10-07T14:05:02.000001","total_coins":1}"#;
    const HISTORY_BODY: &str = r#"{"history":[{"timestamp":"2025-10-07 12:00:00","price":64000.0},{"timestamp":"2025-10-07 13:00:00","price":64500.0},{"timestamp":"2025-10-07 14:00:00","price":65000.5}],"data_points":3}"#;

    /// Minimal canned-response feed; answers every connection, counts
    /// requests, and closes so the client never reuses a connection.
    async fn spawn_feed(
        status_line: &'static str,
        prices_body: &'static str,
        requests: Arc<AtomicUsize>,
    ) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                requests.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let n = stream.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]).to_string();
                    let body = if request.starts_with("GET /api/prices") {
                        prices_body
                    } else if request.starts_with("GET /api/history/") {
                        HISTORY_BODY
                    } else {
                        "{}"
                    };
                    let response = format!(
                        "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status_line,
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_cycle_renders_cards_and_charts() {
        let requests = Arc::new(AtomicUsize::new(0));
        let base_url = spawn_feed("HTTP/1.1 200 OK", PRICES_BODY, Arc::clone(&requests)).await;
        let client = Arc::new(PriceFeedClient::new(base_url));
        let surface = Arc::new(Mutex::new(TermSurface::new()));
        let charts = Arc::new(Mutex::new(ChartManager::new(64, 32)));

        run_cycle(client, Arc::clone(&surface), Arc::clone(&charts)).await;

        let surface = surface.lock().await;
        let grid = surface.grid_content();
        assert!(grid.contains("$65,000.50"));
        assert!(grid.contains("↗ +2.35%"));
        assert!(surface
            .region_text(REGION_LAST_UPDATE)
            .unwrap()
            .starts_with("Last update:"));
        assert!(surface.chart_png("BTC").is_some());
        assert_eq!(charts.lock().await.chart_count(), 1);
        // one prices fetch plus one history fetch
        assert_eq!(requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cycle_server_error_shows_banner_and_skips_charts() {
        let requests = Arc::new(AtomicUsize::new(0));
        let base_url = spawn_feed(
            "HTTP/1.1 500 Internal Server Error",
            PRICES_BODY,
            Arc::clone(&requests),
        )
        .await;
        let client = Arc::new(PriceFeedClient::new(base_url));
        let surface = Arc::new(Mutex::new(TermSurface::new()));
        let charts = Arc::new(Mutex::new(ChartManager::new(64, 32)));

        run_cycle(client, Arc::clone(&surface), Arc::clone(&charts)).await;

        let surface = surface.lock().await;
        assert!(surface.grid_content().contains(PRICES_ERROR_MESSAGE));
        assert_eq!(surface.chart_slot_count(), 0);
        assert_eq!(charts.lock().await.chart_count(), 0);
        // no history fetches after the failed prices fetch
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cycle_bad_shape_shows_banner() {
        let requests = Arc::new(AtomicUsize::new(0));
        let base_url = spawn_feed("HTTP/1.1 200 OK", "{}", Arc::clone(&requests)).await;
        let client = Arc::new(PriceFeedClient::new(base_url));
        let surface = Arc::new(Mutex::new(TermSurface::new()));
        let charts = Arc::new(Mutex::new(ChartManager::new(64, 32)));

        run_cycle(client, Arc::clone(&surface), charts).await;

        let surface = surface.lock().await;
        assert!(surface.grid_content().contains(PRICES_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_cycle_transport_failure_shows_banner() {
        let client = Arc::new(PriceFeedClient::new("http://127.0.0.1:1".to_string()));
        let surface = Arc::new(Mutex::new(TermSurface::new()));
        let charts = Arc::new(Mutex::new(ChartManager::new(64, 32)));

        run_cycle(client, Arc::clone(&surface), charts).await;

        let surface = surface.lock().await;
        assert!(surface.grid_content().contains(PRICES_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let client = PriceFeedClient::new("http://127.0.0.1:1".to_string());
        let surface = Arc::new(Mutex::new(TermSurface::new()));
        let mut poller = Poller::new(client, surface, ChartManager::new(64, 32));

        assert!(!poller.is_running());
        poller.start();
        poller.start();
        assert!(poller.is_running());
    }
}
