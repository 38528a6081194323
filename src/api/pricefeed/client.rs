use reqwest::Client as HttpClient;
use tracing::{debug, warn};

use super::models::{ApiError, HealthResponse, HistoryResponse, PricesResponse};
use crate::models::{PricePoint, PriceRecord};

/// HTTP client for the price feed backend
pub struct PriceFeedClient {
    http_client: HttpClient,
    base_url: String,
}

impl PriceFeedClient {
    /// Create a new client for the feed at `base_url`
    pub fn new(base_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url,
        }
    }

    /// GET /api/prices
    ///
    /// Retrieves the current quote for every tracked asset. A response
    /// without a well-formed `prices` list is an error; the caller
    /// treats any failure here as fatal for the whole cycle.
    pub async fn get_prices(&self) -> Result<Vec<PriceRecord>, ApiError> {
        let url = format!("{}/api/prices", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Request(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Self::handle_error_response(status, response).await);
        }

        let parsed = response
            .json::<PricesResponse>()
            .await
            .map_err(|e| ApiError::Deserialization(format!("Failed to parse response: {}", e)))?;

        if let Some(total) = parsed.total_coins {
            debug!("Feed reports {} tracked coin(s)", total);
        }
        Ok(parsed
            .prices
            .into_iter()
            .map(|entry| entry.into_record())
            .collect())
    }

    /// GET /api/history/{symbol}
    ///
    /// Retrieves the chart history for one symbol. Failures here only
    /// affect that symbol's chart.
    pub async fn get_history(&self, symbol: &str) -> Result<Vec<PricePoint>, ApiError> {
        let url = format!("{}/api/history/{}", self.base_url, symbol);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Request(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Self::handle_error_response(status, response).await);
        }

        let parsed = response
            .json::<HistoryResponse>()
            .await
            .map_err(|e| ApiError::Deserialization(format!("Failed to parse response: {}", e)))?;

        if let Some(count) = parsed.data_points {
            debug!("History for {}: {} point(s)", symbol, count);
        }
        Ok(parsed
            .history
            .into_iter()
            .map(|entry| entry.into_point())
            .collect())
    }

    /// GET /health
    ///
    /// Startup probe; a failure is reported to the caller but is never
    /// fatal.
    pub async fn get_health(&self) -> Result<HealthResponse, ApiError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Request(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Self::handle_error_response(status, response).await);
        }

        response
            .json::<HealthResponse>()
            .await
            .map_err(|e| ApiError::Deserialization(format!("Failed to parse response: {}", e)))
    }

    /// Map a non-success status to an error
    async fn handle_error_response(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> ApiError {
        let status_code = status.as_u16();
        let body_text = response.text().await.unwrap_or_default();

        match status_code {
            500..=599 => {
                warn!("Server error {}: {}", status_code, body_text);
                ApiError::Server(status_code, body_text)
            }
            _ => ApiError::Http(status_code, body_text),
        }
    }
}
