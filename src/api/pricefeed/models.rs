//! Wire models for the price feed API

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::models::{PricePoint, PriceRecord};

/// Errors from the price feed API
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network/request error
    #[error("Request failed: {0}")]
    Request(String),
    /// 5xx Server Error
    #[error("Server error ({0}): {1}")]
    Server(u16, String),
    /// Other non-success HTTP statuses
    #[error("HTTP error ({0}): {1}")]
    Http(u16, String),
    /// Response body did not match the expected shape
    #[error("Unexpected response: {0}")]
    Deserialization(String),
}

/// Response from GET /api/prices
#[derive(Debug, Clone, Deserialize)]
pub struct PricesResponse {
    pub prices: Vec<PriceEntry>,
    #[serde(default)]
    pub total_coins: Option<u64>,
}

/// One asset entry as the feed sends it.
///
/// The 24h change arrives under `24h_change` and/or `price_change_24h`
/// (the backend sends both); numeric fields may arrive as numbers,
/// strings, or null.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceEntry {
    pub symbol: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price_usd: f64,
    #[serde(rename = "24h_change", default, deserialize_with = "lenient_opt_f64")]
    pub change_24h: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub price_change_24h: Option<f64>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl PriceEntry {
    /// Collapse the wire entry into the display record
    pub fn into_record(self) -> PriceRecord {
        let change_24h = self.change_24h.or(self.price_change_24h).unwrap_or(0.0);
        PriceRecord {
            symbol: self.symbol,
            price_usd: self.price_usd,
            change_24h,
            last_updated: self.last_updated.as_deref().and_then(parse_feed_timestamp),
        }
    }
}

/// Response from GET /api/history/{symbol}
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub data_points: Option<u64>,
}

/// One (timestamp, price) sample as the feed sends it
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: f64,
}

impl HistoryEntry {
    /// A sample without a parseable timestamp keeps its price and falls
    /// back to now rather than holing the series.
    pub fn into_point(self) -> PricePoint {
        let timestamp = self
            .timestamp
            .as_deref()
            .and_then(parse_feed_timestamp)
            .unwrap_or_else(Utc::now);
        PricePoint {
            timestamp,
            price: self.price,
        }
    }
}

/// Response from GET /health
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub database_records: u64,
    #[serde(default)]
    pub tracked_coins: u64,
}

/// Parse the feed's timestamp strings: RFC 3339, Python `isoformat()`
/// without an offset, or SQLite's `%Y-%m-%d %H:%M:%S`. Naive values are
/// taken as UTC.
pub fn parse_feed_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
        }
    }
    None
}

/// Coerce a number, numeric string, or anything else to f64; garbage
/// and non-finite values become 0.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(coerce_f64(&Value::deserialize(deserializer)?).unwrap_or(0.0))
}

/// Like `lenient_f64`, but keeps null distinct so a fallback key can
/// take over.
fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        other => Some(coerce_f64(&other).unwrap_or(0.0)),
    })
}

fn coerce_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    parsed.is_finite().then_some(parsed)
}
