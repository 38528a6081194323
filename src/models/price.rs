//! Price feed models

use chrono::{DateTime, Utc};

use crate::models::chart::Trend;

/// One asset's current quote, produced fresh each poll cycle
#[derive(Debug, Clone)]
pub struct PriceRecord {
    pub symbol: String,
    pub price_usd: f64,
    pub change_24h: f64,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Formatted 24h change ready for display
#[derive(Debug, Clone)]
pub struct ChangeDisplay {
    pub text: String,
    pub trend: Trend,
}
