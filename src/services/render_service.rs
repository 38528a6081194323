//! Card grid rendering
//!
//! Turns one poll's price records into the text fragment committed to
//! the grid container, one card per record in input order. Card
//! rendering and the error banner are mutually exclusive writes to the
//! same container.

use tracing::debug;

use crate::models::{PriceRecord, Trend};
use crate::services::format_service;
use crate::surface::{DisplaySurface, CONTAINER_GRID};

const CARD_WIDTH: usize = 30;

/// Render one card per record and register its chart slot
pub fn render(surface: &mut dyn DisplaySurface, records: &[PriceRecord]) {
    let mut fragment = String::new();
    let mut chart_slots = Vec::with_capacity(records.len());

    for record in records {
        fragment.push_str(&card_fragment(record));
        fragment.push('\n');
        chart_slots.push(record.symbol.clone());
    }

    debug!("Rendering {} card(s)", records.len());
    surface.set_container_content(CONTAINER_GRID, &fragment, &chart_slots);
}

/// Replace the whole grid with a single error banner
pub fn show_error(surface: &mut dyn DisplaySurface, message: &str) {
    surface.set_container_content(CONTAINER_GRID, &format!("⚠ {}\n", message), &[]);
}

fn card_fragment(record: &PriceRecord) -> String {
    let change = format_service::format_change(record.change_24h);
    let arrow = match change.trend {
        Trend::Up => "↗",
        Trend::Down => "↘",
    };
    let price = format_service::format_price(record.price_usd);
    let updated = format_service::format_clock_time(record.last_updated);

    let mut card = String::new();
    card.push_str(&format!("{:<10} {} {}\n", record.symbol, arrow, change.text));
    card.push_str(&format!("${}\n", price));
    card.push_str(&format!("[chart {}]\n", record.symbol));
    card.push_str(&format!("Updated: {}\n", updated));
    card.push_str(&"-".repeat(CARD_WIDTH));
    card.push('\n');
    card
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::TermSurface;
    use chrono::{TimeZone, Utc};

    fn record(symbol: &str, price_usd: f64, change_24h: f64) -> PriceRecord {
        PriceRecord {
            symbol: symbol.to_string(),
            price_usd,
            change_24h,
            last_updated: Some(Utc.with_ymd_and_hms(2025, 10, 7, 14, 5, 0).unwrap()),
        }
    }

    #[test]
    fn test_render_empty_list() {
        let mut surface = TermSurface::new();
        render(&mut surface, &[]);
        assert_eq!(surface.grid_content(), "");
        assert_eq!(surface.chart_slot_count(), 0);
    }

    #[test]
    fn test_render_positive_card() {
        let mut surface = TermSurface::new();
        render(&mut surface, &[record("BTC", 65000.5, 2.345)]);
        let grid = surface.grid_content();
        assert!(grid.contains("BTC"));
        assert!(grid.contains("$65,000.50"));
        assert!(grid.contains("↗ +2.35%"));
        assert!(surface.chart_target("BTC").is_some());
    }

    #[test]
    fn test_render_negative_card() {
        let mut surface = TermSurface::new();
        render(&mut surface, &[record("ETH", 0.00012345, -1.1)]);
        let grid = surface.grid_content();
        assert!(grid.contains("$0.000123"));
        assert!(grid.contains("↘ -1.10%"));
    }

    #[test]
    fn test_render_preserves_input_order() {
        let mut surface = TermSurface::new();
        render(
            &mut surface,
            &[record("ETH", 2500.0, 0.5), record("BTC", 65000.5, 2.345)],
        );
        let grid = surface.grid_content();
        assert!(grid.find("ETH").unwrap() < grid.find("BTC").unwrap());
        assert_eq!(surface.chart_slot_count(), 2);
    }

    #[test]
    fn test_show_error_replaces_cards() {
        let mut surface = TermSurface::new();
        render(&mut surface, &[record("BTC", 65000.5, 2.345)]);
        show_error(&mut surface, "Failed to load prices. Please refresh the page.");
        let grid = surface.grid_content();
        assert!(grid.contains("Failed to load prices. Please refresh the page."));
        assert!(!grid.contains("BTC"));
        assert_eq!(surface.chart_slot_count(), 0);
    }

    #[test]
    fn test_missing_timestamp_renders_placeholder() {
        let mut surface = TermSurface::new();
        let mut rec = record("DOGE", 0.2, 1.0);
        rec.last_updated = None;
        render(&mut surface, &[rec]);
        assert!(surface.grid_content().contains("Updated: —"));
    }
}
