//! Sparkline chart lifecycle
//!
//! Owns one chart instance per symbol and redraws it as polls come in.
//! A chart binds to the card slot the renderer registered for the
//! current grid generation; cards that were not rendered this cycle get
//! no chart, and symbols that left the feed get theirs released.

use std::collections::HashMap;
use std::fs;

use chrono::{Duration, Utc};
use plotters::prelude::*;
use tracing::{debug, error};

use crate::models::{PricePoint, Trend};
use crate::surface::DisplaySurface;

/// Rendered sparkline size in pixels
pub const CHART_WIDTH: u32 = 320;
pub const CHART_HEIGHT: u32 = 120;

const UP_COLOR: RGBColor = RGBColor(39, 174, 96);
const DOWN_COLOR: RGBColor = RGBColor(231, 76, 60);

/// A live chart bound to one symbol's card
#[derive(Debug, Clone)]
pub struct ChartInstance {
    pub trend: Trend,
    pub points: usize,
    pub png: Vec<u8>,
}

/// Symbol -> chart bindings, at most one live instance per symbol
pub struct ChartManager {
    charts: HashMap<String, ChartInstance>,
    width: u32,
    height: u32,
}

impl ChartManager {
    pub fn new(width: u32, height: u32) -> Self {
        ChartManager {
            charts: HashMap::new(),
            width,
            height,
        }
    }

    /// Redraw the chart bound to `symbol` from a fresh history.
    ///
    /// No-ops when the current grid has no card for the symbol, and on
    /// an empty history (a previously drawn chart stays in place). Any
    /// prior instance is released before the new one is bound. Drawing
    /// failures are logged and contained to this symbol.
    pub fn update_chart(
        &mut self,
        surface: &mut dyn DisplaySurface,
        symbol: &str,
        history: &[PricePoint],
    ) {
        let Some(target) = surface.chart_target(symbol) else {
            debug!("No chart slot for {} in the current grid", symbol);
            return;
        };
        if history.is_empty() {
            debug!("Empty history for {}, keeping previous chart", symbol);
            return;
        }

        if let Some(prev) = self.charts.remove(symbol) {
            debug!(
                "Released previous chart for {} ({} point(s))",
                symbol, prev.points
            );
        }

        match render_sparkline(history, self.width, self.height) {
            Ok((png, trend)) => {
                if let Err(e) = surface.present_chart(&target, &png) {
                    error!("Failed to present chart for {}: {}", symbol, e);
                    return;
                }
                self.charts.insert(
                    symbol.to_string(),
                    ChartInstance {
                        trend,
                        points: history.len(),
                        png,
                    },
                );
            }
            Err(e) => error!("Error drawing chart for {}: {}", symbol, e),
        }
    }

    /// Tear down bindings for symbols absent from the current poll
    pub fn release_missing(&mut self, symbols: &[String]) {
        let before = self.charts.len();
        self.charts
            .retain(|symbol, _| symbols.iter().any(|s| s == symbol));
        let dropped = before - self.charts.len();
        if dropped > 0 {
            debug!("Released {} chart(s) for departed symbols", dropped);
        }
    }

    pub fn chart(&self, symbol: &str) -> Option<&ChartInstance> {
        self.charts.get(symbol)
    }

    pub fn chart_count(&self) -> usize {
        self.charts.len()
    }
}

/// Draw a filled sparkline and return it as PNG bytes plus the trend
/// that picked its styling.
fn render_sparkline(
    points: &[PricePoint],
    width: u32,
    height: u32,
) -> Result<(Vec<u8>, Trend), String> {
    let prices: Vec<f64> = points.iter().map(|p| p.price).collect();
    let (y_min, y_max) = padded_bounds(&prices);
    let trend = series_trend(&prices);
    let line_color = match trend {
        Trend::Up => UP_COLOR,
        Trend::Down => DOWN_COLOR,
    };

    let mut x_min = points[0].timestamp;
    let mut x_max = points[points.len() - 1].timestamp;
    if x_min == x_max {
        // a single-sample series still needs a non-degenerate x range
        x_min = x_min - Duration::seconds(1);
        x_max = x_max + Duration::seconds(1);
    }

    // Use a temporary file path for BitMapBackend
    let temp_file = format!(
        "{}/coindeck_chart_{}.png",
        std::env::temp_dir().display(),
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    );

    {
        let backend = BitMapBackend::new(&temp_file, (width, height));
        let root = backend.into_drawing_area();
        root.fill(&WHITE)
            .map_err(|e| format!("Failed to fill canvas: {}", e))?;

        // No mesh, no labels: the card provides the context.
        let mut chart = ChartBuilder::on(&root)
            .margin(4)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)
            .map_err(|e| format!("Failed to build chart: {}", e))?;

        chart
            .draw_series(AreaSeries::new(
                points.iter().map(|p| (p.timestamp, p.price)),
                y_min,
                &line_color.mix(0.1),
            ))
            .map_err(|e| format!("Failed to draw fill: {}", e))?;

        chart
            .draw_series(LineSeries::new(
                points.iter().map(|p| (p.timestamp, p.price)),
                line_color.stroke_width(2),
            ))
            .map_err(|e| format!("Failed to draw line: {}", e))?;

        root.present()
            .map_err(|e| format!("Failed to render chart: {}", e))?;
    }

    let image_data =
        fs::read(&temp_file).map_err(|e| format!("Failed to read chart file: {}", e))?;
    let _ = fs::remove_file(&temp_file);

    Ok((image_data, trend))
}

/// y-range with 10% headroom on both sides; a flat series is widened by
/// a small epsilon so the range never collapses
fn padded_bounds(prices: &[f64]) -> (f64, f64) {
    let min_price = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let max_price = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let price_range = (max_price - min_price).max(1e-8);
    let padding = price_range * 0.1;
    (min_price - padding, max_price + padding)
}

/// Up iff the window closes at or above where it opened
fn series_trend(prices: &[f64]) -> Trend {
    match (prices.first(), prices.last()) {
        (Some(first), Some(last)) if last < first => Trend::Down,
        _ => Trend::Up,
    }
}
