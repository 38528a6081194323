//! Display surface abstraction
//!
//! The renderer and the chart manager never talk to a terminal or a file
//! directly; they write into a [`DisplaySurface`]. The surface exposes two
//! addressable regions (a "last update" text slot and the coins grid
//! container) plus one chart slot per card of the current generation.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

/// Region id of the "last refreshed at" text slot
pub const REGION_LAST_UPDATE: &str = "last-update";
/// Container id of the coins grid
pub const CONTAINER_GRID: &str = "coins-grid";

/// Surface-level failures
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Failed to write chart image: {0}")]
    ChartWrite(String),
}

/// Handle to the chart placeholder of one rendered card.
/// Valid only for the surface generation it was resolved from; a stale
/// target is silently dropped on present.
#[derive(Debug, Clone)]
pub struct ChartTarget {
    pub symbol: String,
}

pub trait DisplaySurface: Send {
    /// Replace the text of an addressable region
    fn set_region_text(&mut self, region: &str, text: &str);

    /// Replace a container's content with a rendered fragment.
    /// `chart_slots` names the symbols whose cards carry a chart
    /// placeholder in this generation; slots of the previous generation
    /// are discarded.
    fn set_container_content(&mut self, container: &str, fragment: &str, chart_slots: &[String]);

    /// Resolve the chart target for a symbol. `None` when the current
    /// generation has no card for it.
    fn chart_target(&self, symbol: &str) -> Option<ChartTarget>;

    /// Commit a drawn chart (PNG bytes) into its target slot
    fn present_chart(&mut self, target: &ChartTarget, png: &[u8]) -> Result<(), SurfaceError>;
}

#[derive(Debug, Default)]
struct ChartSlot {
    png: Option<Vec<u8>>,
}

/// Terminal-backed surface: keeps regions and the grid in memory,
/// optionally echoes commits to stdout and persists chart PNGs to a
/// directory.
pub struct TermSurface {
    regions: HashMap<String, String>,
    containers: HashMap<String, String>,
    slots: HashMap<String, ChartSlot>,
    chart_dir: Option<PathBuf>,
    echo: bool,
}

impl TermSurface {
    pub fn new() -> Self {
        TermSurface {
            regions: HashMap::new(),
            containers: HashMap::new(),
            slots: HashMap::new(),
            chart_dir: None,
            echo: false,
        }
    }

    /// Print every grid commit to stdout
    pub fn with_echo(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Persist presented charts as `<dir>/<SYMBOL>.png`
    pub fn with_chart_dir(mut self, dir: PathBuf) -> Self {
        self.chart_dir = Some(dir);
        self
    }

    pub fn region_text(&self, region: &str) -> Option<&str> {
        self.regions.get(region).map(String::as_str)
    }

    pub fn grid_content(&self) -> &str {
        self.containers
            .get(CONTAINER_GRID)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// PNG bytes last presented into a symbol's slot, if any
    pub fn chart_png(&self, symbol: &str) -> Option<&[u8]> {
        self.slots
            .get(symbol)
            .and_then(|slot| slot.png.as_deref())
    }

    pub fn chart_slot_count(&self) -> usize {
        self.slots.len()
    }

    fn echo_grid(&self) {
        if let Some(text) = self.regions.get(REGION_LAST_UPDATE) {
            println!("{}", text);
        }
        println!("{}", self.grid_content());
    }
}

impl Default for TermSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySurface for TermSurface {
    fn set_region_text(&mut self, region: &str, text: &str) {
        self.regions.insert(region.to_string(), text.to_string());
    }

    fn set_container_content(&mut self, container: &str, fragment: &str, chart_slots: &[String]) {
        self.containers
            .insert(container.to_string(), fragment.to_string());
        if container == CONTAINER_GRID {
            self.slots = chart_slots
                .iter()
                .map(|symbol| (symbol.clone(), ChartSlot::default()))
                .collect();
        }
        if self.echo {
            self.echo_grid();
        }
    }

    fn chart_target(&self, symbol: &str) -> Option<ChartTarget> {
        if self.slots.contains_key(symbol) {
            Some(ChartTarget {
                symbol: symbol.to_string(),
            })
        } else {
            None
        }
    }

    fn present_chart(&mut self, target: &ChartTarget, png: &[u8]) -> Result<(), SurfaceError> {
        let Some(slot) = self.slots.get_mut(&target.symbol) else {
            // Target from an older generation; the grid has moved on.
            debug!("Dropping chart for {}: slot no longer present", target.symbol);
            return Ok(());
        };
        slot.png = Some(png.to_vec());

        if let Some(dir) = &self.chart_dir {
            let path = dir.join(format!("{}.png", target.symbol));
            fs::write(&path, png).map_err(|e| {
                SurfaceError::ChartWrite(format!("{}: {}", path.display(), e))
            })?;
            debug!("Chart for {} written to {}", target.symbol, path.display());
        }
        Ok(())
    }
}
