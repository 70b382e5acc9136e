//! # Highlight Marker
//!
//! The single transient marker shown after an address jump. It flashes
//! between a bright and a dim paint state every second and disappears
//! after ten seconds.
//!
//! ```text
//! show ──► bright ─1s─► dim ─1s─► bright ... ─10s─► hidden, data cleared
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::geo::Point;

pub const MARKER_LAYER_ID: &str = "geocoded-point";
pub const MARKER_SOURCE_ID: &str = "geocoded-point-source";

pub const FLASH_INTERVAL: Duration = Duration::from_millis(1000);
pub const MARKER_LIFETIME: Duration = Duration::from_millis(10_000);

pub const CIRCLE_OPACITY: &str = "circle-opacity";
pub const CIRCLE_STROKE_OPACITY: &str = "circle-stroke-opacity";

/// `(circle-opacity, circle-stroke-opacity)` for each flash phase.
const BRIGHT: (f64, f64) = (0.8, 1.0);
const DIM: (f64, f64) = (0.2, 0.3);

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarkerState {
    pub visible: bool,
    pub point: Option<Point>,
    /// Current flash phase; meaningful only while visible.
    pub bright: bool,
    /// Bumped on every activation so timers from an earlier cycle are ignored.
    pub generation: u64,
}

impl MarkerState {
    /// Starts a new flash cycle at `point` and returns its generation.
    pub fn activate(&mut self, point: Point) -> u64 {
        self.generation += 1;
        self.visible = true;
        self.point = Some(point);
        self.bright = true;
        self.generation
    }

    /// Flips the flash phase and returns the paint values to apply.
    pub fn toggle(&mut self) -> (f64, f64) {
        self.bright = !self.bright;
        self.paint()
    }

    pub fn paint(&self) -> (f64, f64) {
        if self.bright { BRIGHT } else { DIM }
    }

    pub fn hide(&mut self) {
        self.visible = false;
        self.point = None;
        self.bright = false;
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.visible && self.generation == generation
    }
}

/// Minimal GeoJSON `FeatureCollection` carrying marker points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    pub geometry: PointGeometry,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Point")]
pub struct PointGeometry {
    pub coordinates: Point,
}

impl FeatureCollection {
    pub fn empty() -> Self {
        Self { features: Vec::new() }
    }

    pub fn single_point(point: Point) -> Self {
        Self {
            features: vec![Feature {
                geometry: PointGeometry { coordinates: point },
                properties: serde_json::Map::new(),
            }],
        }
    }
}
