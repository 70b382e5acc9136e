//! # Geographic Primitives
//!
//! `Point` and `Geometry` are the values every other module passes around.
//! Both serialize in the GeoJSON nested-array form so they can be read
//! straight out of layer or table payloads:
//!
//! ```text
//! Point                 [lon, lat]
//! LineString            [[lon, lat], ...]
//! Polygon               [[[lon, lat], ...], ...]        // rings
//! MultiLineString       [[[lon, lat], ...], ...]        // lines
//! MultiPolygon          [[[[lon, lat], ...], ...], ...] // polygons
//! ```

use serde::{Deserialize, Serialize};

/// A `(longitude, latitude)` pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub lon: f64,
    pub lat: f64,
}

impl Point {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }
}

impl From<[f64; 2]> for Point {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.lon, p.lat]
    }
}

impl From<(f64, f64)> for Point {
    fn from((lon, lat): (f64, f64)) -> Self {
        Self { lon, lat }
    }
}

/// The five geometry shapes the navigator knows how to frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Point),
    LineString(Vec<Point>),
    Polygon(Vec<Vec<Point>>),
    MultiLineString(Vec<Vec<Point>>),
    MultiPolygon(Vec<Vec<Vec<Point>>>),
}

impl Geometry {
    /// Every vertex of the geometry, flattened. Polygon closing vertices
    /// are included as-is.
    pub fn vertices(&self) -> Vec<Point> {
        match self {
            Geometry::Point(p) => vec![*p],
            Geometry::LineString(line) => line.clone(),
            Geometry::Polygon(rings) | Geometry::MultiLineString(rings) => {
                rings.iter().flatten().copied().collect()
            }
            Geometry::MultiPolygon(polygons) => {
                polygons.iter().flatten().flatten().copied().collect()
            }
        }
    }

    /// Axis-aligned bounds over the finite vertices. `None` when the
    /// geometry has no usable vertex.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.vertices().iter().filter(|p| p.is_finite()))
    }
}

/// Axis-aligned lon/lat box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bounds = Bounds {
            min: first,
            max: first,
        };
        for p in iter {
            bounds.min.lon = bounds.min.lon.min(p.lon);
            bounds.min.lat = bounds.min.lat.min(p.lat);
            bounds.max.lon = bounds.max.lon.max(p.lon);
            bounds.max.lat = bounds.max.lat.max(p.lat);
        }
        Some(bounds)
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.lon + self.max.lon) / 2.0,
            (self.min.lat + self.max.lat) / 2.0,
        )
    }

    /// Diagonal length in degrees.
    pub fn diagonal(&self) -> f64 {
        (self.max.lon - self.min.lon).hypot(self.max.lat - self.min.lat)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.lon >= self.min.lon && p.lon <= self.max.lon && p.lat >= self.min.lat && p.lat <= self.max.lat
    }
}
