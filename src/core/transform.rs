//! # Coordinate Frames
//!
//! Converts between the global GPS frame (WGS-84) and the regionally
//! offset frame used by the tile provider (GCJ-02). Outside the region's
//! bounding box the two frames coincide and points pass through untouched.
//!
//! `to_global_frame` evaluates the offset at its *input* (a regional
//! point) instead of at the unknown global point, so it is only an
//! approximate inverse. Round trips drift by up to ~1e-4 degrees near
//! the edges of the region.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::geo::Point;

/// Semi-major axis of the Krasovsky 1940 ellipsoid (meters).
const A: f64 = 6378245.0;
/// Squared eccentricity of the same ellipsoid.
#[allow(clippy::excessive_precision)]
const EE: f64 = 0.00669342162296594323;

const MIN_LON: f64 = 72.004;
const MAX_LON: f64 = 137.8347;
const MIN_LAT: f64 = 0.8293;
const MAX_LAT: f64 = 55.8271;

/// Which frame a coordinate is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frame {
    /// GPS / WGS-84.
    #[default]
    Wgs84,
    /// Regional offset frame (GCJ-02) used by the tile provider.
    Gcj02,
}

impl Frame {
    /// Expresses `point` (given in `self`) in the regional display frame.
    pub fn to_display(self, point: Point) -> Point {
        match self {
            Frame::Wgs84 => to_regional_frame(point),
            Frame::Gcj02 => point,
        }
    }
}

/// WGS-84 → GCJ-02.
pub fn to_regional_frame(point: Point) -> Point {
    if out_of_region(point) {
        return point;
    }
    let (d_lon, d_lat) = delta(point.lon, point.lat);
    Point::new(point.lon + d_lon, point.lat + d_lat)
}

/// GCJ-02 → WGS-84 (approximate; see module docs).
pub fn to_global_frame(point: Point) -> Point {
    if out_of_region(point) {
        return point;
    }
    let (d_lon, d_lat) = delta(point.lon, point.lat);
    Point::new(point.lon - d_lon, point.lat - d_lat)
}

/// True when the point lies outside the corrected region, including
/// non-finite input.
pub fn out_of_region(point: Point) -> bool {
    !(MIN_LON..=MAX_LON).contains(&point.lon) || !(MIN_LAT..=MAX_LAT).contains(&point.lat)
}

/// Offset in degrees `(d_lon, d_lat)` at the given position.
fn delta(lon: f64, lat: f64) -> (f64, f64) {
    let mut d_lat = transform_lat(lon - 105.0, lat - 35.0);
    let mut d_lon = transform_lon(lon - 105.0, lat - 35.0);

    let rad_lat = lat / 180.0 * PI;
    let mut magic = rad_lat.sin();
    magic = 1.0 - EE * magic * magic;

    let sqrt_magic = magic.sqrt();
    d_lat = (d_lat * 180.0) / ((A * (1.0 - EE)) / (magic * sqrt_magic) * PI);
    d_lon = (d_lon * 180.0) / (A / sqrt_magic * rad_lat.cos() * PI);

    (d_lon, d_lat)
}

// Operation order below mirrors the published transform term for term;
// reordering changes the low bits.

fn transform_lon(x: f64, y: f64) -> f64 {
    let mut ret = 300.0 + x + 2.0 * y + 0.1 * x * x + 0.1 * x * y + 0.1 * x.abs().sqrt();
    ret += (20.0 * (6.0 * x * PI).sin() + 20.0 * (2.0 * x * PI).sin()) * 2.0 / 3.0;
    ret += (20.0 * (x * PI).sin() + 40.0 * (x / 3.0 * PI).sin()) * 2.0 / 3.0;
    ret += (150.0 * (x / 12.0 * PI).sin() + 300.0 * (x / 30.0 * PI).sin()) * 2.0 / 3.0;
    ret
}

fn transform_lat(x: f64, y: f64) -> f64 {
    let mut ret = -100.0 + 2.0 * x + 3.0 * y + 0.2 * y * y + 0.1 * x * y + 0.2 * x.abs().sqrt();
    ret += (20.0 * (6.0 * x * PI).sin() + 20.0 * (2.0 * x * PI).sin()) * 2.0 / 3.0;
    ret += (20.0 * (y * PI).sin() + 40.0 * (y / 3.0 * PI).sin()) * 2.0 / 3.0;
    ret += (160.0 * (y / 12.0 * PI).sin() + 320.0 * (y * PI / 30.0).sin()) * 2.0 / 3.0;
    ret
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point, b: Point, eps: f64) {
        let d_lon = (a.lon - b.lon).abs();
        let d_lat = (a.lat - b.lat).abs();
        assert!(
            d_lon <= eps && d_lat <= eps,
            "expected {a:?} ~= {b:?} (diff {d_lon}, {d_lat})"
        );
    }

    #[test]
    fn test_outside_region_is_identity() {
        let samples = [
            Point::new(-122.4194, 37.7749),
            Point::new(2.3522, 48.8566),
            Point::new(72.0, 30.0),
            Point::new(137.9, 30.0),
            Point::new(110.0, 0.8),
            Point::new(110.0, 55.9),
        ];
        for p in samples {
            assert_eq!(to_regional_frame(p), p);
            assert_eq!(to_global_frame(p), p);
        }
    }

    #[test]
    fn test_non_finite_input_passes_through() {
        let p = Point::new(f64::NAN, 30.0);
        let out = to_regional_frame(p);
        assert!(out.lon.is_nan());
        assert_eq!(out.lat, 30.0);
    }

    #[test]
    fn test_beijing_offset_matches_reference() {
        // Tiananmen, WGS-84 → GCJ-02.
        let gcj = to_regional_frame(Point::new(116.391_35, 39.907_723));
        assert_close(gcj, Point::new(116.397_591_236_110_09, 39.909_124_309_768_316), 1e-9);
    }

    #[test]
    fn test_offset_is_a_few_hundred_meters() {
        let wgs = Point::new(119.921786, 28.451993);
        let gcj = to_regional_frame(wgs);
        let d_lon = (gcj.lon - wgs.lon).abs();
        let d_lat = (gcj.lat - wgs.lat).abs();
        assert!(d_lon > 1e-4 && d_lon < 1e-2, "d_lon = {d_lon}");
        assert!(d_lat > 1e-4 && d_lat < 1e-2, "d_lat = {d_lat}");
    }

    #[test]
    fn test_inverse_is_approximate_but_close() {
        for p in [
            Point::new(116.397428, 39.90923),
            Point::new(119.921786, 28.451993),
            Point::new(121.4737, 31.2304),
            Point::new(104.0668, 30.5728),
        ] {
            let regional = to_regional_frame(p);
            let again = to_regional_frame(to_global_frame(regional));
            assert_close(again, regional, 1e-4);

            let back = to_global_frame(regional);
            assert_close(back, p, 1e-4);
            // The inverse evaluates the offset at the regional point, so it is not exact.
            assert_ne!(back, p);
        }
    }

    #[test]
    fn test_frame_to_display() {
        let p = Point::new(116.397428, 39.90923);
        assert_eq!(Frame::Gcj02.to_display(p), p);
        assert_eq!(Frame::Wgs84.to_display(p), to_regional_frame(p));
    }
}
