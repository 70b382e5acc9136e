//! # Geometry Framing
//!
//! Turns an arbitrary geometry into a camera target: a representative
//! point (bounding-box midpoint) and an integer zoom level derived from
//! the bounding-box diagonal.
//!
//! Nothing here fails. Empty or entirely non-finite geometry frames the
//! fallback view instead.

use super::geo::{Geometry, Point};

/// Zoom used for points and zero-extent geometry. Also the ceiling for
/// any framed geometry, so zoom never increases with extent.
pub const POINT_ZOOM: u8 = 16;
/// Hard zoom limits of the rendering surface.
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 18;

/// Framed when a geometry has no usable vertex.
pub const FALLBACK_POINT: Point = Point::new(116.397428, 39.90923);
pub const FALLBACK_ZOOM: u8 = 12;

/// A camera position: where to look and how close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTarget {
    pub center: Point,
    pub zoom: u8,
}

/// Centroid and framing zoom in one pass.
pub fn frame(geometry: &Geometry) -> CameraTarget {
    CameraTarget {
        center: centroid(geometry),
        zoom: framing_zoom(geometry),
    }
}

pub fn centroid(geometry: &Geometry) -> Point {
    match geometry {
        Geometry::Point(p) if p.is_finite() => *p,
        Geometry::Point(_) => FALLBACK_POINT,
        Geometry::LineString(_)
        | Geometry::Polygon(_)
        | Geometry::MultiLineString(_)
        | Geometry::MultiPolygon(_) => geometry
            .bounds()
            .map(|b| b.center())
            .unwrap_or(FALLBACK_POINT),
    }
}

pub fn framing_zoom(geometry: &Geometry) -> u8 {
    match geometry {
        Geometry::Point(p) if p.is_finite() => POINT_ZOOM,
        Geometry::Point(_) => FALLBACK_ZOOM,
        Geometry::LineString(_)
        | Geometry::Polygon(_)
        | Geometry::MultiLineString(_)
        | Geometry::MultiPolygon(_) => match geometry.bounds() {
            Some(bounds) => zoom_for_extent(bounds.diagonal()),
            None => FALLBACK_ZOOM,
        },
    }
}

/// Maps a bounding-box diagonal (degrees) to a zoom level.
///
/// Each zoom step halves the visible span; one level of padding keeps
/// the whole extent on screen. Non-increasing in `diagonal`.
pub fn zoom_for_extent(diagonal: f64) -> u8 {
    if diagonal <= 0.0 {
        return POINT_ZOOM;
    }
    if !diagonal.is_finite() {
        return MIN_ZOOM;
    }
    let level = (360.0 / diagonal).log2().floor() - 1.0;
    level.clamp(MIN_ZOOM as f64, POINT_ZOOM as f64) as u8
}
