//! Geographic bounds and projection into percentage view space.
//!
//! The view is a unit square scaled to `[0, 100]` on both axes, with `y`
//! growing downward. The bounding box is re-derived from every snapshot so
//! the whole fleet always fills the canvas.

use serde::Serialize;

use crate::unit::Unit;

/// Fraction of each axis span added on both sides of the extrema.
pub const PADDING_FRACTION: f64 = 0.1;

/// Span substituted when every unit shares the same latitude or longitude.
pub const MIN_SPAN: f64 = 0.1;

/// Padded geographic rectangle used to normalize coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Default for BoundingBox {
    /// Box used when there are no units.
    fn default() -> Self {
        Self {
            min_lat: 0.0,
            max_lat: 1.0,
            min_lon: 0.0,
            max_lon: 1.0,
        }
    }
}

impl BoundingBox {
    /// Derive the padded box around a set of units.
    pub fn from_units(units: &[Unit]) -> Self {
        Self::from_points(units.iter().map(|u| (u.lat, u.lon)))
    }

    /// Derive the padded box around `(lat, lon)` points.
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut points = points.into_iter();
        let Some((lat0, lon0)) = points.next() else {
            return Self::default();
        };

        let (mut min_lat, mut max_lat, mut min_lon, mut max_lon) = (lat0, lat0, lon0, lon0);
        for (lat, lon) in points {
            min_lat = min_lat.min(lat);
            max_lat = max_lat.max(lat);
            min_lon = min_lon.min(lon);
            max_lon = max_lon.max(lon);
        }

        let lat_pad = padded_span(min_lat, max_lat) * PADDING_FRACTION;
        let lon_pad = padded_span(min_lon, max_lon) * PADDING_FRACTION;

        Self {
            min_lat: min_lat - lat_pad,
            max_lat: max_lat + lat_pad,
            min_lon: min_lon - lon_pad,
            max_lon: max_lon + lon_pad,
        }
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Project a point into this box's view space.
    pub fn project(&self, lat: f64, lon: f64) -> ViewPoint {
        project(lat, lon, self)
    }
}

fn padded_span(min: f64, max: f64) -> f64 {
    let span = max - min;
    if span == 0.0 { MIN_SPAN } else { span }
}

/// Position on the canvas, in percent of width (`x`) and height (`y`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ViewPoint {
    pub x: f64,
    pub y: f64,
}

impl ViewPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both coordinates within `[0, 100]`.
    pub fn in_view(&self) -> bool {
        (0.0..=100.0).contains(&self.x) && (0.0..=100.0).contains(&self.y)
    }

    /// Linear interpolation toward `to`; `t` is clamped to `[0, 1]`.
    pub fn lerp(self, to: ViewPoint, t: f64) -> ViewPoint {
        let t = t.clamp(0.0, 1.0);
        ViewPoint {
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
        }
    }
}

/// Map a geographic point into percentage view space.
///
/// Higher latitude maps to smaller `y`. Points outside `bbox` produce values
/// outside `[0, 100]`; callers clip.
pub fn project(lat: f64, lon: f64, bbox: &BoundingBox) -> ViewPoint {
    ViewPoint {
        x: (lon - bbox.min_lon) / bbox.lon_span() * 100.0,
        y: (bbox.max_lat - lat) / bbox.lat_span() * 100.0,
    }
}
