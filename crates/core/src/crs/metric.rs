//! Distance computation in the raster's coordinate system

use crate::Point;
use serde::{Deserialize, Serialize};

/// WGS84 semi-major axis (m)
pub const EQUATORIAL_RADIUS: f64 = 6_378_137.0;
/// WGS84 semi-minor axis (m)
pub const POLAR_RADIUS: f64 = 6_356_752.3142;

/// Smallest cosine used when widening longitude spans near the poles
const MIN_COS_LAT: f64 = 1e-6;

/// Earth radius at a latitude given in degrees
///
/// R(φ) = sqrt(((a²cosφ)² + (b²sinφ)²) / ((a cosφ)² + (b sinφ)²))
pub fn radius_earth(latitude: f64) -> f64 {
    let (s, c) = latitude.to_radians().sin_cos();
    let a = EQUATORIAL_RADIUS;
    let b = POLAR_RADIUS;
    let num = (a * a * c).powi(2) + (b * b * s).powi(2);
    let den = (a * c).powi(2) + (b * s).powi(2);
    (num / den).sqrt()
}

/// How distances are measured between two coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Euclidean distance in coordinate units
    #[default]
    Cartesian,
    /// Haversine distance in metres; coordinates are longitude/latitude degrees
    Geodesic,
}

impl DistanceMetric {
    /// Distance between two points
    pub fn distance(self, a: Point, b: Point) -> f64 {
        match self {
            DistanceMetric::Cartesian => (a.x - b.x).hypot(a.y - b.y),
            DistanceMetric::Geodesic => {
                let r = radius_earth(0.5 * (a.y + b.y));
                let phi1 = a.y.to_radians();
                let phi2 = b.y.to_radians();
                let dphi = phi2 - phi1;
                let dlambda = (b.x - a.x).to_radians();
                let h = (dphi * 0.5).sin().powi(2)
                    + phi1.cos() * phi2.cos() * (dlambda * 0.5).sin().powi(2);
                2.0 * r * h.sqrt().min(1.0).asin()
            }
        }
    }

    /// Coordinate-unit half widths `(dx, dy)` of a box that contains every
    /// point within `radius` (metric units) of `p`.
    pub fn search_half_widths(self, p: Point, radius: f64) -> (f64, f64) {
        match self {
            DistanceMetric::Cartesian => (radius, radius),
            DistanceMetric::Geodesic => {
                let r = radius_earth(p.y);
                let dlat = (radius / r).to_degrees();
                let lat_edge = (p.y.abs() + dlat).min(90.0);
                let cos_lat = lat_edge.to_radians().cos().max(MIN_COS_LAT);
                let dlon = (radius / (r * cos_lat)).to_degrees().min(180.0);
                (dlon, dlat)
            }
        }
    }

    /// A raster cell size expressed in metric units at `p`
    pub fn cell_size_at(self, p: Point, cell: f64) -> f64 {
        match self {
            DistanceMetric::Cartesian => cell,
            DistanceMetric::Geodesic => cell.to_radians() * radius_earth(p.y),
        }
    }

    /// Local `(east, north)` offset of `q` from `p` in metric units
    pub fn offset(self, p: Point, q: Point) -> (f64, f64) {
        match self {
            DistanceMetric::Cartesian => (q.x - p.x, q.y - p.y),
            DistanceMetric::Geodesic => {
                let mid = 0.5 * (p.y + q.y);
                let r = radius_earth(mid);
                let east = (q.x - p.x).to_radians() * r * mid.to_radians().cos();
                let north = (q.y - p.y).to_radians() * r;
                (east, north)
            }
        }
    }
}
