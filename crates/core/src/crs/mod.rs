//! Coordinate reference systems, distance metrics and the transform contract

mod metric;

pub use metric::{DistanceMetric, EQUATORIAL_RADIUS, POLAR_RADIUS, radius_earth};

use crate::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

/// EPSG codes of common geographic (longitude/latitude) systems
const GEOGRAPHIC_EPSG: &[u32] = &[4326, 4269, 4267, 4258, 4283, 4617, 4148, 4674, 4019, 4230];

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation (primary)
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
    /// PROJ string if available
    proj: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
            proj: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
            proj: None,
        }
    }

    /// Create a CRS from a PROJ string
    pub fn from_proj(proj: impl Into<String>) -> Self {
        Self {
            wkt: None,
            epsg: None,
            proj: Some(proj.into()),
        }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Get PROJ string
    pub fn proj(&self) -> Option<&str> {
        self.proj.as_deref()
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }
        if let (Some(a), Some(b)) = (&self.proj, &other.proj) {
            return a.split_whitespace().eq(b.split_whitespace());
        }
        false
    }

    /// Whether coordinates are longitude/latitude in degrees
    pub fn is_geographic(&self) -> bool {
        if let Some(code) = self.epsg {
            return GEOGRAPHIC_EPSG.contains(&code);
        }
        if let Some(wkt) = &self.wkt {
            let head = wkt.trim_start();
            return head.starts_with("GEOGCS") || head.starts_with("GEOGCRS");
        }
        if let Some(proj) = &self.proj {
            return proj.contains("+proj=longlat") || proj.contains("+proj=latlong");
        }
        false
    }

    /// Distance metric appropriate for coordinates in this CRS
    pub fn metric(&self) -> DistanceMetric {
        if self.is_geographic() {
            DistanceMetric::Geodesic
        } else {
            DistanceMetric::Cartesian
        }
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(proj) = &self.proj {
            return proj.clone();
        }
        if let Some(wkt) = &self.wkt {
            let end = wkt.char_indices().nth(50).map_or(wkt.len(), |(i, _)| i);
            return format!("WKT:{}", &wkt[..end]);
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

/// Moves query coordinates into the raster's coordinate system.
///
/// Implementations wrap whatever geodesy library the caller has at hand; a
/// `None` result marks the point as untransformable and it resolves to the
/// no-data sentinel instead of aborting the run.
pub trait CoordinateTransform: Send + Sync {
    fn apply(&self, p: Point) -> Option<Point>;
}

impl<F> CoordinateTransform for F
where
    F: Fn(Point) -> Option<Point> + Send + Sync,
{
    fn apply(&self, p: Point) -> Option<Point> {
        self(p)
    }
}
