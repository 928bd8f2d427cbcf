//! The narrow pixel-query boundary the interpolation engine consumes

use crate::crs::CRS;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Axis-aligned box in map coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Extent {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self { xmin, ymin, xmax, ymax }
    }

    /// Box of half widths `(hx, hy)` centred on `(x, y)`
    pub fn around(x: f64, y: f64, hx: f64, hy: f64) -> Self {
        Self::new(x - hx, y - hy, x + hx, y + hy)
    }

    /// Smallest box containing every coordinate; an inverted box when empty
    pub fn enclosing(coords: impl Iterator<Item = (f64, f64)>) -> Self {
        coords.fold(
            Self::new(f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |e, (x, y)| Self::new(e.xmin.min(x), e.ymin.min(y), e.xmax.max(x), e.ymax.max(y)),
        )
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Whether the box holds at least one coordinate
    pub fn is_valid(&self) -> bool {
        self.xmin <= self.xmax && self.ymin <= self.ymax
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }

    /// Whether `other` lies entirely inside this box
    pub fn covers(&self, other: &Extent) -> bool {
        other.xmin >= self.xmin
            && other.xmax <= self.xmax
            && other.ymin >= self.ymin
            && other.ymax <= self.ymax
    }

    pub fn intersects(&self, other: &Extent) -> bool {
        self.xmin <= other.xmax
            && other.xmin <= self.xmax
            && self.ymin <= other.ymax
            && other.ymin <= self.ymax
    }

    /// Grow the box by `dx` / `dy` on each side
    pub fn expand(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.xmin - dx, self.ymin - dy, self.xmax + dx, self.ymax + dy)
    }
}

/// One raster cell as seen through a [`RasterSampler`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelSample {
    /// Cell centre
    pub x: f64,
    pub y: f64,
    /// Raw cell value; meaningless when `valid` is false
    pub value: f64,
    /// False for no-data cells and coordinates outside the raster
    pub valid: bool,
}

impl PixelSample {
    pub fn invalid(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            value: f64::NAN,
            valid: false,
        }
    }
}

/// Pixel access consumed by the interpolation engine.
///
/// Category-coded and continuous rasters look identical here; whether a
/// value is used directly or as a lookup key is decided by the caller.
pub trait RasterSampler: Send + Sync {
    /// Value and validity of the cell containing `(x, y)`
    fn value_at(&self, x: f64, y: f64) -> Result<PixelSample>;

    /// Append every cell whose area intersects `area` to `out`
    fn values_in_window(&self, area: &Extent, out: &mut Vec<PixelSample>) -> Result<()>;

    /// Native cell size in coordinate units
    fn native_cell_size(&self) -> f64;

    fn extent(&self) -> Extent;

    fn crs(&self) -> Option<&CRS>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_enclosing() {
        let e = Extent::enclosing([(1.0, 5.0), (-2.0, 3.0), (4.0, -1.0)].into_iter());
        assert_eq!(e, Extent::new(-2.0, -1.0, 4.0, 5.0));
        assert!(e.is_valid());
        assert!(!Extent::enclosing(std::iter::empty()).is_valid());
    }

    #[test]
    fn test_extent_relations() {
        let outer = Extent::new(0.0, 0.0, 10.0, 10.0);
        let inner = Extent::around(5.0, 5.0, 1.0, 2.0);
        assert!(outer.covers(&inner));
        assert!(!inner.covers(&outer));
        assert!(outer.intersects(&Extent::new(9.0, 9.0, 20.0, 20.0)));
        assert!(!outer.intersects(&Extent::new(11.0, 0.0, 20.0, 5.0)));
        assert!(outer.expand(1.0, 1.0).contains(-0.5, 10.5));
    }
}
