//! Affine geotransformation for rasters

use super::Extent;
use serde::{Deserialize, Serialize};

/// Affine transformation coefficients for georeferencing rasters.
///
/// Converts between pixel coordinates (col, row) and map coordinates (x, y):
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// For north-up images, `row_rotation` and `col_rotation` are typically 0,
/// and `pixel_height` is negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Pixel width (cell size in X direction)
    pub pixel_width: f64,
    /// Pixel height (cell size in Y direction, usually negative)
    pub pixel_height: f64,
    /// Rotation about X axis (usually 0)
    pub row_rotation: f64,
    /// Rotation about Y axis (usually 0)
    pub col_rotation: f64,
}

/// Inclusive pixel index ranges covered by a coordinate box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl PixelWindow {
    /// Number of pixels in the window
    pub fn pixel_count(&self) -> usize {
        (self.row_end - self.row_start + 1) * (self.col_end - self.col_start + 1)
    }
}

impl GeoTransform {
    /// Create a new GeoTransform with no rotation (north-up image)
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Convert pixel coordinates to map coordinates
    ///
    /// Returns the coordinates of the pixel center
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Convert pixel coordinates to map coordinates (top-left corner)
    pub fn pixel_to_geo_corner(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64, row as f64)
    }

    fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_width + row * self.row_rotation;
        let y = self.origin_y + col * self.col_rotation + row * self.pixel_height;
        (x, y)
    }

    /// Convert map coordinates to pixel coordinates
    ///
    /// Returns fractional pixel coordinates; use `.floor()` to get integer indices
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;

        if det.abs() < 1e-300 {
            return (f64::NAN, f64::NAN);
        }

        let dx = x - self.origin_x;
        let dy = y - self.origin_y;

        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (-self.col_rotation * dx + self.pixel_width * dy) / det;

        (col, row)
    }

    /// Integer pixel containing a map coordinate, if inside a `cols` x `rows` grid
    pub fn pixel_at(&self, x: f64, y: f64, cols: usize, rows: usize) -> Option<(usize, usize)> {
        let (col, row) = self.geo_to_pixel(x, y);
        if !(col.is_finite() && row.is_finite()) || col < 0.0 || row < 0.0 {
            return None;
        }
        let (col, row) = (col.floor() as usize, row.floor() as usize);
        (col < cols && row < rows).then_some((col, row))
    }

    /// Get the cell size (assumes square pixels and no rotation)
    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Check if this is a north-up image (no rotation)
    pub fn is_north_up(&self) -> bool {
        self.row_rotation.abs() < 1e-10
            && self.col_rotation.abs() < 1e-10
            && self.pixel_height < 0.0
    }

    /// Calculate the bounding box for a raster of given dimensions
    pub fn bounds(&self, width: usize, height: usize) -> Extent {
        let corners = [
            self.pixel_to_geo_corner(0, 0),
            self.pixel_to_geo_corner(width, 0),
            self.pixel_to_geo_corner(0, height),
            self.pixel_to_geo_corner(width, height),
        ];
        Extent::enclosing(corners.into_iter())
    }

    /// Pixels of a `cols` x `rows` grid whose area intersects `area`, or `None`
    /// when the box misses the grid entirely.
    pub fn pixel_window(&self, area: &Extent, cols: usize, rows: usize) -> Option<PixelWindow> {
        if cols == 0 || rows == 0 {
            return None;
        }
        let corners = [
            self.geo_to_pixel(area.xmin, area.ymin),
            self.geo_to_pixel(area.xmin, area.ymax),
            self.geo_to_pixel(area.xmax, area.ymin),
            self.geo_to_pixel(area.xmax, area.ymax),
        ];
        let px = Extent::enclosing(corners.into_iter());
        if !(px.xmin.is_finite()
            && px.ymin.is_finite()
            && px.xmax.is_finite()
            && px.ymax.is_finite())
        {
            return None;
        }
        if px.xmax < 0.0 || px.ymax < 0.0 || px.xmin >= cols as f64 || px.ymin >= rows as f64 {
            return None;
        }
        let clamp = |v: f64, n: usize| (v.floor().max(0.0) as usize).min(n - 1);
        Some(PixelWindow {
            row_start: clamp(px.ymin, rows),
            row_end: clamp(px.ymax, rows),
            col_start: clamp(px.xmin, cols),
            col_end: clamp(px.xmax, cols),
        })
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
