//! In-memory raster grid

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{Extent, GeoTransform, PixelSample, PixelWindow, RasterElement, RasterSampler};
use ndarray::Array2;

/// A georeferenced 2D raster grid held entirely in memory.
///
/// `Raster<T>` stores values of type `T` in a 2D grid with associated
/// geographic metadata (transform and CRS). It is the in-memory
/// [`RasterSampler`]: every query is served from the array without I/O.
///
/// # Example
///
/// ```ignore
/// use coastmesh_core::{GeoTransform, Raster};
///
/// let mut landcover: Raster<u8> = Raster::filled(100, 100, 11);
/// landcover.set_transform(GeoTransform::new(500_000.0, 3_300_000.0, 30.0, -30.0));
/// landcover.set(10, 20, 42)?;
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        let (rows, cols) = self.shape();
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::IndexOutOfBounds { row, col, rows, cols }),
        }
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    // Metadata

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Map bounds of the grid
    pub fn bounds(&self) -> Extent {
        self.transform.bounds(self.cols(), self.rows())
    }

    /// Map coordinates of a pixel centre
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    fn sample(&self, row: usize, col: usize) -> PixelSample {
        let (x, y) = self.transform.pixel_to_geo(col, row);
        match self.data[(row, col)].sample(self.nodata) {
            Some(value) => PixelSample { x, y, value, valid: true },
            None => PixelSample::invalid(x, y),
        }
    }

    /// Append the cells of a pixel window to `out`
    pub fn window_samples(&self, window: PixelWindow, out: &mut Vec<PixelSample>) {
        out.reserve(window.pixel_count());
        for row in window.row_start..=window.row_end {
            for col in window.col_start..=window.col_end {
                out.push(self.sample(row, col));
            }
        }
    }

    // Statistics

    /// Calculate basic statistics (min, max, mean, count of valid cells)
    pub fn statistics(&self) -> RasterStatistics {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut count: usize = 0;

        for v in self.data.iter().filter_map(|v| v.sample(self.nodata)) {
            min = min.min(v);
            max = max.max(v);
            sum += v;
            count += 1;
        }

        let valid = count > 0;
        RasterStatistics {
            min: valid.then_some(min),
            max: valid.then_some(max),
            mean: valid.then(|| sum / count as f64),
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

impl<T: RasterElement> RasterSampler for Raster<T> {
    fn value_at(&self, x: f64, y: f64) -> Result<PixelSample> {
        Ok(match self.transform.pixel_at(x, y, self.cols(), self.rows()) {
            Some((col, row)) => self.sample(row, col),
            None => PixelSample::invalid(x, y),
        })
    }

    fn values_in_window(&self, area: &Extent, out: &mut Vec<PixelSample>) -> Result<()> {
        if let Some(window) = self.transform.pixel_window(area, self.cols(), self.rows()) {
            self.window_samples(window, out);
        }
        Ok(())
    }

    fn native_cell_size(&self) -> f64 {
        self.cell_size()
    }

    fn extent(&self) -> Extent {
        self.bounds()
    }

    fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }
}

/// Basic statistics for a raster
#[derive(Debug, Clone)]
pub struct RasterStatistics {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}
