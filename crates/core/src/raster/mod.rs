//! Raster data structures and the sampling boundary

mod element;
mod geotransform;
mod grid;
mod handle;
mod sampler;
mod streaming;

pub use element::RasterElement;
pub use geotransform::{GeoTransform, PixelWindow};
pub use grid::{Raster, RasterStatistics};
pub use handle::{RasterHandle, RasterMode};
pub use sampler::{Extent, PixelSample, RasterSampler};
pub use streaming::{DEFAULT_CACHE_CHUNKS, StreamingRaster};
