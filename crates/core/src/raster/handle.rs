//! The raster an interpolation run samples, and how it is backed

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::io::{open_error, read_geotiff};
use crate::raster::{
    DEFAULT_CACHE_CHUNKS, Extent, PixelSample, Raster, RasterElement, RasterSampler,
    StreamingRaster,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// How raster pixels are held while sampling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RasterMode {
    /// Whole raster decoded up front; no I/O per query
    #[default]
    InMemory,
    /// Strips/tiles decoded on demand, at most `cache_chunks` kept
    Streaming { cache_chunks: usize },
}

impl RasterMode {
    /// Streaming with the default chunk cache
    pub fn streaming() -> Self {
        RasterMode::Streaming {
            cache_chunks: DEFAULT_CACHE_CHUNKS,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self, RasterMode::InMemory)
    }
}

/// A validated raster source: coordinate system, cell size, extent and a
/// sampler in the selected [`RasterMode`].
pub struct RasterHandle {
    sampler: Box<dyn RasterSampler>,
    mode: RasterMode,
    source: Option<PathBuf>,
}

impl std::fmt::Debug for RasterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterHandle")
            .field("mode", &self.mode)
            .field("source", &self.source)
            .field("cell_size", &self.cell_size())
            .field("extent", &self.extent())
            .finish()
    }
}

impl RasterHandle {
    /// Open a GeoTIFF in the given mode
    pub fn open(path: impl AsRef<Path>, mode: RasterMode) -> Result<Self> {
        let path = path.as_ref();
        let sampler: Box<dyn RasterSampler> = match mode {
            RasterMode::InMemory => Box::new(read_geotiff::<f32, _>(path)?),
            RasterMode::Streaming { cache_chunks } => {
                Box::new(StreamingRaster::open(path, cache_chunks)?)
            }
        };
        let handle = Self {
            sampler,
            mode,
            source: Some(path.to_path_buf()),
        };
        handle.validate()?;
        debug!(path = %path.display(), ?mode, cell = handle.cell_size(), "raster ready");
        Ok(handle)
    }

    /// Wrap a raster already in memory
    pub fn from_raster<T: RasterElement>(raster: Raster<T>) -> Result<Self> {
        Self::from_sampler(Box::new(raster), RasterMode::InMemory)
    }

    /// Wrap any sampler; `mode` records how the caller backs it
    pub fn from_sampler(sampler: Box<dyn RasterSampler>, mode: RasterMode) -> Result<Self> {
        let handle = Self {
            sampler,
            mode,
            source: None,
        };
        handle.validate()?;
        Ok(handle)
    }

    fn validate(&self) -> Result<()> {
        let cell = self.sampler.native_cell_size();
        if cell.is_finite() && cell > 0.0 {
            return Ok(());
        }
        let reason = format!("cell size must be finite and positive, got {cell}");
        Err(match &self.source {
            Some(path) => open_error(path, reason),
            None => Error::invalid_parameter("cell_size", cell, reason),
        })
    }

    pub fn mode(&self) -> RasterMode {
        self.mode
    }

    /// File the raster was opened from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn sampler(&self) -> &dyn RasterSampler {
        self.sampler.as_ref()
    }

    pub fn cell_size(&self) -> f64 {
        self.sampler.native_cell_size()
    }

    pub fn extent(&self) -> Extent {
        self.sampler.extent()
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.sampler.crs()
    }

    pub fn value_at(&self, x: f64, y: f64) -> Result<PixelSample> {
        self.sampler.value_at(x, y)
    }

    pub fn values_in_window(&self, area: &Extent, out: &mut Vec<PixelSample>) -> Result<()> {
        self.sampler.values_in_window(area, out)
    }
}
