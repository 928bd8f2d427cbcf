//! GeoTIFF-backed sampler that decodes only the chunks a query touches

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::io::{FileDecoder, convert, open_decoder, open_error, read_georeference};
use crate::raster::{Extent, GeoTransform, PixelSample, RasterElement, RasterSampler};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Default number of decoded strips/tiles kept in memory
pub const DEFAULT_CACHE_CHUNKS: usize = 64;

/// Windowed reader over a single-band GeoTIFF.
///
/// The file stays open for the lifetime of the sampler. Decoded strips or
/// tiles are kept in an LRU cache so neighbouring queries rarely hit the
/// disk twice.
pub struct StreamingRaster {
    path: PathBuf,
    decoder: Mutex<FileDecoder>,
    cache: Mutex<LruCache<u32, Arc<Vec<f64>>>>,
    rows: usize,
    cols: usize,
    chunk_width: usize,
    chunk_height: usize,
    chunks_across: usize,
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<f64>,
}

impl std::fmt::Debug for StreamingRaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingRaster")
            .field("path", &self.path)
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("chunk", &(self.chunk_width, self.chunk_height))
            .finish()
    }
}

impl StreamingRaster {
    /// Open a GeoTIFF, reading only its header
    pub fn open(path: impl AsRef<Path>, cache_chunks: usize) -> Result<Self> {
        let path = path.as_ref();
        let mut decoder = open_decoder(path)?;

        let (width, height) = decoder.dimensions().map_err(|e| open_error(path, e))?;
        let (chunk_width, chunk_height) = decoder.chunk_dimensions();
        if chunk_width == 0 || chunk_height == 0 {
            return Err(open_error(path, "zero-sized strips or tiles"));
        }
        let georef = read_georeference(&mut decoder);

        let cols = width as usize;
        let chunk_width = chunk_width as usize;
        let capacity = NonZeroUsize::new(cache_chunks.max(1)).unwrap_or(NonZeroUsize::MIN);

        debug!(
            path = %path.display(),
            rows = height,
            cols = width,
            chunk_width,
            chunk_height,
            "opened streaming raster"
        );

        Ok(Self {
            path: path.to_path_buf(),
            decoder: Mutex::new(decoder),
            cache: Mutex::new(LruCache::new(capacity)),
            rows: height as usize,
            cols,
            chunk_width,
            chunk_height: chunk_height as usize,
            chunks_across: cols.div_ceil(chunk_width),
            transform: georef.transform,
            crs: georef.crs,
            nodata: georef.nodata,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn chunk_index(&self, row: usize, col: usize) -> u32 {
        ((row / self.chunk_height) * self.chunks_across + col / self.chunk_width) as u32
    }

    /// Decoded chunk, from the cache when possible
    fn chunk(&self, index: u32) -> Result<Arc<Vec<f64>>> {
        {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(chunk) = cache.get(&index) {
                return Ok(Arc::clone(chunk));
            }
        }

        let data = {
            let mut decoder = self.decoder.lock().unwrap_or_else(PoisonError::into_inner);
            let (w, h) = decoder.chunk_data_dimensions(index);
            let raw = decoder
                .read_chunk(index)
                .map_err(|e| open_error(&self.path, e))?;
            let data: Vec<f64> = convert(raw)?;
            if data.len() < (w as usize) * (h as usize) {
                return Err(Error::UnsupportedDataType(format!(
                    "chunk {} of {} holds {} samples, expected {}",
                    index,
                    self.path.display(),
                    data.len(),
                    w * h
                )));
            }
            Arc::new(data)
        };

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.put(index, Arc::clone(&data));
        Ok(data)
    }

    /// Width of the decoded buffer for the chunk holding column `col`
    fn chunk_stride(&self, col: usize) -> usize {
        let start = (col / self.chunk_width) * self.chunk_width;
        self.chunk_width.min(self.cols - start)
    }

    fn sample(&self, chunk: &[f64], row: usize, col: usize) -> PixelSample {
        let (x, y) = self.transform.pixel_to_geo(col, row);
        let local_row = row % self.chunk_height;
        let local_col = col % self.chunk_width;
        let value = chunk[local_row * self.chunk_stride(col) + local_col];
        match value.sample(self.nodata) {
            Some(value) => PixelSample { x, y, value, valid: true },
            None => PixelSample::invalid(x, y),
        }
    }

    /// Number of chunks currently decoded in memory
    pub fn cached_chunks(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl RasterSampler for StreamingRaster {
    fn value_at(&self, x: f64, y: f64) -> Result<PixelSample> {
        match self.transform.pixel_at(x, y, self.cols, self.rows) {
            Some((col, row)) => {
                let chunk = self.chunk(self.chunk_index(row, col))?;
                Ok(self.sample(&chunk, row, col))
            }
            None => Ok(PixelSample::invalid(x, y)),
        }
    }

    fn values_in_window(&self, area: &Extent, out: &mut Vec<PixelSample>) -> Result<()> {
        let Some(window) = self.transform.pixel_window(area, self.cols, self.rows) else {
            return Ok(());
        };
        out.reserve(window.pixel_count());

        for row in window.row_start..=window.row_end {
            let mut col = window.col_start;
            while col <= window.col_end {
                let chunk = self.chunk(self.chunk_index(row, col))?;
                let chunk_end = ((col / self.chunk_width) + 1) * self.chunk_width - 1;
                let last = chunk_end.min(window.col_end);
                for c in col..=last {
                    out.push(self.sample(&chunk, row, c));
                }
                col = last + 1;
            }
        }
        Ok(())
    }

    fn native_cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    fn extent(&self) -> Extent {
        self.transform.bounds(self.cols, self.rows)
    }

    fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }
}
