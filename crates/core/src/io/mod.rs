//! Reading georeferenced rasters from disk

mod native;

pub use native::{Georeference, read_geotiff};

pub(crate) use native::{FileDecoder, convert, open_decoder, open_error, read_georeference};

#[cfg(test)]
pub(crate) use native::fixtures;
