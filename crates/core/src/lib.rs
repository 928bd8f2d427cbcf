//! # coastmesh core
//!
//! Shared types for sampling rasters onto unstructured meshes.
//!
//! This crate provides:
//! - `Raster<T>` grids, GeoTIFF decoding and a chunk-streaming sampler
//! - `CRS` handling with Cartesian and geodesic distance metrics
//! - `Mesh` topology with a node-to-element table
//! - A kd-tree over sample points
//! - Category lookup tables and the output variable registry

pub mod crs;
pub mod error;
pub mod io;
pub mod lookup;
pub mod mesh;
pub mod metadata;
pub mod raster;
pub mod spatial;

/// Planar or geographic coordinate pair
pub type Point = geo_types::Coord<f64>;

pub use crs::{CRS, CoordinateTransform, DistanceMetric};
pub use error::{Error, ErrorKind, Result};
pub use lookup::LookupTable;
pub use mesh::{Element, Mesh, MeshTopology, Node};
pub use raster::{
    Extent, GeoTransform, PixelSample, Raster, RasterElement, RasterHandle, RasterMode,
    RasterSampler,
};
pub use spatial::{KdTree, SamplePoint};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::Point;
    pub use crate::crs::{CRS, DistanceMetric};
    pub use crate::error::{Error, Result};
    pub use crate::lookup::LookupTable;
    pub use crate::mesh::{Mesh, MeshTopology};
    pub use crate::raster::{Extent, GeoTransform, Raster, RasterHandle, RasterMode, RasterSampler};
    pub use crate::spatial::{KdTree, SamplePoint};
}
