//! # coastmesh algorithms
//!
//! Interpolation of raster data onto mesh nodes and other scattered query
//! points.
//!
//! Nine reduction methods are available, each usable directly on raster
//! values or through a category lookup table:
//! average, nearest, highest, outside standard deviation, Bilskie
//! averaging, inverse distance weighting (radius or N points) and the
//! average of the nearest N samples.

pub mod interpolation;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::interpolation::{
        DirectionalParams, DirectionalResult, Griddata, GriddataParams, InterpolationMethod,
        PointValues, RadiusPolicy, ReduceOptions, ThresholdPolicy,
    };
    pub use coastmesh_core::prelude::*;
}
