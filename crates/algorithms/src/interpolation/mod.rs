//! Raster-to-point interpolation
//!
//! Samples a raster around each query point and reduces the samples to
//! one value (or one value per direction):
//! - method: the nine reduction methods, threshold policy, per-point options
//! - reduce: the reducers over sorted, weighted samples
//! - radius: adaptive search radius for Bilskie averaging
//! - gather: sample collection through a pixel index or raster windows
//! - directional: sector decomposition for directional output
//! - engine: validation and parallel, order-preserving runs

mod directional;
mod engine;
mod gather;
mod method;
mod radius;
mod reduce;

pub use directional::{DirectionalParams, DirectionalResult, bearing};
pub use engine::{DEFAULT_NODATA, Griddata, GriddataParams, PreparedRun};
pub use method::{InterpolationMethod, PointValues, ThresholdPolicy};
pub use radius::{RadiusPolicy, Resolved};
pub use reduce::{ReduceOptions, Sample, reduce};
