//! # coastmesh parallel
//!
//! Execution strategies for per-point work.
//!
//! Query points are independent, so a run is a map over point indices.
//! Every strategy returns results in index order regardless of how the
//! work was scheduled.

pub mod strategy;

pub use strategy::{ParallelStrategy, ProcessingMode, num_cpus};
