//! Error types for coastmesh

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for coastmesh operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot open raster {}: {reason}", path.display())]
    RasterOpen { path: PathBuf, reason: String },

    #[error("invalid lookup table {}, line {line}: {reason}", path.display())]
    LookupTable {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("coordinate systems differ (raster {raster}, query {query}) and no transform is set")]
    CrsMismatch { raster: String, query: String },

    #[error("a lookup table is required for lookup-table interpolation")]
    MissingLookupTable,

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("cannot build a spatial index over an empty point set")]
    EmptyPointSet,

    #[error("node {node} is not part of the mesh ({nodes} nodes)")]
    NodeOutOfRange { node: usize, nodes: usize },

    #[error("element {element} is not part of the mesh ({elements} elements)")]
    ElementOutOfRange { element: usize, elements: usize },

    #[error("position {position} exceeds the {len} elements around node {node}")]
    ListIndex {
        node: usize,
        position: usize,
        len: usize,
    },

    #[error("element table has not been built for the current connectivity")]
    TopologyNotBuilt,

    #[error("{0}")]
    Other(String),
}

/// Broad classes of [`Error`], used to decide how far a failure propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input or setup; fatal before any per-point work starts
    Configuration,
    /// A structure could not be built from the supplied data
    Structure,
    /// A requested node, element or pixel does not exist
    OutOfRange,
    /// A position inside an adjacency list does not exist, or the list is stale
    Index,
    /// Underlying I/O failure
    Io,
    Other,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::RasterOpen { .. }
            | Error::LookupTable { .. }
            | Error::CrsMismatch { .. }
            | Error::MissingLookupTable
            | Error::InvalidDimensions { .. }
            | Error::UnsupportedDataType(_)
            | Error::InvalidParameter { .. } => ErrorKind::Configuration,
            Error::EmptyPointSet => ErrorKind::Structure,
            Error::NodeOutOfRange { .. }
            | Error::ElementOutOfRange { .. }
            | Error::IndexOutOfBounds { .. } => ErrorKind::OutOfRange,
            Error::ListIndex { .. } | Error::TopologyNotBuilt => ErrorKind::Index,
            Error::Io(_) => ErrorKind::Io,
            Error::Other(_) => ErrorKind::Other,
        }
    }

    /// Shorthand for [`Error::InvalidParameter`]
    pub fn invalid_parameter(
        name: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for coastmesh operations
pub type Result<T> = std::result::Result<T, Error>;
