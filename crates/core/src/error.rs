//! Error types for Havvind

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Havvind operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot read {path}: {reason}")]
    DataAccess { path: PathBuf, reason: String },

    #[error("Layer '{layer}' not found (available: {})", available.join(", "))]
    LayerNotFound { layer: String, available: Vec<String> },

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Grid mismatch in {0}: rasters do not share transform")]
    GridMismatch(String),

    #[error("CRS mismatch in {context}: {left} vs {right}")]
    CrsMismatch {
        context: String,
        left: String,
        right: String,
    },

    #[error("Missing CRS in {0}")]
    MissingCrs(String),

    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("No data value not set")]
    NoDataNotSet,

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a data-access error for `path`
    pub fn data_access(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::DataAccess {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for Havvind operations
pub type Result<T> = std::result::Result<T, Error>;
