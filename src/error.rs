//! Error types for index construction and search.

use thiserror::Error;

/// Errors returned by index construction and neighbour search.
#[derive(Debug, Error)]
pub enum Error {
    /// The reference dataset has no points.
    #[error("empty dataset")]
    EmptyDataset,

    /// Points have inconsistent dimensionality, or a query does not match the index.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimensionality.
        expected: usize,
        /// Found dimensionality.
        found: usize,
    },

    /// A coordinate is NaN or infinite.
    #[error("non-finite value at row {row}, column {column}")]
    NonFiniteValue {
        /// Row (point) of the offending coordinate.
        row: usize,
        /// Column (dimension) of the offending coordinate.
        column: usize,
    },

    /// Requested neighbour count is negative.
    #[error("invalid number of neighbours: {0}")]
    InvalidK(i64),

    /// Search radius is negative or NaN.
    #[error("invalid radius: {0}")]
    InvalidRadius(f64),

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: &'static str,
    },

    /// A point index lies outside the dataset.
    #[error("index {index} out of range for dataset of {len} points")]
    IndexOutOfRange {
        /// Offending index.
        index: usize,
        /// Number of points in the dataset.
        len: usize,
    },

    /// Matrix file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Convert a host-supplied neighbour count into a `usize`.
pub fn validate_k(k: i64) -> Result<usize> {
    usize::try_from(k).map_err(|_| Error::InvalidK(k))
}

/// Check a search radius. Zero and `+inf` are accepted.
pub fn validate_radius(threshold: f64) -> Result<f64> {
    if threshold.is_nan() || threshold < 0.0 {
        return Err(Error::InvalidRadius(threshold));
    }
    Ok(threshold)
}
