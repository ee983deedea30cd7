//! Distance calculation
//!
//! Cluster radii, member distances and reported neighbour distances all use
//! the index's [`DistanceMetric`]. Both metrics satisfy the triangle
//! inequality, which the cluster pruning relies on.

pub mod scalar;

pub use scalar::{l2_scalar, l2_squared_scalar, manhattan_scalar};

/// Distance metric types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    /// Euclidean (L2) distance
    #[default]
    Euclidean,
    /// Manhattan (L1) distance
    Manhattan,
}

impl DistanceMetric {
    /// Parse a metric name as used by host callers ("Euclidean", "Manhattan").
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "euclidean" | "l2" => Some(Self::Euclidean),
            "manhattan" | "l1" => Some(Self::Manhattan),
            _ => None,
        }
    }
}

/// Compute distance between two points using the specified metric
#[inline]
pub fn distance(a: &[f64], b: &[f64], metric: DistanceMetric) -> f64 {
    match metric {
        DistanceMetric::Euclidean => l2_scalar(a, b),
        DistanceMetric::Manhattan => manhattan_scalar(a, b),
    }
}

/// Batch distance computation - compute distances from query to many points
///
/// `points` is a dense row-major matrix with rows of length `query.len()`.
/// Returns (index, distance) pairs in row order.
pub fn batch_distances(query: &[f64], points: &[f64], metric: DistanceMetric) -> Vec<(usize, f64)> {
    points
        .chunks_exact(query.len())
        .enumerate()
        .map(|(i, p)| (i, distance(query, p, metric)))
        .collect()
}
