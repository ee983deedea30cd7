//! K-means clustered index for exact neighbour search
//!
//! The index partitions the reference points with k-means and keeps, per
//! cluster, its centroid, its radius and its members sorted by distance to
//! the centroid. Searches use the triangle inequality to skip whole clusters
//! and to narrow the scan inside a cluster to a window of members. Results
//! are always exact; the clustering only decides how many true distances are
//! computed.

pub mod clustered;
pub mod knn;
pub mod range;

pub use clustered::{Cluster, KmknnIndex, KmknnParams};
pub use knn::NeighborQueue;

/// Relative slack applied to triangle-inequality bounds. Rounding in the
/// bound arithmetic must never prune a point lying exactly on the bound.
pub(crate) const BOUND_SLACK: f64 = 1e-12;

/// One search hit: a reference point index and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// 0-based index into the reference dataset
    pub index: usize,
    /// Distance under the index metric
    pub distance: f64,
}

impl Neighbor {
    pub fn new(index: usize, distance: f64) -> Self {
        Self { index, distance }
    }
}
