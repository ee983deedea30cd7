//! kmknn - exact nearest-neighbour search accelerated by k-means clustering
//!
//! The reference points are partitioned with k-means. Each cluster keeps its
//! centroid, radius and members sorted by distance to the centroid, which lets
//! searches skip clusters and narrow scans with the triangle inequality while
//! still returning exact results.
//!
//! ```rust
//! use kmknn::{find_knn, KmknnIndex, KmknnParams, SearchOptions};
//!
//! let rows = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0], vec![5.0, 5.0]];
//! let index = KmknnIndex::from_rows(&rows, &KmknnParams::default()).unwrap();
//!
//! let lists = find_knn(&index, 2, &SearchOptions::default()).unwrap();
//! assert_eq!(lists.indices.unwrap()[0], vec![1, 2]);
//! ```

pub mod clustering;
pub mod dataset;
pub mod distance;
pub mod error;
pub mod index;
pub mod neighbors;
pub mod storage;

// Python bindings (only compiled with python feature)
#[cfg(feature = "python")]
pub mod python_bindings;

// Re-export commonly used types
pub use clustering::{ClusterAssignment, KMeans, Seeding};
pub use dataset::Dataset;
pub use distance::{batch_distances, distance, DistanceMetric};
pub use error::{validate_k, validate_radius, Error, Result};
pub use index::{Cluster, KmknnIndex, KmknnParams, Neighbor, NeighborQueue};
pub use neighbors::{
    find_knn, find_neighbors, query_knn, query_neighbors, IndexBase, NeighborLists, SearchOptions,
};
