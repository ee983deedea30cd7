//! Clustered index construction
//!
//! Partitions reference points into clusters using k-means, then freezes each
//! cluster as (centroid, radius, members sorted by distance to centroid).

use crate::clustering::{KMeans, Seeding};
use crate::dataset::Dataset;
use crate::distance::{distance, DistanceMetric};
use crate::error::{Error, Result};
use rayon::prelude::*;
use tracing::{debug, info};

/// Default cap on k-means relocation rounds
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Index build parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct KmknnParams {
    /// Number of clusters; `None` uses `ceil(sqrt(n))`. Clamped to `[1, n]`.
    pub num_clusters: Option<usize>,

    /// Maximum k-means relocation rounds
    pub max_iterations: usize,

    /// Initial centroid selection
    pub seeding: Seeding,

    /// Distance used for radii and reported distances
    pub metric: DistanceMetric,
}

impl Default for KmknnParams {
    fn default() -> Self {
        Self {
            num_clusters: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seeding: Seeding::Strided,
            metric: DistanceMetric::Euclidean,
        }
    }
}

impl KmknnParams {
    /// Set the number of clusters.
    pub fn with_num_clusters(mut self, num_clusters: usize) -> Self {
        self.num_clusters = Some(num_clusters);
        self
    }

    /// Set the relocation round cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the seeding strategy.
    pub fn with_seeding(mut self, seeding: Seeding) -> Self {
        self.seeding = seeding;
        self
    }

    /// Set the distance metric.
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Resolve the cluster count for a dataset of `n` points.
    pub fn cluster_count(&self, n: usize) -> Result<usize> {
        let requested = match self.num_clusters {
            Some(0) => {
                return Err(Error::InvalidParameter {
                    name: "num_clusters",
                    message: "must be at least 1",
                })
            }
            Some(c) => c,
            None => (n as f64).sqrt().ceil() as usize,
        };
        Ok(requested.clamp(1, n.max(1)))
    }
}

/// A frozen cluster of reference points.
#[derive(Debug, Clone)]
pub struct Cluster {
    centroid: Vec<f64>,
    radius: f64,
    /// (reference index, distance to centroid), ascending by distance then index
    members: Vec<(usize, f64)>,
}

impl Cluster {
    fn from_members(reference: &Dataset, indices: &[usize], metric: DistanceMetric) -> Self {
        let mut centroid = vec![0.0; reference.dimension()];
        for &idx in indices {
            for (c, &v) in centroid.iter_mut().zip(reference.point(idx)) {
                *c += v;
            }
        }
        let count = indices.len() as f64;
        for c in centroid.iter_mut() {
            *c /= count;
        }

        let mut members: Vec<(usize, f64)> = indices
            .iter()
            .map(|&idx| (idx, distance(reference.point(idx), &centroid, metric)))
            .collect();
        members.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        let radius = members.last().map_or(0.0, |m| m.1);

        Self {
            centroid,
            radius,
            members,
        }
    }

    /// Mean of the member points
    pub fn centroid(&self) -> &[f64] {
        &self.centroid
    }

    /// Largest member distance from the centroid
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Members as (reference index, distance to centroid), ascending by distance
    pub fn members(&self) -> &[(usize, f64)] {
        &self.members
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Never true for a built cluster
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Exact neighbour search index over a k-means partition of the reference set
///
/// Immutable once built and safe to share across threads.
#[derive(Debug, Clone)]
pub struct KmknnIndex {
    /// Indexed reference points
    pub(crate) reference: Dataset,
    /// Non-empty clusters partitioning the reference points
    pub(crate) clusters: Vec<Cluster>,
    /// Largest cluster radius
    pub(crate) max_radius: f64,
    /// Distance metric to use
    pub(crate) metric: DistanceMetric,
}

impl KmknnIndex {
    /// Build a clustered index over `reference`
    ///
    /// # Arguments
    /// * `reference` - The points to index
    /// * `params` - Cluster count, round cap, seeding and metric
    pub fn build(reference: Dataset, params: &KmknnParams) -> Result<Self> {
        if reference.is_empty() {
            return Err(Error::EmptyDataset);
        }
        if params.max_iterations == 0 {
            return Err(Error::InvalidParameter {
                name: "max_iterations",
                message: "must be at least 1",
            });
        }

        let n = reference.len();
        let num_clusters = params.cluster_count(n)?;

        let (kmeans, assignment) =
            KMeans::fit(&reference, num_clusters, params.seeding, params.max_iterations)?;

        // Clusters left empty by relocation are dropped here
        let groups: Vec<Vec<usize>> = kmeans
            .get_clusters(&assignment.assignments)
            .into_iter()
            .filter(|members| !members.is_empty())
            .collect();

        let clusters: Vec<Cluster> = groups
            .par_iter()
            .map(|members| Cluster::from_members(&reference, members, params.metric))
            .collect();

        let max_radius = clusters.iter().map(Cluster::radius).fold(0.0, f64::max);

        let sizes: Vec<usize> = clusters.iter().map(Cluster::len).collect();
        debug!(
            min = sizes.iter().min().copied().unwrap_or(0),
            max = sizes.iter().max().copied().unwrap_or(0),
            avg = n as f64 / sizes.len().max(1) as f64,
            "cluster sizes"
        );
        info!(
            points = n,
            dimension = reference.dimension(),
            requested_clusters = num_clusters,
            clusters = clusters.len(),
            rounds = assignment.iterations,
            converged = assignment.converged,
            "built clustered index"
        );

        Ok(Self {
            reference,
            clusters,
            max_radius,
            metric: params.metric,
        })
    }

    /// Build from one vector per point.
    pub fn from_rows(rows: &[Vec<f64>], params: &KmknnParams) -> Result<Self> {
        Self::build(Dataset::from_rows(rows)?, params)
    }

    /// Clusters in build order
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Get number of clusters
    pub fn num_clusters(&self) -> usize {
        self.clusters.len()
    }

    /// Indexed reference points
    pub fn reference(&self) -> &Dataset {
        &self.reference
    }

    /// Get total number of points
    pub fn len(&self) -> usize {
        self.reference.len()
    }

    /// Check if index is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get dimensionality
    pub fn dimension(&self) -> usize {
        self.reference.dimension()
    }

    /// Distance metric
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Validate a query point against the index.
    pub(crate) fn check_query(&self, query: &[f64]) -> Result<()> {
        if query.len() != self.dimension() {
            return Err(Error::DimensionMismatch {
                expected: self.dimension(),
                found: query.len(),
            });
        }
        if let Some(column) = query.iter().position(|v| !v.is_finite()) {
            return Err(Error::NonFiniteValue { row: 0, column });
        }
        Ok(())
    }

    /// Distance from `query` to every centroid, as (cluster id, distance).
    pub(crate) fn centroid_distances(&self, query: &[f64]) -> Vec<(usize, f64)> {
        self.clusters
            .iter()
            .enumerate()
            .map(|(i, c)| (i, distance(query, &c.centroid, self.metric)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> Dataset {
        Dataset::from_rows(&(0..n).map(|i| vec![i as f64, 0.0]).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn test_clustered_index_build() {
        let mut rows = Vec::new();

        // 100 points around two locations
        for i in 0..50 {
            rows.push(vec![i as f64 * 0.1, 0.0, 0.0]);
        }
        for i in 0..50 {
            rows.push(vec![10.0 + i as f64 * 0.1, 0.0, 0.0]);
        }

        let params = KmknnParams::default().with_num_clusters(2);
        let index = KmknnIndex::from_rows(&rows, &params).unwrap();

        assert_eq!(index.num_clusters(), 2);
        assert_eq!(index.len(), 100);
        assert_eq!(index.dimension(), 3);
    }

    #[test]
    fn test_clusters_partition_reference() {
        let index = KmknnIndex::build(line(37), &KmknnParams::default()).unwrap();

        let mut seen: Vec<usize> = index
            .clusters()
            .iter()
            .flat_map(|c| c.members().iter().map(|m| m.0))
            .collect();
        seen.sort_unstable();

        assert_eq!(seen, (0..37).collect::<Vec<_>>());
        assert!(index.clusters().iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn test_cluster_radius_and_order() {
        let index = KmknnIndex::build(line(50), &KmknnParams::default().with_num_clusters(5)).unwrap();

        for cluster in index.clusters() {
            let members = cluster.members();
            assert!(members.windows(2).all(|w| w[0].1 <= w[1].1));

            for &(idx, d) in members {
                let true_d = distance(index.reference().point(idx), cluster.centroid(), index.metric());
                assert_eq!(d, true_d);
            }
            assert_eq!(cluster.radius(), members.last().unwrap().1);
        }
    }

    #[test]
    fn test_centroid_is_member_mean() {
        let rows = vec![vec![0.0, 0.0], vec![2.0, 0.0], vec![100.0, 100.0]];
        let index = KmknnIndex::from_rows(&rows, &KmknnParams::default().with_num_clusters(2)).unwrap();

        let small = index
            .clusters()
            .iter()
            .find(|c| c.len() == 2)
            .expect("two nearby points share a cluster");
        assert_eq!(small.centroid(), &[1.0, 0.0]);
        assert_eq!(small.radius(), 1.0);
    }

    #[test]
    fn test_duplicate_points_drop_empty_clusters() {
        let rows = vec![vec![3.0, 3.0]; 9];
        let index = KmknnIndex::from_rows(&rows, &KmknnParams::default().with_num_clusters(4)).unwrap();

        // All seeds coincide, so every point lands in the first cluster
        assert_eq!(index.num_clusters(), 1);
        assert_eq!(index.clusters()[0].len(), 9);
        assert_eq!(index.clusters()[0].radius(), 0.0);
    }

    #[test]
    fn test_cluster_count() {
        let params = KmknnParams::default();
        assert_eq!(params.cluster_count(1).unwrap(), 1);
        assert_eq!(params.cluster_count(10).unwrap(), 4);
        assert_eq!(params.cluster_count(100).unwrap(), 10);

        assert_eq!(params.clone().with_num_clusters(500).cluster_count(20).unwrap(), 20);
        assert!(params.with_num_clusters(0).cluster_count(20).is_err());
    }

    #[test]
    fn test_invalid_max_iterations() {
        let params = KmknnParams::default().with_max_iterations(0);
        assert!(matches!(
            KmknnIndex::build(line(4), &params),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_index_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<KmknnIndex>();
    }
}
