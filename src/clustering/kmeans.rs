//! K-means clustering implementation
//!
//! Groups reference points into clusters by Lloyd relocation.
//! Used to build the clustered search index; the quality of the split only
//! affects how much the search can prune, never the search results.

use crate::dataset::Dataset;
use crate::distance::l2_squared_scalar;
use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, warn};

/// How initial centroids are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Seeding {
    /// Evenly-strided sample of the dataset (rows `i * n / k`)
    #[default]
    Strided,
    /// k-means++ sampling from a seeded RNG
    PlusPlus {
        /// RNG seed
        seed: u64,
    },
}

/// K-means clustering result
#[derive(Debug, Clone)]
pub struct KMeans {
    /// Cluster centroids
    pub centroids: Vec<Vec<f64>>,
    /// Number of clusters
    pub k: usize,
    /// Dimensionality
    pub dimension: usize,
}

/// Assignment of points to clusters
#[derive(Debug, Clone)]
pub struct ClusterAssignment {
    /// Which cluster each point belongs to (index)
    pub assignments: Vec<usize>,
    /// Relocation rounds run after the initial assignment
    pub iterations: usize,
    /// Whether the last round reassigned nothing
    pub converged: bool,
}

impl KMeans {
    /// Pick `k` evenly-strided points as initial centroids
    pub fn init_strided(points: &Dataset, k: usize) -> Result<Self> {
        check_k(points, k)?;

        let n = points.len();
        let centroids = (0..k).map(|i| points.point(i * n / k).to_vec()).collect();

        Ok(Self {
            centroids,
            k,
            dimension: points.dimension(),
        })
    }

    /// Initialize k-means with k-means++ algorithm
    ///
    /// Selects initial centroids that are far apart from each other.
    /// The same seed always yields the same centroids.
    pub fn init_plusplus(points: &Dataset, k: usize, seed: u64) -> Result<Self> {
        check_k(points, k)?;

        let n = points.len();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);

        // 1. Choose first centroid uniformly
        centroids.push(points.point(rng.gen_range(0..n)).to_vec());

        // Squared distance from each point to its nearest chosen centroid
        let mut nearest: Vec<f64> = points
            .points()
            .map(|p| l2_squared_scalar(p, &centroids[0]))
            .collect();

        // 2. Each remaining centroid is sampled proportional to squared distance
        for _ in 1..k {
            let total: f64 = nearest.iter().sum();

            let chosen_idx = if total > 0.0 {
                let mut target = rng.gen::<f64>() * total;
                let mut chosen = nearest.iter().rposition(|d| *d > 0.0).unwrap_or(n - 1);
                for (i, d) in nearest.iter().enumerate() {
                    target -= d;
                    if target <= 0.0 && *d > 0.0 {
                        chosen = i;
                        break;
                    }
                }
                chosen
            } else {
                // Every point coincides with a centroid already
                rng.gen_range(0..n)
            };

            let centroid = points.point(chosen_idx).to_vec();
            for (d, p) in nearest.iter_mut().zip(points.points()) {
                *d = d.min(l2_squared_scalar(p, &centroid));
            }
            centroids.push(centroid);
        }

        Ok(Self {
            centroids,
            k,
            dimension: points.dimension(),
        })
    }

    /// Run k-means clustering
    ///
    /// Stops after a round that reassigns no point, or after `max_iterations`
    /// rounds. Clusters may end up empty; callers decide what to do with them.
    pub fn fit(
        points: &Dataset,
        k: usize,
        seeding: Seeding,
        max_iterations: usize,
    ) -> Result<(Self, ClusterAssignment)> {
        let mut kmeans = match seeding {
            Seeding::Strided => Self::init_strided(points, k)?,
            Seeding::PlusPlus { seed } => Self::init_plusplus(points, k, seed)?,
        };

        let mut assignments = kmeans.assign(points);
        let mut iterations = 0;
        let mut converged = false;

        while iterations < max_iterations {
            iterations += 1;
            kmeans.update_centroids(points, &assignments);

            let next = kmeans.assign(points);
            let moved = next
                .iter()
                .zip(assignments.iter())
                .filter(|(a, b)| a != b)
                .count();
            assignments = next;

            debug!(round = iterations, moved, "k-means relocation round");

            if moved == 0 {
                converged = true;
                break;
            }
        }

        if !converged {
            warn!(max_iterations, "k-means hit the round cap before converging");
        }

        Ok((
            kmeans,
            ClusterAssignment {
                assignments,
                iterations,
                converged,
            },
        ))
    }

    /// Assign points to nearest centroids (ties go to the lowest centroid id)
    pub fn assign(&self, points: &Dataset) -> Vec<usize> {
        points
            .as_slice()
            .par_chunks_exact(self.dimension)
            .map(|p| self.nearest_centroid(p).0)
            .collect()
    }

    /// Recompute each centroid as the mean of its members.
    ///
    /// A centroid with no members keeps its previous position.
    fn update_centroids(&mut self, points: &Dataset, assignments: &[usize]) {
        let mut sums = vec![vec![0.0; self.dimension]; self.k];
        let mut counts = vec![0usize; self.k];

        // Sum up points in each cluster
        for (point, &cluster_id) in points.points().zip(assignments.iter()) {
            for (acc, &val) in sums[cluster_id].iter_mut().zip(point.iter()) {
                *acc += val;
            }
            counts[cluster_id] += 1;
        }

        // Compute means
        for ((centroid, sum), &count) in self.centroids.iter_mut().zip(sums).zip(counts.iter()) {
            if count > 0 {
                for (c, s) in centroid.iter_mut().zip(sum) {
                    *c = s / count as f64;
                }
            }
        }
    }

    /// Find the nearest centroid for a point, by squared Euclidean distance
    pub fn nearest_centroid(&self, point: &[f64]) -> (usize, f64) {
        let mut best = (0, f64::INFINITY);
        for (i, c) in self.centroids.iter().enumerate() {
            let d = l2_squared_scalar(point, c);
            if d < best.1 {
                best = (i, d);
            }
        }
        best
    }

    /// Get point indices grouped by cluster, in ascending index order
    pub fn get_clusters(&self, assignments: &[usize]) -> Vec<Vec<usize>> {
        let mut clusters = vec![Vec::new(); self.k];

        for (i, &cluster_id) in assignments.iter().enumerate() {
            clusters[cluster_id].push(i);
        }

        clusters
    }
}

fn check_k(points: &Dataset, k: usize) -> Result<()> {
    if k == 0 {
        return Err(Error::InvalidParameter {
            name: "num_clusters",
            message: "must be at least 1",
        });
    }
    if k > points.len() {
        return Err(Error::InvalidParameter {
            name: "num_clusters",
            message: "must not exceed the number of points",
        });
    }
    Ok(())
}
