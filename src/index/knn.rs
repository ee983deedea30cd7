//! k-nearest-neighbour search over a clustered index
//!
//! Clusters are visited in ascending centroid distance. With the current
//! k-th best distance `b`, a cluster with centroid distance `dc` and radius
//! `r` can only contain an improvement if `dc - r <= b`, and inside it only
//! members whose centroid distance lies in `[dc - b, dc + b]`. Members are
//! stored sorted by centroid distance, so that window is a contiguous slice.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::{KmknnIndex, Neighbor, BOUND_SLACK};
use crate::distance::distance;
use crate::error::Result;

/// Heap entry ordered by (distance, index), so the heap top is the worst kept.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f64,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.index.cmp(&other.index))
    }
}

/// Fixed-capacity collection of the best `k` candidates seen so far.
///
/// Ties in distance are broken by ascending index, so the kept set does not
/// depend on the order candidates arrive in.
#[derive(Debug, Clone)]
pub struct NeighborQueue {
    heap: BinaryHeap<Candidate>,
    capacity: usize,
}

impl NeighborQueue {
    /// Create a queue keeping at most `capacity` neighbours.
    ///
    /// `reserve` bounds the up-front allocation for very large capacities.
    pub fn new(capacity: usize, reserve: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity.min(reserve) + 1),
            capacity,
        }
    }

    /// Offer a candidate; returns whether it was kept.
    pub fn push(&mut self, index: usize, distance: f64) -> bool {
        if self.capacity == 0 {
            return false;
        }

        let candidate = Candidate { distance, index };
        if self.heap.len() < self.capacity {
            self.heap.push(candidate);
            return true;
        }

        match self.heap.peek_mut() {
            Some(mut worst) if candidate < *worst => {
                *worst = candidate;
                true
            }
            _ => false,
        }
    }

    /// Whether `capacity` neighbours are held.
    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    /// Distance a new candidate must not exceed to be kept; infinite until full.
    pub fn bound(&self) -> f64 {
        if self.is_full() {
            self.heap.peek().map_or(f64::NEG_INFINITY, |c| c.distance)
        } else {
            f64::INFINITY
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drain into ascending (distance, index) order.
    pub fn into_sorted(self) -> Vec<Neighbor> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| Neighbor::new(c.index, c.distance))
            .collect()
    }
}

impl KmknnIndex {
    /// Find the `k` nearest reference points to `query`
    ///
    /// Returns up to `k` neighbours in ascending distance, ties by ascending
    /// index. `exclude` removes one reference index from consideration (used
    /// when the query is itself a reference point).
    pub fn search_knn(&self, query: &[f64], k: usize, exclude: Option<usize>) -> Result<Vec<Neighbor>> {
        self.check_query(query)?;

        let mut queue = NeighborQueue::new(k, self.len());
        if k == 0 {
            return Ok(queue.into_sorted());
        }

        let mut order = self.centroid_distances(query);
        order.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        for (cluster_id, dc) in order {
            let bound = queue.bound();

            // Later clusters are no closer, so none of them can beat the bound either
            let global_slack = BOUND_SLACK * (dc + self.max_radius);
            if dc - self.max_radius - global_slack > bound {
                break;
            }

            let cluster = &self.clusters[cluster_id];
            let slack = BOUND_SLACK * (dc + cluster.radius());
            if dc - cluster.radius() - slack > bound {
                continue;
            }

            let members = cluster.members();
            let start = if bound.is_finite() {
                let lower = dc - bound - slack;
                members.partition_point(|m| m.1 < lower)
            } else {
                0
            };

            for &(index, from_centroid) in &members[start..] {
                // Members are sorted, and the bound only shrinks
                if from_centroid - dc - slack > queue.bound() {
                    break;
                }
                if exclude == Some(index) {
                    continue;
                }

                let d = distance(query, self.reference.point(index), self.metric);
                queue.push(index, d);
            }
        }

        Ok(queue.into_sorted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::distance::batch_distances;
    use crate::error::Error;
    use crate::index::KmknnParams;

    fn brute_force(points: &Dataset, query: &[f64], k: usize, exclude: Option<usize>) -> Vec<Neighbor> {
        let mut all: Vec<(usize, f64)> = batch_distances(query, points.as_slice(), Default::default())
            .into_iter()
            .filter(|(i, _)| Some(*i) != exclude)
            .collect();
        all.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        all.truncate(k);
        all.into_iter().map(|(i, d)| Neighbor::new(i, d)).collect()
    }

    fn grid() -> Dataset {
        let mut rows = Vec::new();
        for x in 0..12 {
            for y in 0..9 {
                rows.push(vec![x as f64 * 0.7, (y * y) as f64 * 0.3]);
            }
        }
        Dataset::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_queue_keeps_best() {
        let mut queue = NeighborQueue::new(3, 100);
        for (i, d) in [5.0, 1.0, 4.0, 2.0, 3.0].iter().enumerate() {
            queue.push(i, *d);
        }

        assert!(queue.is_full());
        assert_eq!(queue.bound(), 3.0);

        let kept: Vec<usize> = queue.into_sorted().iter().map(|n| n.index).collect();
        assert_eq!(kept, vec![1, 3, 4]);
    }

    #[test]
    fn test_queue_tie_breaks_by_index() {
        let mut queue = NeighborQueue::new(2, 10);
        queue.push(7, 1.0);
        queue.push(3, 1.0);
        queue.push(5, 1.0);
        queue.push(1, 1.0);

        let kept: Vec<usize> = queue.into_sorted().iter().map(|n| n.index).collect();
        assert_eq!(kept, vec![1, 3]);
    }

    #[test]
    fn test_queue_zero_capacity() {
        let mut queue = NeighborQueue::new(0, 10);
        assert!(!queue.push(0, 0.0));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_knn_matches_brute_force() {
        let points = grid();
        let index = KmknnIndex::build(points.clone(), &KmknnParams::default()).unwrap();

        for query in [[0.0, 0.0], [3.3, 7.1], [8.0, 25.0], [-4.0, 100.0]] {
            for k in [1, 4, 10, 200] {
                let got = index.search_knn(&query, k, None).unwrap();
                assert_eq!(got, brute_force(&points, &query, k, None));
            }
        }
    }

    #[test]
    fn test_knn_excludes_self() {
        let points = grid();
        let index = KmknnIndex::build(points.clone(), &KmknnParams::default()).unwrap();

        for i in [0, 17, 60, 107] {
            let got = index.search_knn(points.point(i), 5, Some(i)).unwrap();
            assert!(got.iter().all(|n| n.index != i));
            assert_eq!(got, brute_force(&points, points.point(i), 5, Some(i)));
        }
    }

    #[test]
    fn test_knn_zero_k() {
        let index = KmknnIndex::build(grid(), &KmknnParams::default()).unwrap();
        assert!(index.search_knn(&[1.0, 1.0], 0, None).unwrap().is_empty());
    }

    #[test]
    fn test_knn_query_dimension_mismatch() {
        let index = KmknnIndex::build(grid(), &KmknnParams::default()).unwrap();
        assert!(matches!(
            index.search_knn(&[1.0, 1.0, 1.0], 3, None),
            Err(Error::DimensionMismatch {
                expected: 2,
                found: 3
            })
        ));
        assert!(matches!(
            index.search_knn(&[f64::NAN, 1.0], 3, None),
            Err(Error::NonFiniteValue { column: 0, .. })
        ));
    }
}
