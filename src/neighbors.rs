//! Batch neighbour searches in find and query mode
//!
//! These are the four entry points a host exposes:
//!
//! - [`find_knn`] / [`find_neighbors`]: every (or a subset of) reference point
//!   searched against its own index, never reporting itself.
//! - [`query_knn`] / [`query_neighbors`]: every point of a separate query
//!   dataset searched against the index.
//!
//! One search runs per point, spread over the rayon thread pool. Searches
//! only read the shared index.

use rayon::prelude::*;

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::index::{KmknnIndex, Neighbor};

/// Index numbering used by a host at its boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexBase {
    /// 0-based, as used internally
    #[default]
    Zero,
    /// 1-based
    One,
}

impl IndexBase {
    /// Translate an internal 0-based index to this base.
    pub fn from_zero_based(self, index: usize) -> usize {
        match self {
            IndexBase::Zero => index,
            IndexBase::One => index + 1,
        }
    }

    /// Translate a host index in this base to 0-based, checking it against
    /// a dataset of `len` points.
    pub fn to_zero_based(self, index: usize, len: usize) -> Result<usize> {
        let zero_based = match self {
            IndexBase::Zero => Some(index),
            IndexBase::One => index.checked_sub(1),
        };

        zero_based
            .filter(|&i| i < len)
            .ok_or(Error::IndexOutOfRange { index, len })
    }

    /// Translate a host subset to 0-based reference indices.
    pub fn subset_to_zero_based(self, subset: &[usize], len: usize) -> Result<Vec<usize>> {
        subset.iter().map(|&i| self.to_zero_based(i, len)).collect()
    }
}

/// What a batch search reports, and for which points.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Find mode only: search just these reference indices (0-based), in this order
    pub subset: Option<Vec<usize>>,
    /// Report neighbour indices
    pub report_index: bool,
    /// Report neighbour distances
    pub report_distance: bool,
    /// kNN only: keep only the last `n` neighbours of each list
    pub last: Option<usize>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            subset: None,
            report_index: true,
            report_distance: true,
            last: None,
        }
    }
}

impl SearchOptions {
    pub fn with_subset(mut self, subset: Vec<usize>) -> Self {
        self.subset = Some(subset);
        self
    }

    pub fn with_report_index(mut self, report_index: bool) -> Self {
        self.report_index = report_index;
        self
    }

    pub fn with_report_distance(mut self, report_distance: bool) -> Self {
        self.report_distance = report_distance;
        self
    }

    pub fn with_last(mut self, last: usize) -> Self {
        self.last = Some(last);
        self
    }
}

/// Per-point neighbour lists, in the order the points were searched.
///
/// Each half is present only if it was requested.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NeighborLists {
    pub indices: Option<Vec<Vec<usize>>>,
    pub distances: Option<Vec<Vec<f64>>>,
}

impl NeighborLists {
    fn collect(results: Vec<Vec<Neighbor>>, options: &SearchOptions) -> Self {
        let indices: Option<Vec<Vec<usize>>> = options
            .report_index
            .then(|| results.iter().map(|r| r.iter().map(|n| n.index).collect()).collect());
        let distances: Option<Vec<Vec<f64>>> = options
            .report_distance
            .then(|| results.iter().map(|r| r.iter().map(|n| n.distance).collect()).collect());

        Self { indices, distances }
    }

    /// Renumber reported indices for a host using `base`.
    pub fn with_base(mut self, base: IndexBase) -> Self {
        if let Some(indices) = self.indices.as_mut() {
            for idx in indices.iter_mut().flatten() {
                *idx = base.from_zero_based(*idx);
            }
        }
        self
    }

    /// Number of searched points
    pub fn len(&self) -> usize {
        match (&self.indices, &self.distances) {
            (Some(i), _) => i.len(),
            (None, Some(d)) => d.len(),
            (None, None) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reference points a find-mode search covers.
fn find_targets(index: &KmknnIndex, options: &SearchOptions) -> Result<Vec<usize>> {
    match &options.subset {
        Some(subset) => {
            if let Some(&bad) = subset.iter().find(|&&i| i >= index.len()) {
                return Err(Error::IndexOutOfRange {
                    index: bad,
                    len: index.len(),
                });
            }
            Ok(subset.clone())
        }
        None => Ok((0..index.len()).collect()),
    }
}

fn check_queries(index: &KmknnIndex, queries: &Dataset) -> Result<()> {
    if queries.dimension() != index.dimension() {
        return Err(Error::DimensionMismatch {
            expected: index.dimension(),
            found: queries.dimension(),
        });
    }
    Ok(())
}

fn keep_last(mut hits: Vec<Neighbor>, last: Option<usize>) -> Vec<Neighbor> {
    if let Some(n) = last {
        let skip = hits.len().saturating_sub(n);
        hits.drain(..skip);
    }
    hits
}

/// k nearest neighbours of each reference point, excluding itself.
pub fn find_knn(index: &KmknnIndex, k: usize, options: &SearchOptions) -> Result<NeighborLists> {
    let targets = find_targets(index, options)?;

    let results = targets
        .par_iter()
        .map(|&i| -> Result<Vec<Neighbor>> {
            let hits = index.search_knn(index.reference().point(i), k, Some(i))?;
            Ok(keep_last(hits, options.last))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(NeighborLists::collect(results, options))
}

/// k nearest reference points of each query point.
pub fn query_knn(index: &KmknnIndex, queries: &Dataset, k: usize, options: &SearchOptions) -> Result<NeighborLists> {
    check_queries(index, queries)?;

    let results = queries
        .as_slice()
        .par_chunks_exact(queries.dimension())
        .map(|q| -> Result<Vec<Neighbor>> {
            let hits = index.search_knn(q, k, None)?;
            Ok(keep_last(hits, options.last))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(NeighborLists::collect(results, options))
}

/// Reference points within `threshold` of each reference point, excluding itself.
pub fn find_neighbors(index: &KmknnIndex, threshold: f64, options: &SearchOptions) -> Result<NeighborLists> {
    let targets = find_targets(index, options)?;

    let results = targets
        .par_iter()
        .map(|&i| index.search_radius(index.reference().point(i), threshold, Some(i)))
        .collect::<Result<Vec<_>>>()?;

    Ok(NeighborLists::collect(results, options))
}

/// Reference points within `threshold` of each query point.
pub fn query_neighbors(
    index: &KmknnIndex,
    queries: &Dataset,
    threshold: f64,
    options: &SearchOptions,
) -> Result<NeighborLists> {
    check_queries(index, queries)?;

    let results = queries
        .as_slice()
        .par_chunks_exact(queries.dimension())
        .map(|q| index.search_radius(q, threshold, None))
        .collect::<Result<Vec<_>>>()?;

    Ok(NeighborLists::collect(results, options))
}
