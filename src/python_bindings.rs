//! Python bindings for kmknn using PyO3
//!
//! Registers the four batch searches as module functions. Matrices are
//! nested lists (one inner list per point); results come back as an
//! `(indices, distances)` tuple with `None` for a half that was not requested.
//!
//! Build with: maturin develop --release --features extension-module
//! Import in Python: from kmknn import find_knn, query_knn, find_neighbors, query_neighbors

#![cfg(feature = "python")]

use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;

use crate::dataset::Dataset;
use crate::distance::DistanceMetric;
use crate::error::{validate_k, Error};
use crate::index::{KmknnIndex, KmknnParams};
use crate::neighbors::{self, NeighborLists, SearchOptions};

type PyNeighbors = (Option<Vec<Vec<usize>>>, Option<Vec<Vec<f64>>>);

fn to_py_err(err: Error) -> PyErr {
    match err {
        Error::Io(e) => PyIOError::new_err(e.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}

fn build_index(reference: Vec<Vec<f64>>, num_clusters: Option<usize>, metric: &str) -> PyResult<KmknnIndex> {
    let metric = DistanceMetric::from_name(metric).ok_or_else(|| {
        PyValueError::new_err(format!("Unknown metric '{}'. Use 'Euclidean' or 'Manhattan'", metric))
    })?;

    let mut params = KmknnParams::default().with_metric(metric);
    params.num_clusters = num_clusters;

    let reference = Dataset::from_rows(&reference).map_err(to_py_err)?;
    KmknnIndex::build(reference, &params).map_err(to_py_err)
}

fn search_options(subset: Option<Vec<usize>>, get_index: bool, get_distance: bool, last: Option<usize>) -> SearchOptions {
    SearchOptions {
        subset,
        report_index: get_index,
        report_distance: get_distance,
        last,
    }
}

fn into_tuple(lists: NeighborLists) -> PyNeighbors {
    (lists.indices, lists.distances)
}

/// k nearest neighbours of each reference point, excluding itself.
#[pyfunction]
#[pyo3(signature = (reference, k, num_clusters=None, subset=None, get_index=true, get_distance=true, last=None, metric="Euclidean"))]
#[allow(clippy::too_many_arguments)]
fn find_knn(
    py: Python,
    reference: Vec<Vec<f64>>,
    k: i64,
    num_clusters: Option<usize>,
    subset: Option<Vec<usize>>,
    get_index: bool,
    get_distance: bool,
    last: Option<usize>,
    metric: &str,
) -> PyResult<PyNeighbors> {
    let k = validate_k(k).map_err(to_py_err)?;
    let index = build_index(reference, num_clusters, metric)?;
    let options = search_options(subset, get_index, get_distance, last);

    py.allow_threads(|| neighbors::find_knn(&index, k, &options))
        .map(into_tuple)
        .map_err(to_py_err)
}

/// k nearest reference points of each query point.
#[pyfunction]
#[pyo3(signature = (reference, query, k, num_clusters=None, get_index=true, get_distance=true, last=None, metric="Euclidean"))]
#[allow(clippy::too_many_arguments)]
fn query_knn(
    py: Python,
    reference: Vec<Vec<f64>>,
    query: Vec<Vec<f64>>,
    k: i64,
    num_clusters: Option<usize>,
    get_index: bool,
    get_distance: bool,
    last: Option<usize>,
    metric: &str,
) -> PyResult<PyNeighbors> {
    let k = validate_k(k).map_err(to_py_err)?;
    let index = build_index(reference, num_clusters, metric)?;
    let queries = Dataset::from_rows(&query).map_err(to_py_err)?;
    let options = search_options(None, get_index, get_distance, last);

    py.allow_threads(|| neighbors::query_knn(&index, &queries, k, &options))
        .map(into_tuple)
        .map_err(to_py_err)
}

/// Reference points within `threshold` of each reference point, excluding itself.
#[pyfunction]
#[pyo3(signature = (reference, threshold, num_clusters=None, subset=None, get_index=true, get_distance=true, metric="Euclidean"))]
#[allow(clippy::too_many_arguments)]
fn find_neighbors(
    py: Python,
    reference: Vec<Vec<f64>>,
    threshold: f64,
    num_clusters: Option<usize>,
    subset: Option<Vec<usize>>,
    get_index: bool,
    get_distance: bool,
    metric: &str,
) -> PyResult<PyNeighbors> {
    let index = build_index(reference, num_clusters, metric)?;
    let options = search_options(subset, get_index, get_distance, None);

    py.allow_threads(|| neighbors::find_neighbors(&index, threshold, &options))
        .map(into_tuple)
        .map_err(to_py_err)
}

/// Reference points within `threshold` of each query point.
#[pyfunction]
#[pyo3(signature = (reference, query, threshold, num_clusters=None, get_index=true, get_distance=true, metric="Euclidean"))]
#[allow(clippy::too_many_arguments)]
fn query_neighbors(
    py: Python,
    reference: Vec<Vec<f64>>,
    query: Vec<Vec<f64>>,
    threshold: f64,
    num_clusters: Option<usize>,
    get_index: bool,
    get_distance: bool,
    metric: &str,
) -> PyResult<PyNeighbors> {
    let index = build_index(reference, num_clusters, metric)?;
    let queries = Dataset::from_rows(&query).map_err(to_py_err)?;
    let options = search_options(None, get_index, get_distance, None);

    py.allow_threads(|| neighbors::query_neighbors(&index, &queries, threshold, &options))
        .map(into_tuple)
        .map_err(to_py_err)
}

/// Python module definition
#[pymodule]
fn kmknn(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(find_knn, m)?)?;
    m.add_function(wrap_pyfunction!(query_knn, m)?)?;
    m.add_function(wrap_pyfunction!(find_neighbors, m)?)?;
    m.add_function(wrap_pyfunction!(query_neighbors, m)?)?;
    Ok(())
}
