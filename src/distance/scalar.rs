//! Scalar distance kernels

/// Euclidean (L2) distance squared between two points
///
/// Squared distance skips the sqrt, which is unnecessary for comparisons
/// (sqrt is monotonic). Used for k-means assignment.
#[inline]
pub fn l2_squared_scalar(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "Point dimensions must match");

    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

/// Euclidean (L2) distance
#[inline]
pub fn l2_scalar(a: &[f64], b: &[f64]) -> f64 {
    l2_squared_scalar(a, b).sqrt()
}

/// Manhattan (L1) distance
#[inline]
pub fn manhattan_scalar(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "Point dimensions must match");

    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
}
