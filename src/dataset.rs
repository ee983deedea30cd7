//! Dense point matrices
//!
//! A [`Dataset`] stores N points of dimension D as one row-major buffer.
//! Construction validates shape and values, so everything downstream can
//! assume a non-empty, rectangular, finite matrix.

use crate::error::{Error, Result};

/// An immutable, validated set of fixed-dimension points.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    data: Vec<f64>,
    dimension: usize,
    len: usize,
}

impl Dataset {
    /// Build a dataset from a row-major buffer of `data.len() / dimension` points.
    pub fn from_row_major(data: Vec<f64>, dimension: usize) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::EmptyDataset);
        }
        if dimension == 0 {
            return Err(Error::DimensionMismatch {
                expected: 1,
                found: 0,
            });
        }
        if data.len() % dimension != 0 {
            return Err(Error::DimensionMismatch {
                expected: dimension,
                found: data.len() % dimension,
            });
        }

        if let Some(pos) = data.iter().position(|v| !v.is_finite()) {
            return Err(Error::NonFiniteValue {
                row: pos / dimension,
                column: pos % dimension,
            });
        }

        let len = data.len() / dimension;
        Ok(Self {
            data,
            dimension,
            len,
        })
    }

    /// Build a dataset from one vector per point.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let first = rows.first().ok_or(Error::EmptyDataset)?;
        let dimension = first.len();
        if dimension == 0 {
            return Err(Error::DimensionMismatch {
                expected: 1,
                found: 0,
            });
        }

        let mut data = Vec::with_capacity(rows.len() * dimension);
        for row in rows {
            if row.len() != dimension {
                return Err(Error::DimensionMismatch {
                    expected: dimension,
                    found: row.len(),
                });
            }
            data.extend_from_slice(row);
        }

        Self::from_row_major(data, dimension)
    }

    /// Get a point by index
    #[inline]
    pub fn point(&self, idx: usize) -> &[f64] {
        let start = idx * self.dimension;
        &self.data[start..start + self.dimension]
    }

    /// Iterate over points in index order
    pub fn points(&self) -> std::slice::ChunksExact<'_, f64> {
        self.data.chunks_exact(self.dimension)
    }

    /// Raw row-major values
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Number of points
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false for a constructed dataset; kept for API symmetry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Point dimensionality
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows() {
        let ds = Dataset::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.dimension(), 2);
        assert_eq!(ds.point(1), &[3.0, 4.0]);
        assert_eq!(ds.points().count(), 3);
    }

    #[test]
    fn test_empty() {
        assert!(matches!(Dataset::from_rows(&[]), Err(Error::EmptyDataset)));
        assert!(matches!(
            Dataset::from_row_major(Vec::new(), 3),
            Err(Error::EmptyDataset)
        ));
    }

    #[test]
    fn test_ragged_rows() {
        let err = Dataset::from_rows(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn test_flat_length_not_multiple() {
        assert!(matches!(
            Dataset::from_row_major(vec![1.0, 2.0, 3.0], 2),
            Err(Error::DimensionMismatch { .. })
        ));
        assert!(matches!(
            Dataset::from_row_major(vec![1.0], 0),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_non_finite() {
        let err = Dataset::from_rows(&[vec![1.0, 2.0], vec![f64::NAN, 0.0]]).unwrap_err();
        assert!(matches!(err, Error::NonFiniteValue { row: 1, column: 0 }));

        let err = Dataset::from_row_major(vec![0.0, 0.0, 0.0, f64::INFINITY], 2).unwrap_err();
        assert!(matches!(err, Error::NonFiniteValue { row: 1, column: 1 }));
    }
}
