//! Memory-mapped matrix files
//!
//! A file holds a little-endian `u32` row count and `u32` dimension, followed
//! by the rows as little-endian `f64` values. The file is mapped read-only;
//! [`MmapMatrix::to_dataset`] decodes all of it into one owned buffer.

use memmap2::{Mmap, MmapOptions};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::dataset::Dataset;
use crate::error::Result;

const HEADER_BYTES: usize = 8;
const VALUE_BYTES: usize = std::mem::size_of::<f64>();

fn invalid_data(message: String) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, message)
}

/// Memory-mapped matrix file
pub struct MmapMatrix {
    mmap: Mmap,
    dimension: usize,
    count: usize,
}

impl MmapMatrix {
    /// Map a matrix file and check its size against the header
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;

        // SAFETY: the map is read-only and dropped with this value; callers
        // must not truncate the file while it is open.
        let mmap = unsafe { MmapOptions::new().map(&file)? };

        if mmap.len() < HEADER_BYTES {
            return Err(invalid_data(format!("File too short for header: {} bytes", mmap.len())).into());
        }

        let count = u32::from_le_bytes([mmap[0], mmap[1], mmap[2], mmap[3]]) as usize;
        let dimension = u32::from_le_bytes([mmap[4], mmap[5], mmap[6], mmap[7]]) as usize;

        let expected_size = count
            .checked_mul(dimension)
            .and_then(|values| values.checked_mul(VALUE_BYTES))
            .and_then(|bytes| bytes.checked_add(HEADER_BYTES))
            .ok_or_else(|| {
                invalid_data(format!(
                    "Header size overflows: {} rows of dimension {}",
                    count, dimension
                ))
            })?;
        if mmap.len() != expected_size {
            return Err(invalid_data(format!(
                "File size mismatch: expected {} bytes, got {}",
                expected_size,
                mmap.len()
            ))
            .into());
        }

        Ok(Self {
            mmap,
            dimension,
            count,
        })
    }

    /// Decode one row, or `None` past the last row
    pub fn row(&self, idx: usize) -> Option<Vec<f64>> {
        if idx >= self.count {
            return None;
        }

        let start = HEADER_BYTES + idx * self.dimension * VALUE_BYTES;
        let end = start + self.dimension * VALUE_BYTES;

        let values = self.mmap[start..end]
            .chunks_exact(VALUE_BYTES)
            .map(|chunk| {
                let mut bytes = [0u8; VALUE_BYTES];
                bytes.copy_from_slice(chunk);
                f64::from_le_bytes(bytes)
            })
            .collect();
        Some(values)
    }

    /// Decode the whole matrix into a validated dataset
    pub fn to_dataset(&self) -> Result<Dataset> {
        let values: Vec<f64> = self.mmap[HEADER_BYTES..]
            .chunks_exact(VALUE_BYTES)
            .map(|chunk| {
                let mut bytes = [0u8; VALUE_BYTES];
                bytes.copy_from_slice(chunk);
                f64::from_le_bytes(bytes)
            })
            .collect();

        Dataset::from_row_major(values, self.dimension)
    }

    /// Number of rows
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Check if the file holds no rows
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Row length
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Read a matrix file into a dataset
pub fn read_matrix<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    MmapMatrix::open(path)?.to_dataset()
}

/// Write a dataset as a matrix file
pub fn write_matrix<P: AsRef<Path>>(path: P, points: &Dataset) -> Result<()> {
    let count = u32::try_from(points.len())
        .map_err(|_| invalid_data(format!("Too many points: {}", points.len())))?;
    let dimension = u32::try_from(points.dimension())
        .map_err(|_| invalid_data(format!("Dimension too large: {}", points.dimension())))?;

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    let mut writer = BufWriter::new(file);
    writer.write_all(&count.to_le_bytes())?;
    writer.write_all(&dimension.to_le_bytes())?;

    for &value in points.as_slice() {
        writer.write_all(&value.to_le_bytes())?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.bin");

        let points = Dataset::from_rows(&[
            vec![1.0, 2.0, 3.0, 4.0],
            vec![5.0, 6.0, 7.0, 8.0],
            vec![9.0, 10.0, 11.0, 12.5],
        ])
        .unwrap();

        write_matrix(&path, &points).unwrap();

        let matrix = MmapMatrix::open(&path).unwrap();
        assert_eq!(matrix.len(), 3);
        assert_eq!(matrix.dimension(), 4);
        assert_eq!(matrix.row(2), Some(vec![9.0, 10.0, 11.0, 12.5]));
        assert_eq!(matrix.row(3), None);

        assert_eq!(read_matrix(&path).unwrap(), points);
    }

    #[test]
    fn test_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.bin");

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&1.0f64.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();

        assert!(matches!(MmapMatrix::open(&path), Err(Error::Io(_))));
    }

    #[test]
    fn test_oversized_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.bin");

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();
        assert!(matches!(MmapMatrix::open(&path), Err(Error::Io(_))));

        // 2^31 * 2^30 * 8 bytes is exactly 2^64, which wraps to 0 without the check
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(1u32 << 31).to_le_bytes());
        bytes.extend_from_slice(&(1u32 << 30).to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();
        assert!(matches!(MmapMatrix::open(&path), Err(Error::Io(_))));
    }

    #[test]
    fn test_empty_matrix_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&3u32.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();

        let matrix = MmapMatrix::open(&path).unwrap();
        assert!(matrix.is_empty());
        assert!(matches!(matrix.to_dataset(), Err(Error::EmptyDataset)));
    }
}
