//! Storage for point matrices
//!
//! Matrix files hold a little-endian header (`u32` point count, `u32`
//! dimension) followed by the points as row-major little-endian `f64`.

pub mod mmap;

pub use mmap::{read_matrix, write_matrix, MmapMatrix};
