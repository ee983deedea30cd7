//! Clustering algorithms for building search indices
//!
//! Provides implementations of:
//! - K-means clustering with strided or k-means++ initialization

pub mod kmeans;

pub use kmeans::{ClusterAssignment, KMeans, Seeding};
