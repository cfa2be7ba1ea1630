//! # Proxima
//!
//! An embeddable vector database core for Rust: store high-dimensional
//! embeddings under caller-assigned ids and answer nearest-neighbor
//! queries, exactly or approximately.
//!
//! ## Features
//!
//! - Exact brute-force index for small collections and recall validation
//! - HNSW graph index with tunable accuracy/speed trade-off
//! - Cosine, Euclidean, and dot-product distance metrics with SIMD kernels
//! - Versioned, checksummed binary persistence that reconstructs graph
//!   topology exactly
//! - Deterministic behavior under a configured random seed
//!
//! ## Example
//!
//! ```
//! use proxima::index::hnsw::{HnswConfig, HnswIndex};
//! use proxima::index::VectorIndex;
//! use proxima::distance::DistanceMetric;
//! use proxima::vector::Vector;
//!
//! # fn main() -> proxima::error::Result<()> {
//! let config = HnswConfig::new(2).with_distance_metric(DistanceMetric::Cosine);
//! let mut index = HnswIndex::new(config)?;
//!
//! index.add(0, Vector::new(vec![1.0, 0.0]))?;
//! index.add(1, Vector::new(vec![0.0, 1.0]))?;
//! index.add(2, Vector::new(vec![1.0, 1.0]))?;
//!
//! let hits = index.search(&[1.0, 0.0], 2, None)?;
//! assert_eq!(hits[0].id, 0);
//! # Ok(())
//! # }
//! ```

pub mod distance;
pub mod error;
pub mod index;
pub mod simd;
pub mod vector;

pub mod prelude {
    pub use crate::distance::DistanceMetric;
    pub use crate::error::{ProximaError, Result};
    pub use crate::index::codec::{load, load_from_path, save_to_path};
    pub use crate::index::flat::FlatIndex;
    pub use crate::index::hnsw::{HnswConfig, HnswIndex};
    pub use crate::index::{AnyIndex, SearchHit, VectorIndex};
    pub use crate::vector::Vector;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
