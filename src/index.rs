//! Vector index contract and variant dispatch.
//!
//! Two index variants implement the [`VectorIndex`] trait:
//!
//! - [`FlatIndex`](flat::FlatIndex): exact linear scan, the correctness
//!   oracle and the right choice for small collections.
//! - [`HnswIndex`](hnsw::HnswIndex): approximate graph search for large
//!   collections.
//!
//! The variant set is closed; indexes reconstructed from a persisted stream
//! come back as an [`AnyIndex`] enum rather than a trait object.
//!
//! Indexes are single-writer structures: `add` and `remove` take
//! `&mut self`, and callers that share an index across threads are
//! responsible for serializing writes (e.g. behind a reader-writer lock).

pub mod codec;
pub mod flat;
pub mod hnsw;

use std::cmp::Ordering;
use std::io::Write;

use crate::distance::DistanceMetric;
use crate::error::Result;
use crate::vector::Vector;

/// A single search result: an internal id and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    /// Internal id of the matched vector.
    pub id: u64,
    /// Distance to the query (lower is more similar).
    pub distance: f32,
}

impl SearchHit {
    /// Total order used everywhere results are ranked: ascending distance,
    /// ties broken by ascending id so equal-distance results are
    /// reproducible across runs and across index variants.
    pub fn cmp_by_distance(&self, other: &Self) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Trait implemented by every vector index variant.
pub trait VectorIndex {
    /// Insert a vector under a caller-supplied unique internal id.
    ///
    /// Fails with `DimensionMismatch` if the vector length does not match
    /// the index dimensionality, `DuplicateId` if the id is already
    /// present, and `InvalidArgument` if the vector contains NaN or
    /// infinite values.
    fn add(&mut self, id: u64, vector: Vector) -> Result<()>;

    /// Return up to `k` nearest neighbors of `query`, ascending by
    /// distance with ties broken by ascending id.
    ///
    /// `ef` is the candidate-list size for approximate variants (clamped
    /// to at least `k`); exact variants ignore it. Searching an empty
    /// index returns an empty result rather than an error. `k == 0` fails
    /// with `InvalidArgument`.
    fn search(&self, query: &[f32], k: usize, ef: Option<usize>) -> Result<Vec<SearchHit>>;

    /// Remove the vector stored under `id`.
    ///
    /// Fails with `NotFound` if the id is absent. After a successful
    /// remove the id never appears in search results again.
    fn remove(&mut self, id: u64) -> Result<()>;

    /// Number of live (non-removed) vectors.
    fn len(&self) -> usize;

    /// Check if the index holds no live vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of tombstoned (removed but still resident) vectors.
    fn deleted_count(&self) -> usize;

    /// Dimensionality fixed at index creation.
    fn dimension(&self) -> usize;

    /// Distance metric fixed at index creation.
    fn distance_metric(&self) -> DistanceMetric;

    /// Serialize the full index state to a byte stream.
    ///
    /// The inverse is [`codec::load`], which reconstructs the index so
    /// that identical queries return identical results.
    fn save(&self, output: &mut dyn Write) -> Result<()>;
}

/// An index variant reconstructed from a persisted stream.
#[derive(Debug)]
pub enum AnyIndex {
    /// Exact brute-force index.
    Flat(flat::FlatIndex),
    /// Approximate HNSW graph index.
    Hnsw(hnsw::HnswIndex),
}

impl VectorIndex for AnyIndex {
    fn add(&mut self, id: u64, vector: Vector) -> Result<()> {
        match self {
            AnyIndex::Flat(index) => index.add(id, vector),
            AnyIndex::Hnsw(index) => index.add(id, vector),
        }
    }

    fn search(&self, query: &[f32], k: usize, ef: Option<usize>) -> Result<Vec<SearchHit>> {
        match self {
            AnyIndex::Flat(index) => index.search(query, k, ef),
            AnyIndex::Hnsw(index) => index.search(query, k, ef),
        }
    }

    fn remove(&mut self, id: u64) -> Result<()> {
        match self {
            AnyIndex::Flat(index) => index.remove(id),
            AnyIndex::Hnsw(index) => index.remove(id),
        }
    }

    fn len(&self) -> usize {
        match self {
            AnyIndex::Flat(index) => index.len(),
            AnyIndex::Hnsw(index) => index.len(),
        }
    }

    fn deleted_count(&self) -> usize {
        match self {
            AnyIndex::Flat(index) => index.deleted_count(),
            AnyIndex::Hnsw(index) => index.deleted_count(),
        }
    }

    fn dimension(&self) -> usize {
        match self {
            AnyIndex::Flat(index) => index.dimension(),
            AnyIndex::Hnsw(index) => index.dimension(),
        }
    }

    fn distance_metric(&self) -> DistanceMetric {
        match self {
            AnyIndex::Flat(index) => index.distance_metric(),
            AnyIndex::Hnsw(index) => index.distance_metric(),
        }
    }

    fn save(&self, output: &mut dyn Write) -> Result<()> {
        match self {
            AnyIndex::Flat(index) => index.save(output),
            AnyIndex::Hnsw(index) => index.save(output),
        }
    }
}
