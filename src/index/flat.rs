//! Exact brute-force vector index.
//!
//! Stores every live vector in a dense, append-only slot vector and scans
//! all of them per query. O(n * D) per search, which is the right trade
//! below a few thousand vectors and the correctness oracle for validating
//! the approximate index at any scale: its result order follows the same
//! comparator contract (ascending distance, ties by ascending id), so the
//! two variants are substitutable.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io::Write;

use ahash::AHashMap;

use crate::distance::DistanceMetric;
use crate::error::{ProximaError, Result};
use crate::index::{SearchHit, VectorIndex, codec};
use crate::vector::Vector;

/// One storage slot. Removal tombstones the slot instead of shifting the
/// vector out, so slot positions and internal ids stay stable.
#[derive(Debug, Clone)]
pub(crate) struct FlatSlot {
    pub(crate) id: u64,
    pub(crate) vector: Vector,
    pub(crate) deleted: bool,
}

/// Exact linear-scan index.
#[derive(Debug)]
pub struct FlatIndex {
    dimension: usize,
    metric: DistanceMetric,
    slots: Vec<FlatSlot>,
    /// Maps every id ever added to its slot, tombstoned ids included.
    /// Ids are never reused within the lifetime of an index instance.
    id_to_slot: AHashMap<u64, usize>,
    deleted: usize,
}

impl FlatIndex {
    /// Create a new empty index with the given dimensionality and metric.
    pub fn new(dimension: usize, metric: DistanceMetric) -> Result<Self> {
        if dimension == 0 {
            return Err(ProximaError::invalid_argument("Dimension must be > 0"));
        }

        Ok(Self {
            dimension,
            metric,
            slots: Vec::new(),
            id_to_slot: AHashMap::new(),
            deleted: 0,
        })
    }

    /// Get the vector stored under `id`, if it is live.
    pub fn get_vector(&self, id: u64) -> Option<&Vector> {
        let &slot = self.id_to_slot.get(&id)?;
        let entry = &self.slots[slot];
        if entry.deleted { None } else { Some(&entry.vector) }
    }

    /// Iterate over live `(id, vector)` entries in insertion order.
    pub(crate) fn live_entries(&self) -> impl Iterator<Item = (u64, &Vector)> {
        self.slots
            .iter()
            .filter(|slot| !slot.deleted)
            .map(|slot| (slot.id, &slot.vector))
    }

    /// Rebuild an index from persisted live entries.
    pub(crate) fn from_parts(
        dimension: usize,
        metric: DistanceMetric,
        entries: Vec<(u64, Vector)>,
    ) -> Result<Self> {
        let mut index = Self::new(dimension, metric)?;
        for (id, vector) in entries {
            index.add(id, vector)?;
        }
        Ok(index)
    }
}

/// Max-heap wrapper so the heap root is always the worst accepted hit.
struct WorstFirst(SearchHit);

impl PartialEq for WorstFirst {
    fn eq(&self, other: &Self) -> bool {
        self.0.cmp_by_distance(&other.0) == Ordering::Equal
    }
}

impl Eq for WorstFirst {}

impl PartialOrd for WorstFirst {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WorstFirst {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp_by_distance(&other.0)
    }
}

impl VectorIndex for FlatIndex {
    fn add(&mut self, id: u64, vector: Vector) -> Result<()> {
        vector.validate_dimension(self.dimension)?;
        if !vector.is_valid() {
            return Err(ProximaError::invalid_argument(format!(
                "Vector {id} contains NaN or infinite values"
            )));
        }
        if self.id_to_slot.contains_key(&id) {
            return Err(ProximaError::DuplicateId(id));
        }

        self.id_to_slot.insert(id, self.slots.len());
        self.slots.push(FlatSlot {
            id,
            vector,
            deleted: false,
        });
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize, _ef: Option<usize>) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Err(ProximaError::invalid_argument("k must be > 0"));
        }
        if query.len() != self.dimension {
            return Err(ProximaError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if !query.iter().all(|x| x.is_finite()) {
            return Err(ProximaError::invalid_argument(
                "Query vector contains NaN or infinite values",
            ));
        }
        if self.is_empty() {
            return Ok(Vec::new());
        }

        let live: Vec<&FlatSlot> = self.slots.iter().filter(|slot| !slot.deleted).collect();
        let vectors: Vec<&[f32]> = live.iter().map(|slot| slot.vector.data.as_slice()).collect();
        let distances = self.metric.batch_distance(query, &vectors)?;

        // Bounded max-heap of size k: the root is the worst accepted hit,
        // so each better candidate evicts it in O(log k).
        let mut heap: BinaryHeap<WorstFirst> = BinaryHeap::with_capacity(k + 1);
        for (slot, distance) in live.iter().zip(distances) {
            let hit = SearchHit {
                id: slot.id,
                distance,
            };
            if heap.len() < k {
                heap.push(WorstFirst(hit));
            } else {
                let improves = heap
                    .peek()
                    .is_some_and(|worst| hit.cmp_by_distance(&worst.0) == Ordering::Less);
                if improves {
                    heap.pop();
                    heap.push(WorstFirst(hit));
                }
            }
        }

        let mut hits: Vec<SearchHit> = heap.into_iter().map(|entry| entry.0).collect();
        hits.sort_by(|a, b| a.cmp_by_distance(b));
        Ok(hits)
    }

    fn remove(&mut self, id: u64) -> Result<()> {
        let slot = match self.id_to_slot.get(&id) {
            Some(&slot) => slot,
            None => return Err(ProximaError::NotFound(id)),
        };
        if self.slots[slot].deleted {
            return Err(ProximaError::NotFound(id));
        }

        self.slots[slot].deleted = true;
        self.deleted += 1;
        Ok(())
    }

    fn len(&self) -> usize {
        self.slots.len() - self.deleted
    }

    fn deleted_count(&self) -> usize {
        self.deleted
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn distance_metric(&self) -> DistanceMetric {
        self.metric
    }

    fn save(&self, output: &mut dyn Write) -> Result<()> {
        codec::save_flat(self, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_index(vectors: &[(u64, Vec<f32>)]) -> FlatIndex {
        let mut index = FlatIndex::new(2, DistanceMetric::Euclidean).unwrap();
        for (id, data) in vectors {
            index.add(*id, Vector::new(data.clone())).unwrap();
        }
        index
    }

    #[test]
    fn test_add_and_len() {
        let index = build_index(&[(1, vec![1.0, 0.0]), (2, vec![0.0, 1.0])]);
        assert_eq!(index.len(), 2);
        assert!(!index.is_empty());
        assert_eq!(index.deleted_count(), 0);
    }

    #[test]
    fn test_add_dimension_mismatch() {
        let mut index = FlatIndex::new(2, DistanceMetric::Euclidean).unwrap();
        let err = index.add(1, Vector::new(vec![1.0, 2.0, 3.0])).unwrap_err();
        assert!(matches!(err, ProximaError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_add_duplicate_id() {
        let mut index = build_index(&[(1, vec![1.0, 0.0])]);
        let err = index.add(1, Vector::new(vec![0.0, 1.0])).unwrap_err();
        assert!(matches!(err, ProximaError::DuplicateId(1)));
    }

    #[test]
    fn test_add_non_finite_vector() {
        let mut index = FlatIndex::new(2, DistanceMetric::Euclidean).unwrap();
        let err = index.add(1, Vector::new(vec![f32::NAN, 0.0])).unwrap_err();
        assert!(matches!(err, ProximaError::InvalidArgument(_)));
    }

    #[test]
    fn test_search_exact_order() {
        let index = build_index(&[
            (1, vec![0.0, 3.0]),
            (2, vec![0.0, 1.0]),
            (3, vec![0.0, 2.0]),
        ]);

        let hits = index.search(&[0.0, 0.0], 2, None).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, 2);
        assert!((hits[0].distance - 1.0).abs() < 1e-6);
        assert_eq!(hits[1].id, 3);
    }

    #[test]
    fn test_search_self_is_top_hit() {
        let index = build_index(&[(1, vec![1.0, 0.0]), (2, vec![0.0, 1.0])]);
        let hits = index.search(&[1.0, 0.0], 1, None).unwrap();
        assert_eq!(hits[0].id, 1);
        assert!(hits[0].distance.abs() < 1e-6);
    }

    #[test]
    fn test_search_ties_resolve_by_id() {
        // Two vectors at exactly the same distance from the query.
        let index = build_index(&[(7, vec![1.0, 0.0]), (3, vec![-1.0, 0.0])]);
        let hits = index.search(&[0.0, 0.0], 2, None).unwrap();
        assert_eq!(hits[0].id, 3);
        assert_eq!(hits[1].id, 7);
    }

    #[test]
    fn test_search_empty_index_returns_empty() {
        let index = FlatIndex::new(2, DistanceMetric::Euclidean).unwrap();
        let hits = index.search(&[0.0, 0.0], 5, None).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_search_invalid_k() {
        let index = build_index(&[(1, vec![1.0, 0.0])]);
        assert!(index.search(&[1.0, 0.0], 0, None).is_err());
    }

    #[test]
    fn test_search_k_larger_than_index() {
        let index = build_index(&[(1, vec![1.0, 0.0]), (2, vec![0.0, 1.0])]);
        let hits = index.search(&[1.0, 0.0], 10, None).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_remove_and_search() {
        let mut index = build_index(&[(1, vec![1.0, 0.0]), (2, vec![0.9, 0.1])]);

        index.remove(1).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.deleted_count(), 1);

        let hits = index.search(&[1.0, 0.0], 2, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 2);
    }

    #[test]
    fn test_remove_twice_is_not_found() {
        let mut index = build_index(&[(1, vec![1.0, 0.0])]);
        index.remove(1).unwrap();
        let err = index.remove(1).unwrap_err();
        assert!(matches!(err, ProximaError::NotFound(1)));
    }

    #[test]
    fn test_removed_id_is_not_reused() {
        let mut index = build_index(&[(1, vec![1.0, 0.0])]);
        index.remove(1).unwrap();
        let err = index.add(1, Vector::new(vec![0.0, 1.0])).unwrap_err();
        assert!(matches!(err, ProximaError::DuplicateId(1)));
    }

    #[test]
    fn test_get_vector() {
        let mut index = build_index(&[(1, vec![1.0, 0.0])]);
        assert!(index.get_vector(1).is_some());
        assert!(index.get_vector(2).is_none());

        index.remove(1).unwrap();
        assert!(index.get_vector(1).is_none());
    }

    #[test]
    fn test_cosine_scenario() {
        // Insert [1,0], [0,1], [1,1] under cosine; querying [1,0] with k=2
        // returns id 0 at distance 0 and id 2 at 1 - 1/sqrt(2).
        let mut index = FlatIndex::new(2, DistanceMetric::Cosine).unwrap();
        index.add(0, Vector::new(vec![1.0, 0.0])).unwrap();
        index.add(1, Vector::new(vec![0.0, 1.0])).unwrap();
        index.add(2, Vector::new(vec![1.0, 1.0])).unwrap();

        let hits = index.search(&[1.0, 0.0], 2, None).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, 0);
        assert!(hits[0].distance.abs() < 1e-6);
        assert_eq!(hits[1].id, 2);
        assert!((hits[1].distance - 0.29289323).abs() < 1e-5);
    }
}
